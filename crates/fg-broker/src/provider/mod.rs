//! Identity Provider Configuration
//!
//! One [`ProviderConfig`] per registered provider. The [`ProviderKind`] tag
//! selects published endpoint defaults, the verification path and the claim
//! mapping table; every endpoint can be overridden.

pub mod facebook;
pub mod github;
pub mod google;
pub mod oidc;
mod registry;

use std::collections::BTreeSet;

pub use fg_config::ProviderKind;
use fg_config::ProviderSettings;

pub use registry::ProviderRegistry;

use crate::error::{BrokerError, Result};

/// Published defaults for a provider family
pub(crate) struct KindDefaults {
    pub authorization_endpoint: &'static str,
    pub token_endpoint: &'static str,
    pub userinfo_endpoint: Option<&'static str>,
    pub emails_endpoint: Option<&'static str>,
    pub jwks_uri: Option<&'static str>,
    pub issuers: &'static [&'static str],
    pub scopes: &'static [&'static str],
    pub scope_separator: &'static str,
    /// Whether the provider hands out signed ID tokens
    pub issues_id_tokens: bool,
}

pub(crate) fn defaults(kind: ProviderKind) -> &'static KindDefaults {
    match kind {
        ProviderKind::Google => &google::DEFAULTS,
        ProviderKind::Facebook => &facebook::DEFAULTS,
        ProviderKind::Github => &github::DEFAULTS,
        ProviderKind::Oidc => &oidc::DEFAULTS,
    }
}

/// Provider endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub authorization: String,
    pub token: String,
    pub userinfo: Option<String>,
    /// GitHub only: address list for users with a private email
    pub emails: Option<String>,
    pub jwks_uri: Option<String>,
    /// Accepted `iss` values; the first is reported as the claim issuer
    pub issuers: Vec<String>,
}

impl ProviderEndpoints {
    fn for_kind(kind: ProviderKind) -> Self {
        let d = defaults(kind);
        Self {
            authorization: d.authorization_endpoint.to_string(),
            token: d.token_endpoint.to_string(),
            userinfo: d.userinfo_endpoint.map(String::from),
            emails: d.emails_endpoint.map(String::from),
            jwks_uri: d.jwks_uri.map(String::from),
            issuers: d.issuers.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Registered provider configuration
#[derive(Clone)]
pub struct ProviderConfig {
    pub provider_id: String,
    pub kind: ProviderKind,
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
    pub scopes: BTreeSet<String>,
    pub endpoints: ProviderEndpoints,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider_id", &self.provider_id)
            .field("kind", &self.kind)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("callback_url", &self.callback_url)
            .field("scopes", &self.scopes)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a provider with the published defaults for `kind`
    pub fn new(
        provider_id: impl Into<String>,
        kind: ProviderKind,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            kind,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            callback_url: callback_url.into(),
            scopes: defaults(kind).scopes.iter().map(|s| s.to_string()).collect(),
            endpoints: ProviderEndpoints::for_kind(kind),
        }
    }

    pub fn google(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self::new("google", ProviderKind::Google, client_id, client_secret, callback_url)
    }

    pub fn facebook(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self::new("facebook", ProviderKind::Facebook, client_id, client_secret, callback_url)
    }

    pub fn github(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self::new("github", ProviderKind::Github, client_id, client_secret, callback_url)
    }

    /// Build from a `[[providers]]` configuration entry
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self> {
        let mut config = Self::new(
            settings.id.clone(),
            settings.kind,
            settings.client_id.clone(),
            settings.client_secret.clone(),
            settings.callback_url.clone(),
        );

        if !settings.scopes.is_empty() {
            config = config.with_scopes(settings.scopes.iter().cloned());
        }
        if let Some(url) = &settings.authorization_endpoint {
            config.endpoints.authorization = url.clone();
        }
        if let Some(url) = &settings.token_endpoint {
            config.endpoints.token = url.clone();
        }
        if let Some(url) = &settings.userinfo_endpoint {
            config.endpoints.userinfo = Some(url.clone());
        }
        if let Some(url) = &settings.emails_endpoint {
            config.endpoints.emails = Some(url.clone());
        }
        if let Some(url) = &settings.jwks_uri {
            config.endpoints.jwks_uri = Some(url.clone());
        }
        if let Some(issuer) = &settings.issuer {
            config.endpoints.issuers = vec![issuer.clone()];
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = provider_id.into();
        self
    }

    /// Replace the default scopes
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_authorization_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoints.authorization = url.into();
        self
    }

    pub fn with_token_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoints.token = url.into();
        self
    }

    pub fn with_userinfo_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoints.userinfo = Some(url.into());
        self
    }

    pub fn with_emails_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoints.emails = Some(url.into());
        self
    }

    pub fn with_jwks_uri(mut self, url: impl Into<String>) -> Self {
        self.endpoints.jwks_uri = Some(url.into());
        self
    }

    /// Accept exactly this issuer
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.endpoints.issuers = vec![issuer.into()];
        self
    }

    pub fn issues_id_tokens(&self) -> bool {
        defaults(self.kind).issues_id_tokens
    }

    /// Issuer reported on claims obtained without an ID token
    pub fn primary_issuer(&self) -> &str {
        self.endpoints
            .issuers
            .first()
            .map(String::as_str)
            .unwrap_or(self.endpoints.authorization.as_str())
    }

    /// The `scope` query value in the provider's own separator
    pub fn scope_param(&self) -> String {
        let separator = defaults(self.kind).scope_separator;
        self.scopes
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.provider_id.trim().is_empty() {
            return Err(BrokerError::configuration("provider id must not be empty"));
        }
        if self.client_id.trim().is_empty() {
            return Err(BrokerError::configuration(format!(
                "provider {} has no client id",
                self.provider_id
            )));
        }
        if self.endpoints.authorization.is_empty() || self.endpoints.token.is_empty() {
            return Err(BrokerError::configuration(format!(
                "provider {} has no authorization or token endpoint",
                self.provider_id
            )));
        }
        if self.issues_id_tokens()
            && (self.endpoints.jwks_uri.is_none() || self.endpoints.issuers.is_empty())
        {
            return Err(BrokerError::configuration(format!(
                "provider {} issues ID tokens but has no jwks_uri or issuer",
                self.provider_id
            )));
        }
        if !self.issues_id_tokens() && self.endpoints.userinfo.is_none() {
            return Err(BrokerError::configuration(format!(
                "provider {} has no userinfo endpoint",
                self.provider_id
            )));
        }
        Ok(())
    }
}
