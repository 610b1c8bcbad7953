//! Generic OpenID Connect issuers
//!
//! No published defaults exist, so every endpoint comes from configuration or
//! from the issuer's discovery document.

use serde::Deserialize;
use tracing::info;

use super::{KindDefaults, ProviderConfig, ProviderKind};
use crate::error::{BrokerError, Result};

pub(crate) const DEFAULTS: KindDefaults = KindDefaults {
    authorization_endpoint: "",
    token_endpoint: "",
    userinfo_endpoint: None,
    emails_endpoint: None,
    jwks_uri: None,
    issuers: &[],
    scopes: &["openid", "email", "profile"],
    scope_separator: " ",
    issues_id_tokens: true,
};

/// OIDC provider discovery document
#[derive(Debug, Clone, Deserialize)]
pub struct OidcDiscovery {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: Option<String>,
    pub jwks_uri: String,
    #[serde(default)]
    pub scopes_supported: Option<Vec<String>>,
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
}

pub fn discovery_url(issuer_url: &str) -> String {
    format!("{}/.well-known/openid-configuration", issuer_url.trim_end_matches('/'))
}

impl ProviderConfig {
    /// Build a generic OIDC provider from the issuer's discovery document
    pub async fn discover(
        http_client: &reqwest::Client,
        provider_id: impl Into<String>,
        issuer_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Result<Self> {
        let url = discovery_url(issuer_url);
        info!(url = %url, "Fetching OIDC discovery document");

        let response = http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(BrokerError::unavailable(format!(
                "discovery request returned {}",
                response.status()
            )));
        }

        let discovery: OidcDiscovery = response.json().await.map_err(|e| {
            BrokerError::unavailable(format!("Failed to parse OIDC discovery: {}", e))
        })?;

        let mut config = ProviderConfig::new(
            provider_id,
            ProviderKind::Oidc,
            client_id,
            client_secret,
            callback_url,
        )
        .with_authorization_endpoint(discovery.authorization_endpoint)
        .with_token_endpoint(discovery.token_endpoint)
        .with_jwks_uri(discovery.jwks_uri)
        .with_issuer(discovery.issuer);

        if let Some(userinfo) = discovery.userinfo_endpoint {
            config = config.with_userinfo_endpoint(userinfo);
        }

        config.validate()?;
        Ok(config)
    }
}
