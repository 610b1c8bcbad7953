//! Credential Verification
//!
//! Turns the raw credential a provider hands back into [`CanonicalClaims`].
//! Signed ID tokens are verified against the issuer's published keys, opaque
//! access tokens are resolved through the provider's user-info endpoint and
//! authorization codes are first exchanged at the token endpoint.

mod exchange;
mod id_token;
mod jwks;
mod profile;

use std::time::Duration;

use fg_config::FedGateConfig;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{BrokerError, Result};
use crate::provider::ProviderConfig;

pub use exchange::TokenResponse;
pub use jwks::JwksCache;

/// Credential returned by a provider, consumed by one login attempt
pub enum RawCredential {
    /// Signed JWT
    IdToken(String),
    /// Opaque bearer token
    AccessToken(String),
    /// `code` query parameter of the authorization-code flow
    AuthorizationCode(String),
}

impl RawCredential {
    pub fn kind(&self) -> &'static str {
        match self {
            RawCredential::IdToken(_) => "id_token",
            RawCredential::AccessToken(_) => "access_token",
            RawCredential::AuthorizationCode(_) => "authorization_code",
        }
    }
}

impl std::fmt::Debug for RawCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawCredential::{}(<redacted>)", self.kind())
    }
}

/// Verified provider claims
///
/// Standard OIDC claim names are lifted into the typed fields; the full
/// payload stays available under `raw`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalClaims {
    pub subject_id: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub issuer: String,
    pub raw: Map<String, Value>,
}

impl CanonicalClaims {
    pub fn from_raw(issuer: impl Into<String>, raw: Map<String, Value>) -> Self {
        let string_claim = |name: &str| raw.get(name).and_then(Value::as_str).map(String::from);

        let email_verified = match raw.get("email_verified") {
            Some(Value::Bool(b)) => Some(*b),
            // Some issuers send the flag as a string
            Some(Value::String(s)) => s.parse::<bool>().ok(),
            _ => None,
        };

        Self {
            subject_id: string_claim("sub"),
            display_name: string_claim("name"),
            email: string_claim("email"),
            email_verified,
            issuer: issuer.into(),
            raw,
        }
    }
}

/// Values issued by `begin_login` for the flow being completed
#[derive(Debug, Clone, Default)]
pub struct FlowContext {
    pub nonce: Option<String>,
    pub code_verifier: Option<String>,
}

/// Outbound call and key cache settings
#[derive(Debug, Clone)]
pub struct VerifierOptions {
    pub timeout: Duration,
    pub user_agent: String,
    pub jwks_refresh_interval: Duration,
    pub jwks_min_refresh_interval: Duration,
    /// Leeway in seconds for `exp` and `nbf`
    pub clock_skew_secs: u64,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self::from_config(&FedGateConfig::default())
    }
}

impl VerifierOptions {
    pub fn from_config(config: &FedGateConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.http.timeout_ms),
            user_agent: config.http.user_agent.clone(),
            jwks_refresh_interval: Duration::from_secs(config.jwks.refresh_interval_secs),
            jwks_min_refresh_interval: Duration::from_secs(config.jwks.min_refresh_interval_secs),
            clock_skew_secs: config.jwks.clock_skew_secs,
        }
    }
}

/// Validates raw provider credentials
pub struct CredentialVerifier {
    http_client: reqwest::Client,
    jwks: JwksCache,
    clock_skew_secs: u64,
}

impl CredentialVerifier {
    pub fn new(options: VerifierOptions) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| BrokerError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        let jwks = JwksCache::new(
            http_client.clone(),
            options.jwks_refresh_interval,
            options.jwks_min_refresh_interval,
        );

        Ok(Self {
            http_client,
            jwks,
            clock_skew_secs: options.clock_skew_secs,
        })
    }

    /// Shared HTTP client, also used for discovery
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    pub fn jwks(&self) -> &JwksCache {
        &self.jwks
    }

    /// Verify a credential issued by `provider`
    pub async fn verify(
        &self,
        provider: &ProviderConfig,
        credential: RawCredential,
        flow: &FlowContext,
    ) -> Result<CanonicalClaims> {
        debug!(provider_id = %provider.provider_id, credential = credential.kind(), "Verifying credential");

        match credential {
            RawCredential::IdToken(token) => self.verify_id_token(provider, &token, flow).await,
            RawCredential::AccessToken(token) => {
                // User-info responses are not bound to our client_id, so
                // ID-token providers must present an audience-checked token.
                if provider.issues_id_tokens() {
                    return Err(BrokerError::malformed(format!(
                        "{} requires an ID token or authorization code",
                        provider.kind
                    )));
                }
                profile::fetch_profile(&self.http_client, provider, &token).await
            }
            RawCredential::AuthorizationCode(code) => {
                let tokens = exchange::exchange_code(
                    &self.http_client,
                    provider,
                    &code,
                    flow.code_verifier.as_deref(),
                )
                .await?;

                match (tokens.id_token, tokens.access_token) {
                    (Some(id_token), _) if provider.issues_id_tokens() => {
                        self.verify_id_token(provider, &id_token, flow).await
                    }
                    (_, Some(access_token)) => {
                        profile::fetch_profile(&self.http_client, provider, &access_token).await
                    }
                    _ => Err(BrokerError::invalid_token(
                        "token response carried no usable token",
                    )),
                }
            }
        }
    }

    async fn verify_id_token(
        &self,
        provider: &ProviderConfig,
        token: &str,
        flow: &FlowContext,
    ) -> Result<CanonicalClaims> {
        if !provider.issues_id_tokens() {
            return Err(BrokerError::malformed(format!(
                "{} does not issue ID tokens",
                provider.kind
            )));
        }
        id_token::verify(&self.jwks, provider, token, flow.nonce.as_deref(), self.clock_skew_secs)
            .await
    }
}

/// Map an upstream HTTP status onto the broker's error kinds
pub(crate) fn check_status(status: reqwest::StatusCode, what: &str) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() {
        Err(BrokerError::unavailable(format!("{} returned {}", what, status)))
    } else {
        Err(BrokerError::invalid_token(format!("{} returned {}", what, status)))
    }
}
