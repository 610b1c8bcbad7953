//! FedGate Configuration System
//!
//! TOML-based configuration with environment variable override support.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Upper bound for session and login-state lifetimes (one year)
pub const MAX_TTL_SECS: i64 = 365 * 24 * 3600;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FedGateConfig {
    pub session: SessionConfig,
    pub login: LoginConfig,
    pub http: HttpClientConfig,
    pub jwks: JwksConfig,
    pub providers: Vec<ProviderSettings>,
}

/// Session lifetime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session time-to-live in seconds
    pub ttl_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 86400, // 24 hours
        }
    }
}

/// Pending login (anti-forgery state) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// How long an issued state may wait for its callback, in seconds
    pub state_ttl_secs: i64,
    /// Cap on states awaiting their callback
    pub max_pending_states: usize,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            state_ttl_secs: 600, // 10 minutes
            max_pending_states: 10_000,
        }
    }
}

/// Outbound HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Timeout for every provider call in milliseconds
    pub timeout_ms: u64,
    /// User-Agent sent to providers (GitHub rejects requests without one)
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            user_agent: "fedgate".to_string(),
        }
    }
}

/// Signing key cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwksConfig {
    /// Keys are refetched once they are older than this
    pub refresh_interval_secs: u64,
    /// Minimum spacing between forced refreshes on an unknown key id
    pub min_refresh_interval_secs: u64,
    /// Leeway applied to exp/nbf checks
    pub clock_skew_secs: u64,
}

impl Default for JwksConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 3600,
            min_refresh_interval_secs: 30,
            clock_skew_secs: 0,
        }
    }
}

/// Supported identity provider families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    Facebook,
    Github,
    /// Any OpenID Connect issuer configured by explicit endpoints
    Oidc,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Facebook => "facebook",
            ProviderKind::Github => "github",
            ProviderKind::Oidc => "oidc",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `[[providers]]` entry
///
/// Endpoint fields are optional: well-known providers fall back to their
/// published endpoints, `oidc` providers must set them.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub id: String,
    pub kind: ProviderKind,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub callback_url: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    /// GitHub only: address list consulted when the profile hides the email
    #[serde(default)]
    pub emails_endpoint: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("callback_url", &self.callback_url)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl FedGateConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: FedGateConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Reject settings the broker cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.ttl_secs <= 0 || self.session.ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::ValidationError(format!(
                "session.ttl_secs must be between 1 and {}",
                MAX_TTL_SECS
            )));
        }
        if self.login.state_ttl_secs <= 0 || self.login.state_ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::ValidationError(format!(
                "login.state_ttl_secs must be between 1 and {}",
                MAX_TTL_SECS
            )));
        }
        if self.login.max_pending_states == 0 {
            return Err(ConfigError::ValidationError(
                "login.max_pending_states must be positive".to_string(),
            ));
        }
        if self.http.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "http.timeout_ms must be positive".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "provider id must not be empty".to_string(),
                ));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate provider id: {}",
                    provider.id
                )));
            }
            if provider.client_id.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "provider {} has no client_id",
                    provider.id
                )));
            }
            if provider.kind == ProviderKind::Oidc
                && (provider.authorization_endpoint.is_none()
                    || provider.token_endpoint.is_none()
                    || provider.issuer.is_none())
            {
                return Err(ConfigError::ValidationError(format!(
                    "oidc provider {} needs authorization_endpoint, token_endpoint and issuer",
                    provider.id
                )));
            }
        }

        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# FedGate Configuration
# Environment variables override these settings

[session]
ttl_secs = 86400

[login]
state_ttl_secs = 600
max_pending_states = 10000

[http]
timeout_ms = 10000
user_agent = "fedgate"

[jwks]
refresh_interval_secs = 3600
min_refresh_interval_secs = 30
clock_skew_secs = 0

# Secrets: prefer FEDGATE_PROVIDER_<ID>_CLIENT_SECRET over this file
[[providers]]
id = "google"
kind = "google"
client_id = "your-client-id.apps.googleusercontent.com"
callback_url = "http://localhost:5000/auth/google/callback"

[[providers]]
id = "facebook"
kind = "facebook"
client_id = "your-app-id"
callback_url = "http://localhost:5000/auth/facebook/callback"
scopes = ["email", "public_profile"]

[[providers]]
id = "github"
kind = "github"
client_id = "your-github-client-id"
callback_url = "http://localhost:5000/auth/github/callback"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = FedGateConfig::default();
        assert_eq!(config.session.ttl_secs, 86400);
        assert_eq!(config.login.state_ttl_secs, 600);
        assert_eq!(config.http.timeout_ms, 10_000);
        assert_eq!(config.jwks.clock_skew_secs, 0);
        assert!(config.providers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_toml_parses_and_validates() {
        let config = FedGateConfig::from_toml_str(&FedGateConfig::example_toml()).unwrap();
        assert_eq!(config.providers.len(), 3);
        assert_eq!(config.providers[0].kind, ProviderKind::Google);
        assert_eq!(config.providers[1].scopes, vec!["email", "public_profile"]);
        assert_eq!(config.providers[2].kind, ProviderKind::Github);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[session]
ttl_secs = 60

[[providers]]
id = "corp"
kind = "oidc"
client_id = "corp-client"
callback_url = "https://app.example.com/auth/corp/callback"
authorization_endpoint = "https://idp.example.com/authorize"
token_endpoint = "https://idp.example.com/token"
jwks_uri = "https://idp.example.com/jwks"
issuer = "https://idp.example.com"
"#
        )
        .unwrap();

        let config = FedGateConfig::from_file(file.path()).unwrap();
        assert_eq!(config.session.ttl_secs, 60);
        assert_eq!(config.login.state_ttl_secs, 600);
        assert_eq!(config.providers[0].kind, ProviderKind::Oidc);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_provider() {
        let mut config = FedGateConfig::from_toml_str(&FedGateConfig::example_toml()).unwrap();
        let mut dup = config.providers[0].clone();
        dup.client_id = "other".to_string();
        config.providers.push(dup);

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate provider id: google"));
    }

    #[test]
    fn test_validate_rejects_incomplete_oidc() {
        let config = FedGateConfig::from_toml_str(
            r#"
[[providers]]
id = "corp"
kind = "oidc"
client_id = "corp-client"
callback_url = "https://app.example.com/cb"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_ttls() {
        let mut config = FedGateConfig::default();
        config.session.ttl_secs = 10_000_000_000_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("session.ttl_secs"));

        let mut config = FedGateConfig::default();
        config.login.state_ttl_secs = MAX_TTL_SECS + 1;
        assert!(config.validate().is_err());

        let mut config = FedGateConfig::default();
        config.session.ttl_secs = MAX_TTL_SECS;
        config.login.state_ttl_secs = MAX_TTL_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_pending_cap() {
        let mut config = FedGateConfig::default();
        config.login.max_pending_states = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_github_emails_endpoint_override() {
        let config = FedGateConfig::from_toml_str(
            r#"
[[providers]]
id = "ghe"
kind = "github"
client_id = "ghe-client"
callback_url = "https://app.example.com/auth/ghe/callback"
userinfo_endpoint = "https://ghe.example.com/api/v3/user"
emails_endpoint = "https://ghe.example.com/api/v3/user/emails"
"#,
        )
        .unwrap();
        assert_eq!(
            config.providers[0].emails_endpoint.as_deref(),
            Some("https://ghe.example.com/api/v3/user/emails")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let mut config = FedGateConfig::from_toml_str(&FedGateConfig::example_toml()).unwrap();
        config.providers[0].client_secret = "GOCSPX-very-secret".to_string();
        let rendered = format!("{:?}", config.providers[0]);
        assert!(!rendered.contains("GOCSPX"));
        assert!(rendered.contains("<redacted>"));
    }
}
