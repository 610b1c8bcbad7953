//! Configuration loader with file and environment variable support

use crate::{ConfigError, FedGateConfig};
use std::env;
use std::io;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "fedgate.toml",
    "config.toml",
    "./config/fedgate.toml",
    "/etc/fedgate/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    ///
    /// A path given explicitly, or through `FEDGATE_CONFIG`, must exist.
    pub fn load(&self) -> Result<FedGateConfig, ConfigError> {
        let mut config = FedGateConfig::default();

        if let Some(path) = self.find_config_file()? {
            info!(?path, "Loading configuration from file");
            config = FedGateConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, |key| env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    fn find_config_file(&self) -> Result<Option<PathBuf>, ConfigError> {
        let explicit = self
            .config_path
            .clone()
            .or_else(|| env::var("FEDGATE_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::ReadError(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} does not exist", path.display()),
                )));
            }
            return Ok(Some(path));
        }

        Ok(CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists()))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment key prefix for a provider, e.g. `FEDGATE_PROVIDER_CORP_SSO_`
pub fn provider_env_prefix(provider_id: &str) -> String {
    let id: String = provider_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("FEDGATE_PROVIDER_{}_", id)
}

/// Apply `FEDGATE_*` overrides read through `lookup`
pub(crate) fn apply_overrides<F>(config: &mut FedGateConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // Session / login
    if let Some(ttl) = lookup("FEDGATE_SESSION_TTL_SECS").and_then(|v| v.parse().ok()) {
        config.session.ttl_secs = ttl;
    }
    if let Some(ttl) = lookup("FEDGATE_LOGIN_STATE_TTL_SECS").and_then(|v| v.parse().ok()) {
        config.login.state_ttl_secs = ttl;
    }
    if let Some(cap) = lookup("FEDGATE_LOGIN_MAX_PENDING_STATES").and_then(|v| v.parse().ok()) {
        config.login.max_pending_states = cap;
    }

    // HTTP
    if let Some(timeout) = lookup("FEDGATE_HTTP_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.http.timeout_ms = timeout;
    }
    if let Some(agent) = lookup("FEDGATE_HTTP_USER_AGENT") {
        config.http.user_agent = agent;
    }

    // JWKS
    if let Some(secs) = lookup("FEDGATE_JWKS_REFRESH_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
        config.jwks.refresh_interval_secs = secs;
    }
    if let Some(secs) = lookup("FEDGATE_JWKS_MIN_REFRESH_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
        config.jwks.min_refresh_interval_secs = secs;
    }
    if let Some(secs) = lookup("FEDGATE_JWKS_CLOCK_SKEW_SECS").and_then(|v| v.parse().ok()) {
        config.jwks.clock_skew_secs = secs;
    }

    // Per-provider credentials
    for provider in &mut config.providers {
        let prefix = provider_env_prefix(&provider.id);
        if let Some(val) = lookup(&format!("{}CLIENT_ID", prefix)) {
            provider.client_id = val;
        }
        if let Some(val) = lookup(&format!("{}CLIENT_SECRET", prefix)) {
            provider.client_secret = val;
        }
        if let Some(val) = lookup(&format!("{}CALLBACK_URL", prefix)) {
            provider.callback_url = val;
        }
    }
}
