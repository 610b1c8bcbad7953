use std::collections::HashMap;

use fg_config::ProviderSettings;
use tracing::info;

use super::ProviderConfig;
use crate::error::{BrokerError, Result};

/// Registered identity providers, keyed by provider id
///
/// Filled once at start and then shared read-only by the broker.
#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderConfig>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `[[providers]]` configuration entries
    pub fn from_settings(settings: &[ProviderSettings]) -> Result<Self> {
        let mut registry = Self::new();
        for entry in settings {
            registry.register(ProviderConfig::from_settings(entry)?)?;
        }
        Ok(registry)
    }

    /// Register a provider; the id must not be taken
    pub fn register(&mut self, config: ProviderConfig) -> Result<()> {
        if self.providers.contains_key(&config.provider_id) {
            return Err(BrokerError::duplicate_provider(&config.provider_id));
        }
        config.validate()?;

        info!(provider_id = %config.provider_id, kind = %config.kind, "Registered identity provider");
        self.providers.insert(config.provider_id.clone(), config);
        Ok(())
    }

    pub fn get(&self, provider_id: &str) -> Result<&ProviderConfig> {
        self.providers
            .get(provider_id)
            .ok_or_else(|| BrokerError::unknown_provider(provider_id))
    }

    /// Registered ids in sorted order
    pub fn provider_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
