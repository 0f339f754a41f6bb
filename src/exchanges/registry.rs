//! Registry of exchange adapters.

use std::collections::HashMap;

use tracing::info;

use super::{ExchangeAdapter, RegistryError, adapters};
use crate::config::Config;

/// Registry maps exchange names to their adapters.
///
/// Adapters are registered once at startup and never change afterwards.
/// Iteration follows registration order, which fixes the order in which
/// quotes are compared.
#[derive(Debug, Default)]
pub struct Registry {
    adapters: Vec<ExchangeAdapter>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from configuration.
    ///
    /// Enabled exchanges are registered in built-in scan order, with their
    /// configured base URL when one is set. Unknown exchange names fail.
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let mut enabled: Vec<(usize, ExchangeAdapter)> = Vec::new();

        for (name, exchange_config) in &config.exchanges {
            let id = adapters::canonical_id(name)
                .ok_or_else(|| RegistryError::UnknownExchange(name.clone()))?;

            if !exchange_config.enabled {
                info!(exchange = %name, "Skipping disabled exchange");
                continue;
            }

            let adapter = adapters::builtin(id)
                .ok_or_else(|| RegistryError::UnknownExchange(name.clone()))?;
            let adapter = match exchange_config.base_url.as_deref() {
                Some(url) if !url.trim().is_empty() => adapter.with_base_url(url),
                _ => adapter,
            };

            let position = adapters::BUILTIN_EXCHANGES
                .iter()
                .position(|b| *b == id)
                .unwrap_or(usize::MAX);
            enabled.push((position, adapter));
        }

        enabled.sort_by_key(|(position, _)| *position);

        let mut registry = Self::new();
        for (_, adapter) in enabled {
            registry.register(adapter)?;
        }
        Ok(registry)
    }

    /// Registers a new adapter. Fails if the name is already taken.
    pub fn register(&mut self, adapter: ExchangeAdapter) -> Result<(), RegistryError> {
        let name = adapter.name().to_string();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateExchange(name));
        }

        info!(exchange = %name, base_url = %adapter.base_url(), "Registering exchange");
        self.index.insert(name, self.adapters.len());
        self.adapters.push(adapter);
        Ok(())
    }

    /// Returns the adapter registered under `name`.
    pub fn lookup(&self, name: &str) -> Result<&ExchangeAdapter, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.adapters[i])
            .ok_or_else(|| RegistryError::UnknownExchange(name.to_string()))
    }

    /// Iterates adapters in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ExchangeAdapter> {
        self.adapters.iter()
    }

    /// Returns all registered exchange names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
