//! Configuration for cryptography clients

use crate::algorithm::{AlgorithmRegistry, KeyWrapProvider};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Options shared by every dispatch client of a [`crate::CryptographyClient`]
#[derive(Debug, Clone, Default)]
pub struct CryptographyClientOptions {
    /// Implementation used for local AES key wrap
    pub key_wrap_provider: KeyWrapProvider,

    /// Skip local execution and delegate every operation
    pub force_remote: bool,

    /// Registry used to resolve algorithm names; `None` uses the shared one
    pub registry: Option<Arc<AlgorithmRegistry>>,

    /// Additional configuration parameters
    pub parameters: HashMap<String, String>,
}

impl CryptographyClientOptions {
    /// Creates options that run locally with the shared registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a configuration parameter
    pub fn set_parameter(&mut self, key: &str, value: &str) {
        self.parameters.insert(key.to_string(), value.to_string());
    }

    /// Gets a configuration parameter
    pub fn get_parameter(&self, key: &str) -> Option<&String> {
        self.parameters.get(key)
    }

    pub fn with_key_wrap_provider(mut self, provider: KeyWrapProvider) -> Self {
        self.key_wrap_provider = provider;
        self
    }

    pub fn with_force_remote(mut self, force_remote: bool) -> Self {
        self.force_remote = force_remote;
        self
    }

    pub fn with_registry(mut self, registry: Arc<AlgorithmRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The injected registry, or the process-wide one
    pub fn registry(&self) -> Arc<AlgorithmRegistry> {
        self.registry.clone().unwrap_or_else(AlgorithmRegistry::shared)
    }
}

/// Validates client options
///
/// `has_remote` tells whether a remote collaborator will be attached.
pub fn validate(options: &CryptographyClientOptions, has_remote: bool) -> Result<()> {
    if options.force_remote && !has_remote {
        return Err(Error::MissingConfig(
            "force_remote requires a remote cryptography client".to_string(),
        ));
    }
    if let Some(registry) = &options.registry {
        if !has_remote && registry.names()?.is_empty() {
            return Err(Error::MissingConfig(
                "algorithm registry is empty and no remote client is configured".to_string(),
            ));
        }
    }
    Ok(())
}
