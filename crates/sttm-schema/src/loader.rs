//! Registry loader for YAML and JSON configuration files

use std::path::Path;
use tracing::{info, trace};

use crate::config::RegistryConfig;
use crate::registry::Registry;
use crate::{Error, Result};

/// Loads a [`Registry`] from configuration text or files
#[derive(Debug, Clone)]
pub struct RegistryLoader {
    /// Fail on dangling mapping-rule references at load time
    strict_references: bool,
}

impl RegistryLoader {
    /// Create a loader that rejects dangling references
    pub fn new() -> Self {
        Self {
            strict_references: true,
        }
    }

    /// Configure whether dangling references are rejected at load time.
    ///
    /// A lenient loader defers them to record time, where the engine
    /// reports them per record.
    pub fn strict_references(mut self, strict: bool) -> Self {
        self.strict_references = strict;
        self
    }

    /// Load a registry from a file, choosing the format by extension
    pub fn load_from_file(&self, path: &Path) -> Result<Registry> {
        let config = self.read_config(path)?;
        self.finish(&config)
    }

    /// Read the configuration records of a file without building a registry
    pub fn read_config(&self, path: &Path) -> Result<RegistryConfig> {
        trace!("Loading registry from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;

        if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            Self::parse_yaml(&content)
        } else {
            Self::parse_json(&content)
        }
    }

    /// Load a registry from a YAML string
    pub fn load_from_yaml(&self, yaml: &str) -> Result<Registry> {
        let config = Self::parse_yaml(yaml)?;
        self.finish(&config)
    }

    /// Load a registry from a JSON string
    pub fn load_from_json(&self, json: &str) -> Result<Registry> {
        let config = Self::parse_json(json)?;
        self.finish(&config)
    }

    fn parse_yaml(yaml: &str) -> Result<RegistryConfig> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidFormat(format!("YAML parse error: {e}")))
    }

    fn parse_json(json: &str) -> Result<RegistryConfig> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))
    }

    fn finish(&self, config: &RegistryConfig) -> Result<Registry> {
        let registry = config.build()?;
        if self.strict_references {
            registry.validate()?;
        }

        info!(
            mappings = registry.mapping_rules().len(),
            tables = ?registry.tables(),
            "Loaded registry"
        );
        Ok(registry)
    }
}

impl Default for RegistryLoader {
    fn default() -> Self {
        Self::new()
    }
}
