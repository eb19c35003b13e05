use anyhow::{Context, Result};
use rotary_core::KeyDirectory;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::validate::validate_config;

/// One `[[targets]]` entry as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Routing key of the session factory delegate.
    pub key: String,
    /// Remote directory polled through that delegate.
    pub directory: String,
}

/// Rotation settings for one polling endpoint.
///
/// ```toml
/// fair = false
///
/// [[targets]]
/// key = "east"
/// directory = "/inbound"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Rotate on every poll instead of only after an empty poll.
    #[serde(default)]
    pub fair: bool,
    /// Ordered rotation targets.
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

impl RotationConfig {
    /// Load from a TOML file. Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rotation config: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse rotation config: {}", path.display()))?;
        Ok(Some(config))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Validate and convert the targets into rotation entries, preserving order.
    pub fn key_directories(&self) -> Result<Vec<KeyDirectory>> {
        validate_config(self)?;
        self.targets
            .iter()
            .map(|t| KeyDirectory::new(t.key.as_str(), t.directory.as_str()).map_err(Into::into))
            .collect()
    }
}
