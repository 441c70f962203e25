use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::object_table::MAX_TABLE_CAPACITY;

/// Top-level configuration, loaded from gpuwire.toml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireConfig {
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Ids at or above this value are rejected by every object table.
    /// At most `MAX_TABLE_CAPACITY` (1048576).
    #[serde(default = "default_max_objects")]
    pub max_objects_per_table: u32,
    /// Return-command payloads above this many bytes are LZ4-compressed
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: usize,
    /// Stream id stamped on every outgoing frame
    #[serde(default)]
    pub stream_id: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_objects_per_table: default_max_objects(),
            compression_threshold: default_compression_threshold(),
            stream_id: 0,
        }
    }
}

impl WireConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(content).map_err(|e| CoreError::ConfigError(e.to_string()))?;
        if config.server.max_objects_per_table > MAX_TABLE_CAPACITY {
            return Err(CoreError::ConfigError(format!(
                "max_objects_per_table {} exceeds the limit of {}",
                config.server.max_objects_per_table, MAX_TABLE_CAPACITY
            )));
        }
        Ok(config)
    }

    /// Load configuration from file if it exists, otherwise return defaults.
    pub fn load_or_default(path: &str) -> Self {
        Self::load(path).unwrap_or_default()
    }

    pub fn to_toml(&self) -> Result<String, CoreError> {
        toml::to_string_pretty(self).map_err(|e| CoreError::ConfigError(e.to_string()))
    }
}

/// Returns the default config file path.
/// Search order:
/// 1. System-wide config: `/etc/gpuwire/gpuwire.toml`
/// 2. Local fallback: `./gpuwire.toml`
pub fn default_config_path() -> String {
    let system_path = "/etc/gpuwire/gpuwire.toml";
    if std::path::Path::new(system_path).exists() {
        return system_path.to_string();
    }
    "gpuwire.toml".to_string()
}

fn default_max_objects() -> u32 {
    65536
}

fn default_compression_threshold() -> usize {
    512
}
