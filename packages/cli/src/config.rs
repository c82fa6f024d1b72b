use anyhow::Context;
use remote_tree_core::{DeliveryMode, RootOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "remote-tree.config.json";

/// Remote tree configuration file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Component types scripts may create. Empty allows any type.
    #[serde(default)]
    pub components: Vec<String>,

    /// How mutations wait on remote delivery
    #[serde(default)]
    pub delivery: DeliveryMode,
}

impl Config {
    /// Load config from a directory, falling back to defaults
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load an explicitly named config file. A missing file is an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn root_options(&self) -> RootOptions {
        RootOptions::new()
            .with_components(self.components.iter().cloned())
            .with_delivery(self.delivery)
    }
}
