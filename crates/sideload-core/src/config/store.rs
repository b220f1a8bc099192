//! Config store for loading and saving sideload.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{
    DeployConfig, parser,
    paths::{config_path_in, default_config_dir},
};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn with_defaults() -> anyhow::Result<Self> {
        Ok(Self::from_dir(default_config_dir()?))
    }

    pub fn from_dir(config_dir: PathBuf) -> Self {
        Self {
            config_path: config_path_in(&config_dir),
        }
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the config, falling back to defaults when the file is absent.
    pub fn load(&self) -> anyhow::Result<DeployConfig> {
        if !self.config_path.exists() {
            return Ok(DeployConfig::new());
        }
        parser::parse_config_toml(&self.config_path)
    }

    pub fn save(&self, config: &DeployConfig) -> anyhow::Result<()> {
        let content = parser::to_toml(config)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}
