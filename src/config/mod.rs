// ABOUTME: Configuration types and parsing for app.yml.
// ABOUTME: Handles YAML parsing, discovery in an app directory, and validation.

mod init;
mod jitter;
mod shared;
mod source;

pub use init::init_app;
pub use jitter::JitterConfig;
pub use shared::SharedConfig;
pub use source::{GitConfig, ProviderKind, SourceConfig};

use crate::error::{Error, Result};
use crate::layout::{CONFIG_FILENAME, CONFIG_FILENAME_ALT};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,

    #[serde(default)]
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_keep_releases")]
    pub keep_releases: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<JitterConfig>,

    #[serde(default)]
    pub shared: SharedConfig,
}

fn default_keep_releases() -> usize {
    3
}

impl Default for DeployConfig {
    fn default() -> Self {
        DeployConfig {
            keep_releases: default_keep_releases(),
            jitter: None,
            shared: SharedConfig::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the config file from an app directory.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [dir.join(CONFIG_FILENAME), dir.join(CONFIG_FILENAME_ALT)];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.deploy.keep_releases == 0 {
            return Err(Error::InvalidConfig(
                "keep_releases must be at least 1".to_string(),
            ));
        }

        if let Some(jitter) = &self.deploy.jitter
            && jitter.min > jitter.max
        {
            return Err(Error::InvalidConfig(format!(
                "jitter min ({}) exceeds max ({})",
                jitter.min, jitter.max
            )));
        }

        self.deploy.shared.validate().map_err(Error::InvalidConfig)?;

        Ok(())
    }

    /// Default configuration written by `init`.
    pub fn template(repo: &str, branch: &str) -> Self {
        Config {
            source: SourceConfig {
                provider: ProviderKind::Git,
                git: Some(GitConfig {
                    repo: repo.to_string(),
                    branch: branch.to_string(),
                }),
            },
            deploy: DeployConfig::default(),
        }
    }
}
