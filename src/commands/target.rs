// ABOUTME: Resolves the app directory a command operates on from its --file argument.
// ABOUTME: The app directory is always the directory containing app.yml.

use relay::config::Config;
use relay::error::{Error, Result};
use relay::layout::AppLayout;
use std::path::{Path, PathBuf};

/// An app directory plus the config file that selected it.
pub struct AppTarget {
    pub layout: AppLayout,
    config_path: Option<PathBuf>,
}

impl AppTarget {
    /// Accepts either a config file or an app directory.
    pub fn resolve(file: &Path) -> Result<Self> {
        if file.is_dir() {
            return Ok(Self {
                layout: AppLayout::new(file.canonicalize()?),
                config_path: None,
            });
        }

        if !file.is_file() {
            return Err(Error::ConfigNotFound(file.to_path_buf()));
        }

        // Absolute paths keep shared symlinks and git prefixes valid
        // regardless of the working directory.
        let config_path = file.canonicalize()?;
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::ConfigNotFound(config_path.clone()))?;

        Ok(Self {
            layout: AppLayout::new(root),
            config_path: Some(config_path),
        })
    }

    pub fn load_config(&self) -> Result<Config> {
        match &self.config_path {
            Some(path) => Config::load(path),
            None => Config::discover(self.layout.root()),
        }
    }
}
