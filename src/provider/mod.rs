// ABOUTME: Source provider abstraction: where release contents come from.
// ABOUTME: The deployer only talks to the trait; git is the one shipped backend.

mod git;

pub use git::GitProvider;

use std::path::Path;

use async_trait::async_trait;

use crate::config::{ProviderKind, SourceConfig};
use crate::layout::AppLayout;
use crate::types::{Revision, RevisionError};

/// Supplies revision identity and source trees.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Bring the provider's local state up to date (clone, fetch, ...).
    async fn initialize(&self) -> Result<(), ProviderError>;

    /// Revision that [`SourceProvider::materialize`] would produce.
    async fn revision(&self) -> Result<Revision, ProviderError>;

    /// Write the source tree into an existing, empty directory.
    async fn materialize(&self, target: &Path) -> Result<(), ProviderError>;
}

/// Errors from source providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("git executable not found in PATH")]
    GitNotFound,

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("provider returned an invalid revision: {0}")]
    InvalidRevision(#[from] RevisionError),

    #[error("{0} provider is not configured")]
    NotConfigured(ProviderKind),

    #[error("{0} provider requires a repository")]
    MissingRepository(ProviderKind),
}

/// Build the provider selected in the config for an app directory.
pub fn from_config(
    source: &SourceConfig,
    layout: &AppLayout,
) -> Result<Box<dyn SourceProvider>, ProviderError> {
    match source.provider {
        ProviderKind::Git => {
            let git = source
                .git
                .as_ref()
                .ok_or(ProviderError::NotConfigured(ProviderKind::Git))?;
            if git.repo.trim().is_empty() {
                return Err(ProviderError::MissingRepository(ProviderKind::Git));
            }
            Ok(Box::new(GitProvider::new(
                git.clone(),
                layout.root(),
                layout.mirror_dir(),
            )))
        }
    }
}
