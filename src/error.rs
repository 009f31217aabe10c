// ABOUTME: Application-wide error types for relay.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::{DeployError, LockError, State};
use crate::provider::ProviderError;
use crate::release::ReleaseError;
use crate::types::AppNameError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration not found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid app name: {0}")]
    InvalidAppName(#[from] AppNameError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error("source provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("deployment failed during {stage}: {reason}")]
    DeploymentFailed { stage: State, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
