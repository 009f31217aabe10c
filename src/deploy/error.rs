// ABOUTME: Error types for deployment runs.
// ABOUTME: StageError is contained and rolled back; DeployError aborts the run outright.

use std::path::PathBuf;

use crate::hooks::HookError;
use crate::provider::ProviderError;
use crate::release::ReleaseError;

use super::lock::LockError;
use super::state::State;

/// A failure inside a state handler.
///
/// The engine records it, moves to [`State::Error`] and runs the registered
/// compensations. The run still reaches `Finalize`.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("source provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error("no release has been staged")]
    NothingStaged,

    #[error("failed to link shared path {path}: {source}")]
    SharedLink {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A defect in the state machine itself.
///
/// Aborts immediately: no further handler runs, `Finalize` is skipped and a
/// held lock stays in place.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("no handler registered for state {0}")]
    NoHandler(State),

    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: State, to: State },
}
