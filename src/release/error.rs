// ABOUTME: Release lifecycle error types with SNAFU context selectors.
// ABOUTME: Every filesystem failure carries the path it was operating on.

use std::io;
use std::path::PathBuf;

use snafu::Snafu;

use crate::types::RevisionError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReleaseError {
    #[snafu(display("no current release exists"))]
    NoCurrentRelease,

    #[snafu(display("no previous release to roll back to"))]
    NoPreviousRelease,

    #[snafu(display("release directory {} does not exist", path.display()))]
    MissingRelease { path: PathBuf },

    #[snafu(display("failed to create release directory {}: {source}", path.display()))]
    CreateRelease { path: PathBuf, source: io::Error },

    #[snafu(display("failed to write revision marker {}: {source}", path.display()))]
    WriteRevision { path: PathBuf, source: io::Error },

    #[snafu(display("failed to read revision marker {}: {source}", path.display()))]
    ReadRevision { path: PathBuf, source: io::Error },

    #[snafu(display("revision marker {} is invalid: {source}", path.display()))]
    InvalidRevision { path: PathBuf, source: RevisionError },

    #[snafu(display("failed to read pointer {}: {source}", path.display()))]
    ReadPointer { path: PathBuf, source: io::Error },

    #[snafu(display("failed to create temporary pointer {}: {source}", path.display()))]
    CreatePointer { path: PathBuf, source: io::Error },

    #[snafu(display("failed to update pointer {}: {source}", path.display()))]
    SwapPointer { path: PathBuf, source: io::Error },

    #[snafu(display("failed to remove pointer {}: {source}", path.display()))]
    RemovePointer { path: PathBuf, source: io::Error },

    #[snafu(display("failed to list releases in {}: {source}", path.display()))]
    ListReleases { path: PathBuf, source: io::Error },

    #[snafu(display("failed to remove release {}: {source}", path.display()))]
    RemoveRelease { path: PathBuf, source: io::Error },
}

impl ReleaseError {
    /// True when there is simply nothing deployed yet.
    pub fn is_no_current_release(&self) -> bool {
        matches!(self, ReleaseError::NoCurrentRelease)
    }
}
