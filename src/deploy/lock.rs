// ABOUTME: Deploy lock to prevent concurrent runs against the same app directory.
// ABOUTME: A marker file created with O_EXCL; its JSON body only describes the holder.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::AppLayout;

/// Lock manager errors.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another run owns the app directory.
    #[error("deployment already in progress{}", holder_suffix(.holder))]
    Held { holder: Option<LockInfo> },

    #[error("failed to create lock file {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove lock file {path}: {source}")]
    Release {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn holder_suffix(holder: &Option<LockInfo>) -> String {
    match holder {
        Some(info) => format!(
            " (held by {} pid {} since {})",
            info.holder, info.pid, info.started_at
        ),
        None => String::new(),
    }
}

/// Information about who holds a deploy lock.
///
/// Written into the marker for humans inspecting a stuck lock. Ownership is
/// decided by the marker's existence alone, never by these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new() -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
        }
    }

    /// Read the holder info from an existing marker, if it is parseable.
    pub fn read(layout: &AppLayout) -> Option<Self> {
        let content = fs::read_to_string(layout.lock_path()).ok()?;
        serde_json::from_str(&content).ok()
    }
}

impl Default for LockInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// A held deploy lock.
///
/// Deliberately has no `Drop` impl: the marker only goes away through
/// [`DeployLock::release`]. A run that aborts fatally leaves it in place.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
}

impl DeployLock {
    /// Acquire the lock for an app directory.
    ///
    /// Not reentrant: a second call without an intervening release fails
    /// with [`LockError::Held`], even from the same process.
    pub fn acquire(layout: &AppLayout) -> Result<Self, LockError> {
        let path = layout.lock_path();

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(LockError::Held {
                    holder: LockInfo::read(layout),
                });
            }
            Err(source) => return Err(LockError::Create { path, source }),
        };

        // The marker already exists at this point; the body is informational.
        match serde_json::to_string(&LockInfo::new()) {
            Ok(body) => {
                if let Err(e) = file.write_all(body.as_bytes()) {
                    tracing::warn!(error = %e, "failed to write lock holder info");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize lock holder info"),
        }

        tracing::debug!(lock = %path.display(), "acquired deploy lock");
        Ok(Self { path })
    }

    /// Release the lock by removing the marker.
    pub fn release(self) -> Result<(), LockError> {
        fs::remove_file(&self.path).map_err(|source| LockError::Release {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(lock = %self.path.display(), "released deploy lock");
        Ok(())
    }

    /// Remove a marker left behind by a crashed or aborted run.
    ///
    /// Returns whether a marker existed.
    pub fn break_stale(layout: &AppLayout) -> Result<bool, LockError> {
        let path = layout.lock_path();
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::warn!(lock = %path.display(), "removed deploy lock");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(LockError::Release { path, source }),
        }
    }

    /// Whether any run currently holds the lock.
    pub fn is_held(layout: &AppLayout) -> bool {
        fs::symlink_metadata(layout.lock_path()).is_ok()
    }
}
