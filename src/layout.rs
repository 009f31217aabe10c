// ABOUTME: Filesystem layout of a managed application directory.
// ABOUTME: Every path the release, lock, hook and provider code touches is derived here.

use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "app.yml";
pub const CONFIG_FILENAME_ALT: &str = "app.yaml";

const RELEASES_DIR: &str = "releases";
const SHARED_DIR: &str = "shared";
const LOGS_DIR: &str = "logs";
const MIRROR_DIR: &str = "mirror";
const CURRENT_LINK: &str = "current";
const PREVIOUS_LINK: &str = "previous";
const LOCK_FILENAME: &str = "deploy.lock";

/// Name of the revision marker written into every release.
pub const REVISION_FILENAME: &str = "REVISION";

/// Paths under one application directory.
///
/// ```text
/// <app>/
///   app.yml
///   deploy.lock
///   current -> releases/<ts>
///   previous -> releases/<ts>
///   releases/<ts>/REVISION
///   shared/
///   logs/
///   mirror/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLayout {
    root: PathBuf,
}

impl AppLayout {
    /// A relative `root` is resolved against the current directory, so
    /// symlink targets and hook paths stay valid from any working directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILENAME)
    }

    pub fn releases_dir(&self) -> PathBuf {
        self.root.join(RELEASES_DIR)
    }

    pub fn shared_dir(&self) -> PathBuf {
        self.root.join(SHARED_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    /// Local source mirror used by the git provider.
    pub fn mirror_dir(&self) -> PathBuf {
        self.root.join(MIRROR_DIR)
    }

    pub fn current_link(&self) -> PathBuf {
        self.root.join(CURRENT_LINK)
    }

    pub fn previous_link(&self) -> PathBuf {
        self.root.join(PREVIOUS_LINK)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILENAME)
    }

    /// Directories created by `init`.
    pub fn skeleton(&self) -> [PathBuf; 3] {
        [self.releases_dir(), self.shared_dir(), self.logs_dir()]
    }
}
