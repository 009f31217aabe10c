// ABOUTME: Paths persisted across releases under the app's shared/ directory.
// ABOUTME: Each entry is symlinked into every new release during staging.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedConfig {
    #[serde(default)]
    pub dirs: Vec<PathBuf>,

    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl SharedConfig {
    /// All shared entries, directories first.
    pub fn entries(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().chain(self.files.iter()).map(PathBuf::as_path)
    }

    /// Reject entries that could point outside `shared/` or the release.
    pub(crate) fn validate(&self) -> Result<(), String> {
        for entry in self.entries() {
            if entry.as_os_str().is_empty() {
                return Err("shared path cannot be empty".to_string());
            }
            for component in entry.components() {
                match component {
                    Component::Normal(_) | Component::CurDir => {}
                    _ => {
                        return Err(format!(
                            "shared path must be relative and stay inside the app: {}",
                            entry.display()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
