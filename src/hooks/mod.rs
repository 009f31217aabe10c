// ABOUTME: Lifecycle hook scripts shipped inside each release.
// ABOUTME: Discovers and executes <release>/.deploy/hooks/<name>; a missing hook is a no-op.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Hook execution points in the deployment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// After the source tree is materialized, before shared paths are linked.
    Clone,
    Build,
    /// Before the release is promoted to `current`.
    Deploy,
    PostDeploy,
    /// Last chance to reject a release. Failure rolls the deployment back.
    Verify,
}

impl Hook {
    pub const ALL: [Hook; 5] = [
        Hook::Clone,
        Hook::Build,
        Hook::Deploy,
        Hook::PostDeploy,
        Hook::Verify,
    ];

    /// Get the hook filename for this point.
    pub fn filename(&self) -> &'static str {
        match self {
            Hook::Clone => "clone",
            Hook::Build => "build",
            Hook::Deploy => "deploy",
            Hook::PostDeploy => "post_deploy",
            Hook::Verify => "verify",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filename())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("failed to execute {hook} hook {path}: {source}")]
    Spawn {
        hook: Hook,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{hook} hook exited with {}", exit_description(.code))]
    Failed { hook: Hook, code: Option<i32> },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Directory holding hook scripts, relative to a release.
pub const HOOKS_DIR: &str = ".deploy/hooks";

/// Discovers and runs hooks from a release directory.
pub struct HookRunner {
    release_dir: PathBuf,
    hooks_dir: PathBuf,
}

impl HookRunner {
    /// Create a new hook runner looking for hooks in the given release.
    pub fn new(release_dir: &Path) -> Self {
        Self {
            release_dir: release_dir.to_path_buf(),
            hooks_dir: release_dir.join(HOOKS_DIR),
        }
    }

    /// Check if a hook exists for the given point.
    pub fn hook_exists(&self, hook: Hook) -> bool {
        self.hook_path(hook).is_file()
    }

    fn hook_path(&self, hook: Hook) -> PathBuf {
        self.hooks_dir.join(hook.filename())
    }

    /// Run a hook if it exists.
    ///
    /// The script runs once, with the release as its working directory and
    /// the caller's stdout and stderr. Only the exit status is interpreted.
    pub async fn run(&self, hook: Hook) -> Result<(), HookError> {
        if !self.hook_exists(hook) {
            tracing::debug!(%hook, "no hook script, skipping");
            return Ok(());
        }

        let hook_path = self.hook_path(hook);

        tracing::info!(%hook, path = %hook_path.display(), "running hook");

        let status = Command::new(&hook_path)
            .current_dir(&self.release_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| HookError::Spawn {
                hook,
                path: hook_path.clone(),
                source,
            })?;

        if !status.success() {
            tracing::warn!(%hook, code = ?status.code(), "hook failed");
            return Err(HookError::Failed {
                hook,
                code: status.code(),
            });
        }

        tracing::info!(%hook, "hook completed successfully");
        Ok(())
    }
}

/// Run a single hook for a release.
pub async fn run_hook(release_dir: &Path, hook: Hook) -> Result<(), HookError> {
    HookRunner::new(release_dir).run(hook).await
}
