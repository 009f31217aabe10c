// ABOUTME: Git-backed source provider using the git CLI.
// ABOUTME: Keeps a working clone in <app>/mirror and exports trees with checkout-index.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::GitConfig;
use crate::types::Revision;

use super::{ProviderError, SourceProvider};

pub struct GitProvider {
    config: GitConfig,
    app_dir: PathBuf,
    mirror_dir: PathBuf,
}

impl GitProvider {
    pub fn new(config: GitConfig, app_dir: &Path, mirror_dir: PathBuf) -> Self {
        Self {
            config,
            app_dir: app_dir.to_path_buf(),
            mirror_dir,
        }
    }

    async fn has_mirror(&self) -> bool {
        if !self.mirror_dir.join(".git").exists() {
            return false;
        }
        git(&self.mirror_dir, &["rev-parse", "--git-dir"])
            .await
            .is_ok()
    }
}

#[async_trait]
impl SourceProvider for GitProvider {
    async fn initialize(&self) -> Result<(), ProviderError> {
        ensure_git().await?;

        if !self.has_mirror().await {
            let mirror = absolute(&self.mirror_dir)?;
            tracing::info!(
                repo = %self.config.repo,
                mirror = %mirror.display(),
                "cloning repository"
            );
            git(
                &self.app_dir,
                &["clone", &self.config.repo, &mirror.to_string_lossy()],
            )
            .await?;
        }

        let branch = self.config.branch.as_str();
        git(&self.mirror_dir, &["checkout", branch]).await?;
        git(&self.mirror_dir, &["pull", "--ff-only", "origin", branch]).await?;

        tracing::debug!(branch, "mirror up to date");
        Ok(())
    }

    async fn revision(&self) -> Result<Revision, ProviderError> {
        let stdout = git(&self.mirror_dir, &["rev-parse", "HEAD"]).await?;
        Ok(Revision::new(&stdout)?)
    }

    async fn materialize(&self, target: &Path) -> Result<(), ProviderError> {
        let target = absolute(target)?;
        let prefix = format!("--prefix={}/", target.display());
        git(&self.mirror_dir, &["checkout-index", "-a", "-f", &prefix]).await?;
        Ok(())
    }
}

async fn ensure_git() -> Result<(), ProviderError> {
    match Command::new("git").arg("--version").output().await {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(ProviderError::GitNotFound),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ProviderError::GitNotFound),
        Err(source) => Err(ProviderError::Spawn {
            command: "git --version".to_string(),
            source,
        }),
    }
}

/// Run git in `dir` and return its stdout.
async fn git(dir: &Path, args: &[&str]) -> Result<String, ProviderError> {
    let command = format!("git {}", args.join(" "));
    tracing::debug!(dir = %dir.display(), %command, "running git");

    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .await
        .map_err(|source| ProviderError::Spawn {
            command: command.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(ProviderError::Command {
            command,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn absolute(path: &Path) -> Result<PathBuf, ProviderError> {
    std::path::absolute(path).map_err(|source| ProviderError::Spawn {
        command: format!("resolve {}", path.display()),
        source,
    })
}
