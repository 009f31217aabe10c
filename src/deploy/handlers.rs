// ABOUTME: Default handler for every deployment state.
// ABOUTME: Stage failures are returned as Outcome::Contained; none of these raise fatal errors.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::BoxFuture;
use rand::Rng;

use crate::config::{JitterConfig, SharedConfig};
use crate::diagnostics::Warning;
use crate::hooks::{Hook, run_hook};
use crate::layout::AppLayout;
use crate::release;

use super::context::{Compensation, RunContext};
use super::error::{DeployError, StageError};
use super::lock::DeployLock;
use super::machine::Outcome;
use super::state::State;

type HandlerFuture<'a> = BoxFuture<'a, Result<Outcome, DeployError>>;

fn contain(result: Result<State, StageError>) -> Result<Outcome, DeployError> {
    Ok(match result {
        Ok(next) => Outcome::Next(next),
        Err(e) => Outcome::Contained(e),
    })
}

pub(crate) fn init(ctx: &mut RunContext) -> HandlerFuture<'_> {
    Box::pin(async move { contain(init_stage(ctx).await) })
}

pub(crate) fn detect_changes(ctx: &mut RunContext) -> HandlerFuture<'_> {
    Box::pin(async move { contain(detect_changes_stage(ctx).await) })
}

pub(crate) fn clone(ctx: &mut RunContext) -> HandlerFuture<'_> {
    Box::pin(async move { contain(clone_stage(ctx).await) })
}

pub(crate) fn build(ctx: &mut RunContext) -> HandlerFuture<'_> {
    Box::pin(async move { contain(hook_stage(ctx, Hook::Build, State::Deploy).await) })
}

pub(crate) fn deploy(ctx: &mut RunContext) -> HandlerFuture<'_> {
    Box::pin(async move { contain(deploy_stage(ctx).await) })
}

pub(crate) fn post_deploy(ctx: &mut RunContext) -> HandlerFuture<'_> {
    Box::pin(async move { contain(hook_stage(ctx, Hook::PostDeploy, State::Verify).await) })
}

pub(crate) fn verify(ctx: &mut RunContext) -> HandlerFuture<'_> {
    Box::pin(async move { contain(hook_stage(ctx, Hook::Verify, State::Finalize).await) })
}

pub(crate) fn error(ctx: &mut RunContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        let applied = ctx.run_compensations();
        tracing::info!(steps = applied.len(), "rollback complete");
        Ok(Outcome::Next(State::Finalize))
    })
}

pub(crate) fn finalize(ctx: &mut RunContext) -> HandlerFuture<'_> {
    Box::pin(async move {
        finalize_stage(ctx);
        Ok(Outcome::Next(State::End))
    })
}

async fn init_stage(ctx: &mut RunContext) -> Result<State, StageError> {
    ctx.lock = Some(DeployLock::acquire(ctx.layout())?);

    if let Some(jitter) = ctx.config().deploy.jitter
        && jitter.is_enabled()
    {
        let delay = jitter_delay(&jitter, ctx.rng());
        tracing::info!(delay_ms = millis(delay), "applying jitter");
        tokio::time::sleep(delay).await;
    }

    ctx.provider().initialize().await?;
    Ok(State::DetectChanges)
}

/// Uniformly random delay within the jitter window, at millisecond resolution.
pub fn jitter_delay<R: Rng>(jitter: &JitterConfig, rng: &mut R) -> Duration {
    let min = millis(jitter.min_duration());
    let max = millis(jitter.max_duration());
    Duration::from_millis(rng.random_range(min..=max))
}

/// Milliseconds in `duration`, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

async fn detect_changes_stage(ctx: &mut RunContext) -> Result<State, StageError> {
    let live = match release::current_revision(ctx.layout()) {
        Ok(revision) => revision,
        Err(e) if e.is_no_current_release() => {
            tracing::info!("no current release, deploying");
            return Ok(State::Clone);
        }
        Err(e) => return Err(e.into()),
    };

    let latest = ctx.provider().revision().await?;

    if live != latest {
        tracing::info!(%live, %latest, "changes detected");
        return Ok(State::Clone);
    }

    if ctx.force() {
        tracing::info!(revision = %latest, "forcing deployment");
        return Ok(State::Clone);
    }

    tracing::info!(revision = %latest, "no changes detected, skipping deployment");
    ctx.revision = Some(latest);
    Ok(State::Finalize)
}

async fn clone_stage(ctx: &mut RunContext) -> Result<State, StageError> {
    let revision = ctx.provider().revision().await?;
    let release_dir = release::create(ctx.layout(), &revision)?;
    ctx.register(Compensation::DiscardRelease(release_dir.clone()));
    ctx.release_dir = Some(release_dir.clone());
    ctx.revision = Some(revision);

    ctx.provider().materialize(&release_dir).await?;
    run_hook(&release_dir, Hook::Clone).await?;
    link_shared(ctx.layout(), &ctx.config().deploy.shared, &release_dir)?;

    Ok(State::Build)
}

/// Replace each configured shared path inside a release with a symlink into
/// `shared/`. Whatever the source tree had at that path is removed first.
fn link_shared(
    layout: &AppLayout,
    shared: &SharedConfig,
    release_dir: &Path,
) -> Result<(), StageError> {
    let shared_dir = layout.shared_dir();

    for entry in shared.entries() {
        let source = shared_dir.join(entry);
        let dest = release_dir.join(entry);
        let link_error = |source| StageError::SharedLink {
            path: dest.clone(),
            source,
        };

        remove_existing(&dest).map_err(link_error)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(link_error)?;
        }
        symlink(&source, &dest).map_err(link_error)?;

        tracing::debug!(path = %entry.display(), "linked shared path");
    }

    Ok(())
}

fn remove_existing(path: &Path) -> std::io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn staged(ctx: &RunContext) -> Result<PathBuf, StageError> {
    ctx.release_dir()
        .map(Path::to_path_buf)
        .ok_or(StageError::NothingStaged)
}

async fn hook_stage(ctx: &mut RunContext, hook: Hook, next: State) -> Result<State, StageError> {
    let release_dir = staged(ctx)?;
    run_hook(&release_dir, hook).await?;
    Ok(next)
}

async fn deploy_stage(ctx: &mut RunContext) -> Result<State, StageError> {
    let release_dir = staged(ctx)?;
    run_hook(&release_dir, Hook::Deploy).await?;

    let current = release::current_target(ctx.layout())?;
    let previous = release::previous_target(ctx.layout())?;

    // Registered before promoting so a half-finished swap is also undone.
    ctx.register(Compensation::RestorePointers { current, previous });
    release::promote(ctx.layout(), &release_dir)?;
    ctx.promoted = true;

    Ok(State::PostDeploy)
}

fn finalize_stage(ctx: &mut RunContext) {
    let Some(lock) = ctx.lock.take() else {
        tracing::info!("lock not held by this run, skipping cleanup");
        return;
    };

    let keep = ctx.config().deploy.keep_releases;
    match release::prune(ctx.layout(), keep) {
        Ok(removed) if !removed.is_empty() => {
            tracing::info!(removed = removed.len(), keep, "pruned old releases");
        }
        Ok(_) => {}
        Err(e) => ctx.warn(Warning::prune(format!("failed to prune old releases: {e}"))),
    }

    if let Err(e) = lock.release() {
        ctx.warn(Warning::lock_release(format!(
            "failed to release deploy lock: {e}"
        )));
    }
}
