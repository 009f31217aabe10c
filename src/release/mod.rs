// ABOUTME: Release lifecycle: staging directories, promotion, rollback and pruning.
// ABOUTME: Releases live under releases/<timestamp>/ with a REVISION marker inside.

mod error;
mod pointer;

pub use error::ReleaseError;
pub use pointer::{current_target, previous_target, promote, read_target, restore, rollback};

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use snafu::{OptionExt, ResultExt};

use crate::layout::{AppLayout, REVISION_FILENAME};
use crate::types::Revision;

use error::{
    CreateReleaseSnafu, InvalidRevisionSnafu, ListReleasesSnafu, NoCurrentReleaseSnafu,
    ReadRevisionSnafu, RemoveReleaseSnafu, WriteRevisionSnafu,
};

/// Release directory names: sortable, second resolution.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A release directory as seen by `status`.
#[derive(Debug, Clone)]
pub struct ReleaseInfo {
    pub path: PathBuf,
    pub revision: Option<Revision>,
    pub modified: DateTime<Local>,
    pub is_current: bool,
    pub is_previous: bool,
}

impl ReleaseInfo {
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Allocate a new release directory and write its revision marker.
///
/// Two releases created within the same second get `_1`, `_2`, ... suffixes
/// instead of sharing a directory.
pub fn create(layout: &AppLayout, revision: &Revision) -> Result<PathBuf, ReleaseError> {
    let releases_dir = layout.releases_dir();
    fs::create_dir_all(&releases_dir).context(CreateReleaseSnafu {
        path: &releases_dir,
    })?;

    let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let path = allocate(&releases_dir, &stamp)?;

    write_marker(&path, revision)?;

    tracing::debug!(release = %path.display(), %revision, "created release directory");
    Ok(path)
}

/// Write the revision marker, removing the release again if that fails.
fn write_marker(release: &Path, revision: &Revision) -> Result<(), ReleaseError> {
    let marker = release.join(REVISION_FILENAME);
    let result =
        fs::write(&marker, revision.as_str()).context(WriteRevisionSnafu { path: &marker });

    if result.is_err()
        && let Err(e) = fs::remove_dir_all(release)
    {
        tracing::warn!(
            release = %release.display(),
            error = %e,
            "failed to remove unfinished release"
        );
    }
    result
}

fn allocate(releases_dir: &Path, stamp: &str) -> Result<PathBuf, ReleaseError> {
    let mut attempt = 0u32;
    loop {
        let name = match attempt {
            0 => stamp.to_string(),
            n => format!("{stamp}_{n}"),
        };
        let path = releases_dir.join(name);

        match fs::create_dir(&path) {
            Ok(()) => return Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(ReleaseError::CreateRelease { path, source }),
        }
    }
}

/// Read the revision marker of a release directory.
pub fn read_revision(release: &Path) -> Result<Revision, ReleaseError> {
    let marker = release.join(REVISION_FILENAME);
    let raw = fs::read_to_string(&marker).context(ReadRevisionSnafu { path: &marker })?;
    Revision::new(&raw).context(InvalidRevisionSnafu { path: &marker })
}

/// Revision of the live release.
///
/// Fails with [`ReleaseError::NoCurrentRelease`] when nothing has been
/// promoted yet, which callers treat as "always deploy".
pub fn current_revision(layout: &AppLayout) -> Result<Revision, ReleaseError> {
    let target = current_target(layout)?.context(NoCurrentReleaseSnafu)?;
    read_revision(&target)
}

/// Recursively delete a release that never made it to `current`.
pub fn discard(release: &Path) -> Result<(), ReleaseError> {
    fs::remove_dir_all(release).context(RemoveReleaseSnafu { path: release })?;
    tracing::info!(release = %release.display(), "discarded release");
    Ok(())
}

/// Delete all but the `keep` most recently modified releases.
///
/// The release `current` points at is never deleted, even if it is older
/// than the cut-off. Returns the removed directories, oldest first.
pub fn prune(layout: &AppLayout, keep: usize) -> Result<Vec<PathBuf>, ReleaseError> {
    let mut releases = release_dirs(layout)?;
    if releases.len() <= keep {
        return Ok(Vec::new());
    }

    releases.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    let live = current_target(layout)?;
    let excess = releases.len() - keep;
    let mut removed = Vec::with_capacity(excess);

    for (path, _) in releases.into_iter().take(excess) {
        if live.as_deref().is_some_and(|live| same_dir(live, &path)) {
            tracing::warn!(release = %path.display(), "keeping old release because it is current");
            continue;
        }
        fs::remove_dir_all(&path).context(RemoveReleaseSnafu { path: &path })?;
        tracing::info!(release = %path.display(), "pruned release");
        removed.push(path);
    }

    Ok(removed)
}

/// All releases, oldest first.
pub fn list(layout: &AppLayout) -> Result<Vec<ReleaseInfo>, ReleaseError> {
    let mut releases = release_dirs(layout)?;
    releases.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    let current = current_target(layout)?;
    let previous = previous_target(layout)?;
    let points_at = |pointer: &Option<PathBuf>, path: &Path| {
        pointer.as_deref().is_some_and(|target| same_dir(target, path))
    };

    Ok(releases
        .into_iter()
        .map(|(path, modified)| ReleaseInfo {
            revision: read_revision(&path).ok(),
            modified: DateTime::<Local>::from(modified),
            is_current: points_at(&current, &path),
            is_previous: points_at(&previous, &path),
            path,
        })
        .collect())
}

fn release_dirs(layout: &AppLayout) -> Result<Vec<(PathBuf, SystemTime)>, ReleaseError> {
    let releases_dir = layout.releases_dir();
    let entries = match fs::read_dir(&releases_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ReleaseError::ListReleases {
                path: releases_dir,
                source,
            });
        }
    };

    let mut releases = Vec::new();
    for entry in entries {
        let entry = entry.context(ListReleasesSnafu {
            path: &releases_dir,
        })?;
        let metadata = entry.metadata().context(ListReleasesSnafu {
            path: entry.path(),
        })?;
        if !metadata.is_dir() {
            continue;
        }
        let modified = metadata.modified().context(ListReleasesSnafu {
            path: entry.path(),
        })?;
        releases.push((entry.path(), modified));
    }

    Ok(releases)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
