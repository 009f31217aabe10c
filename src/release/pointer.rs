// ABOUTME: The current/previous symlink protocol.
// ABOUTME: Pointers are only ever replaced by renaming a fully written temp link over them.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use snafu::{OptionExt, ResultExt};

use crate::layout::AppLayout;

use super::error::{
    CreatePointerSnafu, MissingReleaseSnafu, NoPreviousReleaseSnafu, ReadPointerSnafu,
    ReleaseError,
};

/// Read a pointer's target. A missing pointer is `Ok(None)`.
pub fn read_target(link: &Path) -> Result<Option<PathBuf>, ReleaseError> {
    match fs::read_link(link) {
        Ok(target) => Ok(Some(target)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(source).context(ReadPointerSnafu { path: link }),
    }
}

pub fn current_target(layout: &AppLayout) -> Result<Option<PathBuf>, ReleaseError> {
    read_target(&layout.current_link())
}

pub fn previous_target(layout: &AppLayout) -> Result<Option<PathBuf>, ReleaseError> {
    read_target(&layout.previous_link())
}

/// Atomically point `current` at `release`.
///
/// The old `current` target, if any, becomes `previous` first. That step is
/// best-effort: a failure is logged and promotion continues.
pub fn promote(layout: &AppLayout, release: &Path) -> Result<(), ReleaseError> {
    if let Some(live) = current_target(layout)?
        && let Err(e) = swap(&layout.previous_link(), &live)
    {
        tracing::warn!(error = %e, "failed to update previous pointer");
    }

    swap(&layout.current_link(), release)?;
    tracing::info!(release = %release.display(), "promoted release to current");
    Ok(())
}

/// Promote whatever `previous` points at.
///
/// Because promotion moves the old `current` into `previous`, two rollbacks
/// in a row swap back and forth between the last two releases.
pub fn rollback(layout: &AppLayout) -> Result<PathBuf, ReleaseError> {
    let target = previous_target(layout)?.context(NoPreviousReleaseSnafu)?;

    if !target.is_dir() {
        return MissingReleaseSnafu { path: target }.fail();
    }

    promote(layout, &target)?;
    Ok(target)
}

/// Put both pointers back to previously captured values.
///
/// `None` means the pointer did not exist and is removed. Both pointers are
/// attempted even if the first fails; the first error is returned.
pub fn restore(
    layout: &AppLayout,
    current: Option<&Path>,
    previous: Option<&Path>,
) -> Result<(), ReleaseError> {
    let current = reset(&layout.current_link(), current);
    let previous = reset(&layout.previous_link(), previous);
    current.and(previous)
}

fn reset(link: &Path, target: Option<&Path>) -> Result<(), ReleaseError> {
    match target {
        Some(target) => swap(link, target),
        None => remove(link),
    }
}

fn swap(link: &Path, target: &Path) -> Result<(), ReleaseError> {
    let tmp = temp_link(link);

    // Leftover from an interrupted run; symlink() refuses to overwrite it.
    let _ = fs::remove_file(&tmp);

    symlink(target, &tmp).context(CreatePointerSnafu { path: &tmp })?;

    if let Err(source) = fs::rename(&tmp, link) {
        let _ = fs::remove_file(&tmp);
        return Err(ReleaseError::SwapPointer {
            path: link.to_path_buf(),
            source,
        });
    }

    Ok(())
}

fn remove(link: &Path) -> Result<(), ReleaseError> {
    match fs::remove_file(link) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ReleaseError::RemovePointer {
            path: link.to_path_buf(),
            source,
        }),
    }
}

fn temp_link(link: &Path) -> PathBuf {
    let mut name = link.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
