// ABOUTME: Unlock command implementation.
// ABOUTME: Clears a deploy lock marker that a crashed or aborted run left behind.

use super::AppTarget;
use relay::deploy::{DeployLock, LockInfo};
use relay::error::Result;
use relay::output::Output;

pub fn unlock(target: AppTarget, output: Output) -> Result<()> {
    if let Some(info) = LockInfo::read(&target.layout) {
        output.progress(&format!(
            "  → Lock held by {} (pid {}) since {}",
            info.holder, info.pid, info.started_at
        ));
    }

    if DeployLock::break_stale(&target.layout)? {
        output.success("Deploy lock removed");
    } else {
        output.success("No deploy lock present");
    }
    Ok(())
}
