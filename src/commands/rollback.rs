// ABOUTME: Rollback command implementation.
// ABOUTME: Re-promotes the previous release while holding the deploy lock.

use super::AppTarget;
use relay::deploy::DeployLock;
use relay::diagnostics::{Diagnostics, Warning};
use relay::error::Result;
use relay::output::Output;
use relay::release;

/// Make the release `previous` points at live again.
pub fn rollback(target: AppTarget, mut output: Output) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();

    output.progress("  → Acquiring deploy lock...");
    let lock = DeployLock::acquire(&target.layout)?;

    output.progress("  → Swapping current and previous...");
    let result = release::rollback(&target.layout);

    if let Err(e) = lock.release() {
        diag.warn(Warning::lock_release(format!(
            "failed to release deploy lock: {e}"
        )));
    }

    // Emit collected warnings
    for warning in diag.warnings() {
        output.warning(warning);
    }

    let live = result?;
    let revision = release::read_revision(&live)
        .map(|r| r.to_string())
        .unwrap_or_else(|_| "unknown revision".to_string());

    output.success(&format!(
        "Rolled back to {} ({revision})",
        live.file_name().unwrap_or_default().to_string_lossy()
    ));
    Ok(())
}
