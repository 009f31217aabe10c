// ABOUTME: Init command implementation.
// ABOUTME: Scaffolds a new app directory under the current working directory.

use relay::config::init_app;
use relay::error::Result;
use relay::output::Output;
use std::path::Path;

pub fn init(
    cwd: &Path,
    name: &str,
    repo: Option<&str>,
    branch: Option<&str>,
    force: bool,
    output: Output,
) -> Result<()> {
    let app_dir = init_app(cwd, name, repo, branch, force)?;

    output.progress(&format!(
        "  → Created releases/, shared/ and logs/ in {}",
        app_dir.display()
    ));
    output.success(&format!(
        "Initialized {}; edit {} before the first run",
        app_dir.display(),
        app_dir.join("app.yml").display()
    ));
    Ok(())
}
