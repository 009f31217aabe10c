// ABOUTME: App directory scaffolding for new deployments.
// ABOUTME: Creates releases/, shared/, logs/ and a commented app.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::layout::AppLayout;
use crate::types::AppName;

use super::Config;
use super::source::default_branch;

/// Create `<parent>/<name>` with the directory skeleton and a default config.
///
/// Returns the created app directory. An existing config is left alone unless
/// `force` is set; the directories themselves are created idempotently.
pub fn init_app(
    parent: &Path,
    name: &str,
    repo: Option<&str>,
    branch: Option<&str>,
    force: bool,
) -> Result<PathBuf> {
    let name = AppName::normalize(name)?;
    let layout = AppLayout::new(parent.join(name.as_str()));
    let config_path = layout.config_path();

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    for dir in layout.skeleton() {
        std::fs::create_dir_all(&dir)?;
    }

    let branch = branch.map(str::to_string).unwrap_or_else(default_branch);
    let config = Config::template(repo.unwrap_or_default(), &branch);
    std::fs::write(&config_path, generate_template_yaml(&config)?)?;

    tracing::info!(app = %name, dir = %layout.root().display(), "initialized app directory");

    Ok(layout.root().to_path_buf())
}

fn generate_template_yaml(config: &Config) -> Result<String> {
    let body = serde_yaml::to_string(config)?;
    Ok(format!(
        r#"# Deployment configuration, see `relay run --help`.
{body}
# Random delay (seconds) before each run, to spread out hosts polling the
# same repository:
# deploy:
#   jitter:
#     min: 5
#     max: 10
"#
    ))
}
