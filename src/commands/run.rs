// ABOUTME: Run command implementation.
// ABOUTME: Builds a run context from app.yml and drives the deployment state machine once.

use super::AppTarget;
use relay::deploy::{Deployer, RunContext, RunOutcome};
use relay::error::{Error, Result};
use relay::output::Output;
use relay::provider::{self, SourceProvider};
use std::sync::Arc;

/// Deploy the configured source into the app directory if it changed.
pub async fn run(target: AppTarget, force: bool, mut output: Output) -> Result<()> {
    let config = target.load_config()?;
    let provider: Arc<dyn SourceProvider> =
        Arc::from(provider::from_config(&config.source, &target.layout)?);

    output.start_timer();
    output.progress(&format!(
        "Deploying {} from {}",
        target.layout.root().display(),
        config.source.provider
    ));

    let mut ctx = RunContext::new(config, provider, target.layout, force);
    let report = Deployer::new().execute(&mut ctx).await?;

    for warning in &report.warnings {
        output.warning(warning);
    }
    output.data("report", "run finished", &report);

    match report.outcome {
        RunOutcome::Deployed { release, revision } => {
            output.success(&format!(
                "Deployed {revision} as {}",
                release.file_name().unwrap_or_default().to_string_lossy()
            ));
            Ok(())
        }
        RunOutcome::Unchanged { revision } => {
            let message = match revision {
                Some(revision) => format!("Already at {revision}, nothing to deploy"),
                None => "Nothing to deploy".to_string(),
            };
            output.success(&message);
            Ok(())
        }
        RunOutcome::Failed { stage, reason } => Err(Error::DeploymentFailed { stage, reason }),
    }
}
