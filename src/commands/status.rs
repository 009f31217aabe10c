// ABOUTME: Status command implementation.
// ABOUTME: Prints the live and previous releases, the lock state and all staged releases.

use super::AppTarget;
use relay::deploy::{DeployLock, LockInfo};
use relay::error::Result;
use relay::output::{Output, OutputMode};
use relay::release::{self, ReleaseInfo};
use relay::types::Revision;
use serde::Serialize;

#[derive(Serialize)]
struct StatusReport {
    app_dir: String,
    current: Option<ReleaseSummary>,
    previous: Option<ReleaseSummary>,
    locked: bool,
    lock_holder: Option<LockInfo>,
    releases: Vec<ReleaseSummary>,
}

#[derive(Clone, Serialize)]
struct ReleaseSummary {
    name: String,
    revision: Option<Revision>,
    created: String,
}

impl From<&ReleaseInfo> for ReleaseSummary {
    fn from(info: &ReleaseInfo) -> Self {
        Self {
            name: info.name(),
            revision: info.revision.clone(),
            created: info.modified.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

pub fn status(target: AppTarget, output: Output) -> Result<()> {
    // Validates app.yml even though nothing below needs it.
    target.load_config()?;

    let releases = release::list(&target.layout)?;
    let report = StatusReport {
        app_dir: target.layout.root().display().to_string(),
        current: releases.iter().find(|r| r.is_current).map(Into::into),
        previous: releases.iter().find(|r| r.is_previous).map(Into::into),
        locked: DeployLock::is_held(&target.layout),
        lock_holder: LockInfo::read(&target.layout),
        releases: releases.iter().map(Into::into).collect(),
    };

    if output.mode() == OutputMode::Json {
        output.data("status", "status", &report);
        return Ok(());
    }

    println!("App: {}", report.app_dir);
    println!("Current: {}", describe(report.current.as_ref()));
    println!("Previous: {}", describe(report.previous.as_ref()));
    match (&report.lock_holder, report.locked) {
        (Some(info), _) => println!(
            "Lock: held by {} (pid {}) since {}",
            info.holder, info.pid, info.started_at
        ),
        (None, true) => println!("Lock: held"),
        (None, false) => println!("Lock: free"),
    }

    if output.mode() == OutputMode::Normal {
        println!("Releases ({}):", report.releases.len());
        for summary in &report.releases {
            println!(
                "  {}  {}  {}",
                summary.name,
                summary.created,
                summary
                    .revision
                    .as_ref()
                    .map(Revision::as_str)
                    .unwrap_or("-")
            );
        }
    }
    Ok(())
}

fn describe(summary: Option<&ReleaseSummary>) -> String {
    match summary {
        Some(s) => match &s.revision {
            Some(revision) => format!("{} ({revision})", s.name),
            None => s.name.clone(),
        },
        None => "none".to_string(),
    }
}
