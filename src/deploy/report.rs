// ABOUTME: Summary of a finished deployment run.
// ABOUTME: Serializable so the CLI can print it as JSON.

use std::mem;
use std::path::PathBuf;

use serde::Serialize;

use crate::diagnostics::Warning;
use crate::types::Revision;

use super::context::RunContext;
use super::state::State;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// A new release is live.
    Deployed { release: PathBuf, revision: Revision },
    /// Nothing to do; the live release already matches the source.
    Unchanged { revision: Option<Revision> },
    /// A stage failed and the run was rolled back.
    Failed { stage: State, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Every state visited, in order, starting at `Init` and ending at `End`.
    pub states: Vec<State>,
    pub warnings: Vec<Warning>,
}

impl RunReport {
    pub(crate) fn from_context(ctx: &mut RunContext) -> Self {
        let outcome = match (&ctx.failure, &ctx.release_dir, &ctx.revision) {
            (Some(failure), _, _) => RunOutcome::Failed {
                stage: failure.stage,
                reason: failure.reason.clone(),
            },
            (None, Some(release), Some(revision)) if ctx.promoted => RunOutcome::Deployed {
                release: release.clone(),
                revision: revision.clone(),
            },
            (None, _, revision) => RunOutcome::Unchanged {
                revision: revision.clone(),
            },
        };

        Self {
            outcome,
            states: mem::take(&mut ctx.trail),
            warnings: mem::take(&mut ctx.diagnostics).into_warnings(),
        }
    }

    /// Whether the run passed through the given state.
    pub fn visited(&self, state: State) -> bool {
        self.states.contains(&state)
    }
}
