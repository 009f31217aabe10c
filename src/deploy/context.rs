// ABOUTME: Per-run state threaded through every state handler.
// ABOUTME: Also owns the ordered list of rollback compensations for the run.

use std::fmt;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::layout::AppLayout;
use crate::provider::SourceProvider;
use crate::release::{self, ReleaseError};
use crate::types::Revision;

use super::lock::DeployLock;
use super::state::State;

/// An undo step registered by a handler after it changed the app directory.
///
/// Carries only the data needed to revert that one change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Delete a staged release that never went live.
    DiscardRelease(PathBuf),
    /// Put `current` and `previous` back where they pointed before promotion.
    RestorePointers {
        current: Option<PathBuf>,
        previous: Option<PathBuf>,
    },
}

impl Compensation {
    fn apply(&self, layout: &AppLayout) -> Result<(), ReleaseError> {
        match self {
            Compensation::DiscardRelease(path) => release::discard(path),
            Compensation::RestorePointers { current, previous } => {
                release::restore(layout, current.as_deref(), previous.as_deref())
            }
        }
    }
}

impl fmt::Display for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compensation::DiscardRelease(path) => {
                write!(f, "discard release {}", path.display())
            }
            Compensation::RestorePointers { .. } => f.write_str("restore release pointers"),
        }
    }
}

/// The first contained failure of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub stage: State,
    pub reason: String,
}

/// Everything one deployment run knows about itself.
///
/// Created by the caller, driven by [`super::Deployer::execute`], never
/// reused across runs.
pub struct RunContext {
    config: Config,
    provider: Arc<dyn SourceProvider>,
    layout: AppLayout,
    force: bool,
    rng: Box<dyn RngCore + Send + Sync>,

    pub(crate) lock: Option<DeployLock>,
    pub(crate) release_dir: Option<PathBuf>,
    pub(crate) revision: Option<Revision>,
    pub(crate) promoted: bool,
    pub(crate) failure: Option<Failure>,
    pub(crate) trail: Vec<State>,
    compensations: Vec<Compensation>,
    pub(crate) diagnostics: Diagnostics,
}

impl RunContext {
    pub fn new(
        config: Config,
        provider: Arc<dyn SourceProvider>,
        layout: AppLayout,
        force: bool,
    ) -> Self {
        Self {
            config,
            provider,
            layout,
            force,
            rng: Box::new(StdRng::from_os_rng()),
            lock: None,
            release_dir: None,
            revision: None,
            promoted: false,
            failure: None,
            trail: Vec::new(),
            compensations: Vec::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Replace the randomness source used for jitter.
    pub fn with_rng(mut self, rng: impl RngCore + Send + Sync + 'static) -> Self {
        self.rng = Box::new(rng);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &dyn SourceProvider {
        self.provider.as_ref()
    }

    pub fn layout(&self) -> &AppLayout {
        &self.layout
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub(crate) fn rng(&mut self) -> &mut Box<dyn RngCore + Send + Sync> {
        &mut self.rng
    }

    /// The release being staged by this run, once Clone created it.
    pub fn release_dir(&self) -> Option<&Path> {
        self.release_dir.as_deref()
    }

    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn warn(&mut self, warning: Warning) {
        self.diagnostics.warn(warning);
    }

    /// Register an undo step. Later registrations are undone first.
    pub fn register(&mut self, compensation: Compensation) {
        tracing::debug!(%compensation, "registered compensation");
        self.compensations.push(compensation);
    }

    pub fn compensations(&self) -> &[Compensation] {
        &self.compensations
    }

    /// Apply every registered compensation, newest first, then forget them.
    ///
    /// A failing step is logged and recorded as a warning; the remaining
    /// steps still run. Returns the steps in the order they were applied.
    pub fn run_compensations(&mut self) -> Vec<Compensation> {
        let pending = mem::take(&mut self.compensations);
        let mut applied = Vec::with_capacity(pending.len());

        for compensation in pending.into_iter().rev() {
            tracing::info!(%compensation, "rolling back");
            if let Err(e) = compensation.apply(&self.layout) {
                self.diagnostics
                    .warn(Warning::compensation(format!("{compensation} failed: {e}")));
            }
            applied.push(compensation);
        }

        applied
    }

    pub(crate) fn record_failure(&mut self, stage: State, reason: String) {
        if self.failure.is_none() {
            self.failure = Some(Failure { stage, reason });
        }
    }
}
