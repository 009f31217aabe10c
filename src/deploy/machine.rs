// ABOUTME: The deployment engine: looks up the handler for each state and validates every step.
// ABOUTME: Contained stage failures are routed to Error; engine defects abort the run.

use std::collections::HashMap;

use futures::future::BoxFuture;
use tracing::Instrument;

use super::context::RunContext;
use super::error::{DeployError, StageError};
use super::handlers;
use super::report::RunReport;
use super::state::State;

/// What a handler asks the engine to do next.
#[derive(Debug)]
pub enum Outcome {
    /// Move to the given state.
    Next(State),
    /// The stage failed; log it and move to [`State::Error`].
    Contained(StageError),
}

/// A handler for one state.
///
/// Returning `Err` is reserved for defects and aborts the run on the spot.
pub type StateHandler =
    for<'a> fn(&'a mut RunContext) -> BoxFuture<'a, Result<Outcome, DeployError>>;

/// Drives a [`RunContext`] from `Init` to `End`.
pub struct Deployer {
    handlers: HashMap<State, StateHandler>,
}

impl Default for Deployer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deployer {
    /// A deployer with the standard handler for every non-terminal state.
    pub fn new() -> Self {
        let defaults: [(State, StateHandler); 9] = [
            (State::Init, handlers::init),
            (State::DetectChanges, handlers::detect_changes),
            (State::Clone, handlers::clone),
            (State::Build, handlers::build),
            (State::Deploy, handlers::deploy),
            (State::PostDeploy, handlers::post_deploy),
            (State::Verify, handlers::verify),
            (State::Error, handlers::error),
            (State::Finalize, handlers::finalize),
        ];

        Self {
            handlers: defaults.into_iter().collect(),
        }
    }

    /// Replace the handler for a state.
    pub fn with_handler(mut self, state: State, handler: StateHandler) -> Self {
        self.handlers.insert(state, handler);
        self
    }

    /// Unregister the handler for a state.
    pub fn without_handler(mut self, state: State) -> Self {
        self.handlers.remove(&state);
        self
    }

    /// Run the state machine to completion.
    ///
    /// Returns `Ok` for every run that reached `End`, including failed
    /// deployments; inspect [`RunReport::outcome`]. `Err` means the engine
    /// stopped early and `Finalize` did not run.
    pub async fn execute(&self, ctx: &mut RunContext) -> Result<RunReport, DeployError> {
        let mut state = State::Init;
        ctx.trail.push(state);

        while !state.is_terminal() {
            let Some(handler) = self.handlers.get(&state).copied() else {
                tracing::error!(%state, "no handler registered");
                return Err(DeployError::NoHandler(state));
            };

            let span = tracing::info_span!("state", %state);
            let next = match handler(ctx).instrument(span).await {
                Ok(Outcome::Next(next)) => next,
                Ok(Outcome::Contained(e)) => {
                    tracing::error!(%state, error = %e, "stage failed");
                    ctx.record_failure(state, e.to_string());
                    State::Error
                }
                Err(e) => {
                    tracing::error!(%state, error = %e, "deployment aborted");
                    return Err(e);
                }
            };

            if !state.can_transition_to(next) {
                tracing::error!(from = %state, to = %next, "invalid state transition");
                return Err(DeployError::InvalidTransition {
                    from: state,
                    to: next,
                });
            }

            tracing::debug!(from = %state, to = %next, "transition");
            state = next;
            ctx.trail.push(state);
        }

        Ok(RunReport::from_context(ctx))
    }
}
