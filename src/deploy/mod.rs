// ABOUTME: Deployment orchestration as an explicit state machine.
// ABOUTME: Exports the engine, its run context, states, errors and the deploy lock.

mod context;
mod error;
mod handlers;
mod lock;
mod machine;
mod report;
mod state;

pub use context::{Compensation, Failure, RunContext};
pub use error::{DeployError, StageError};
pub use handlers::jitter_delay;
pub use lock::{DeployLock, LockError, LockInfo};
pub use machine::{Deployer, Outcome, StateHandler};
pub use report::{RunOutcome, RunReport};
pub use state::State;
