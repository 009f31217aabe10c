// ABOUTME: Command module aggregator for the relay CLI.
// ABOUTME: Re-exports init, run, rollback, status and unlock command handlers.

mod init;
mod rollback;
mod run;
mod status;
mod target;
mod unlock;

pub use init::init;
pub use rollback::rollback;
pub use run::run;
pub use status::status;
pub use target::AppTarget;
pub use unlock::unlock;
