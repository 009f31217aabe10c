// ABOUTME: Deployment states and the static table of legal transitions.
// ABOUTME: The engine checks every step against State::successors before taking it.

use std::fmt;

use serde::Serialize;

/// One step of a deployment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Take the lock, apply jitter, initialize the provider.
    Init,
    /// Compare the live revision with the provider's.
    DetectChanges,
    /// Stage a new release directory.
    Clone,
    Build,
    /// Promote the staged release to `current`.
    Deploy,
    PostDeploy,
    Verify,
    /// Undo partial work through registered compensations.
    Error,
    /// Prune old releases and release the lock.
    Finalize,
    End,
}

impl State {
    pub const ALL: [State; 10] = [
        State::Init,
        State::DetectChanges,
        State::Clone,
        State::Build,
        State::Deploy,
        State::PostDeploy,
        State::Verify,
        State::Error,
        State::Finalize,
        State::End,
    ];

    /// States this one may legally move to.
    pub fn successors(self) -> &'static [State] {
        use State::*;
        match self {
            Init => &[DetectChanges, Error],
            DetectChanges => &[Clone, Finalize, Error],
            Clone => &[Build, Error],
            Build => &[Deploy, Error],
            Deploy => &[PostDeploy, Error],
            PostDeploy => &[Verify, Error],
            Verify => &[Finalize, Error],
            Error => &[Finalize],
            Finalize => &[End],
            End => &[],
        }
    }

    pub fn can_transition_to(self, next: State) -> bool {
        self.successors().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self == State::End
    }

    pub fn as_str(self) -> &'static str {
        match self {
            State::Init => "init",
            State::DetectChanges => "detect_changes",
            State::Clone => "clone",
            State::Build => "build",
            State::Deploy => "deploy",
            State::PostDeploy => "post_deploy",
            State::Verify => "verify",
            State::Error => "error",
            State::Finalize => "finalize",
            State::End => "end",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
