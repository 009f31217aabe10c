// ABOUTME: Source revision identifier as reported by a provider.
// ABOUTME: Surrounding whitespace is trimmed on every construction path.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RevisionError {
    #[error("revision identifier cannot be empty")]
    Empty,
}

/// A provider-supplied revision identifier (for git, a commit hash).
///
/// The same value is written to a release's `REVISION` marker and later
/// compared against the provider's tip, so both sides go through
/// [`Revision::new`] and compare equal regardless of trailing newlines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(value: &str) -> Result<Self, RevisionError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(RevisionError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
