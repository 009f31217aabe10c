// ABOUTME: Application name used as the app directory name when scaffolding.
// ABOUTME: Strips everything except letters, digits, underscore, hyphen and dot.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppNameError {
    #[error("app name cannot be empty")]
    Empty,

    #[error("app name cannot be '{0}'")]
    Reserved(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppName(String);

impl AppName {
    /// Normalize free-form input into a directory-safe name.
    ///
    /// Disallowed characters are dropped rather than rejected, so
    /// `"my app!"` becomes `"myapp"`. Only an empty result, or one that
    /// would escape the parent directory, is an error.
    pub fn normalize(input: &str) -> Result<Self, AppNameError> {
        let name: String = input
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
            .collect();

        if name.is_empty() {
            return Err(AppNameError::Empty);
        }

        if name == "." || name == ".." {
            return Err(AppNameError::Reserved(name));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
