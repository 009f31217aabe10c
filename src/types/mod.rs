// ABOUTME: Validated domain types shared across the crate.
// ABOUTME: App names and revision identifiers normalize their input once, at construction.

mod app_name;
mod revision;

pub use app_name::{AppName, AppNameError};
pub use revision::{Revision, RevisionError};
