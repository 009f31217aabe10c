// ABOUTME: Library root for relay - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod hooks;
pub mod layout;
pub mod logging;
pub mod output;
pub mod provider;
pub mod release;
pub mod types;
