//! The gateway console: page locations and the steps that get a session ready.

#[cfg(test)]
pub mod fake;
pub mod locators;
pub mod session;

pub use session::{open_console, BootstrapReport, Credentials, DiscoveryOutcome};
