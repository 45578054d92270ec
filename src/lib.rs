// Library exports for testing and potential library use
//
// The binary is a thin shell over `host::ScriptHost`; everything it does is
// reachable from here so integration tests can drive it directly.

/// Application version (root crate version, for use by sub-crates).
/// Sub-crates should receive this via parameter rather than using
/// `env!("CARGO_PKG_VERSION")` which resolves to the sub-crate's version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod cli;
pub mod config;
pub mod host;
pub mod scripting;
pub mod sink;
