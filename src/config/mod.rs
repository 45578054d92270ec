//! Host configuration management.
//!
//! Re-exports all configuration types from the `scripthost-config` crate.

pub use scripthost_config::*;
