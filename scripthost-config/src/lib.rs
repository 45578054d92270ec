//! Configuration system for the scripthost scripting host.
//!
//! This crate provides configuration loading, saving, validation and default
//! values. It includes:
//!
//! - Scripts folder and log level settings
//! - Console and runner behavior
//! - External interpreter provider definitions

pub mod config;
pub mod defaults;
pub mod error;
pub mod providers;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use providers::ExternalProviderConfig;
pub use types::{ConsoleConfig, LogLevel, RunnerConfig};
