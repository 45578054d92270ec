//! Settings groups of the config file.

use serde::{Deserialize, Serialize};

/// Log level for debug logging to file.
///
/// `DEBUG_LEVEL` and the `--log-level` CLI flag take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging (log file not created)
    #[default]
    Off,
    Error,
    Warn,
    Info,
    Debug,
    /// Most verbose
    Trace,
}

impl LogLevel {
    /// All available levels, least verbose first
    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Off,
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ]
    }

    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Display-sink behavior for each run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Show the console when a script starts
    #[serde(default = "crate::defaults::bool_true")]
    pub show_on_run: bool,

    /// Clear the console when a script starts
    #[serde(default)]
    pub clear_on_run: bool,

    /// Colorize console output (ANSI)
    #[serde(default = "crate::defaults::bool_true")]
    pub color: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            show_on_run: true,
            clear_on_run: false,
            color: true,
        }
    }
}

/// Script runner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Allow only one run at a time per runner
    #[serde(default = "crate::defaults::bool_true")]
    pub serialize_runs: bool,

    /// Operation limit for embedded engines (0 = unlimited)
    #[serde(default)]
    pub max_operations: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            serialize_runs: true,
            max_operations: 0,
        }
    }
}
