//! Command-line interface for scripthost.
//!
//! Parses the flags into [`RuntimeOptions`]. Actions that need the loaded
//! configuration (running, listing, creating scripts) are carried out by
//! `main` after logging is initialized.

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Language used by `--eval` when `--lang` is not given.
pub const DEFAULT_EVAL_LANGUAGE: &str = "rhai";

/// scripthost - run user scripts against shared DOM bindings
#[derive(Parser, Debug)]
#[command(name = "scripthost")]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("action")
        .args(["run_script", "eval", "list_providers", "list_scripts", "new_script"])
))]
pub struct Cli {
    /// Script file to run (a `.link` file is followed to its target)
    #[arg(long, value_name = "FILE", num_args = 0..=1, default_missing_value = "")]
    pub run_script: Option<String>,

    /// Evaluate source text instead of a file
    #[arg(long, value_name = "CODE")]
    pub eval: Option<String>,

    /// Language of `--eval`: provider id or extension (default: rhai)
    #[arg(long, value_name = "ID", requires = "eval")]
    pub lang: Option<String>,

    /// Force a provider by id instead of resolving it from the extension
    #[arg(long, value_name = "ID")]
    pub provider: Option<String>,

    /// List registered providers and their extensions
    #[arg(long)]
    pub list_providers: bool,

    /// List scripts in the scripts folder
    #[arg(long)]
    pub list_scripts: bool,

    /// Create a new script in the scripts folder from the provider's template
    #[arg(long, value_name = "NAME")]
    pub new_script: Option<String>,

    /// Set debug log level (overrides config and DEBUG_LEVEL)
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,

    /// Disable ANSI colors in console output
    #[arg(long)]
    pub no_color: bool,

    /// Arguments passed to the script as `process.argv`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub script_args: Vec<String>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

/// What the binary should do once the host is set up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    RunFile(PathBuf),
    Eval { code: String, language: String },
    ListProviders,
    ListScripts,
    NewScript(String),
}

/// Runtime options passed from CLI to the host
#[derive(Clone, Debug, Default)]
pub struct RuntimeOptions {
    /// `None` when no action was given or `--run-script` had no value
    pub action: Option<Action>,
    /// Provider id override
    pub provider: Option<String>,
    /// Trailing arguments for the script
    pub script_args: Vec<String>,
    /// Log level override from CLI
    pub log_level: Option<log::LevelFilter>,
    pub no_color: bool,
}

/// Result of CLI processing
pub enum CliResult {
    /// Continue with host startup
    Continue(RuntimeOptions),
    /// Exit with the given code
    Exit(i32),
}

impl Cli {
    /// Convert parsed flags into runtime options.
    pub fn into_options(self) -> RuntimeOptions {
        let action = if let Some(path) = self.run_script {
            let path = path.trim();
            (!path.is_empty()).then(|| Action::RunFile(PathBuf::from(path)))
        } else if let Some(code) = self.eval {
            Some(Action::Eval {
                code,
                language: self
                    .lang
                    .unwrap_or_else(|| DEFAULT_EVAL_LANGUAGE.to_string()),
            })
        } else if self.list_providers {
            Some(Action::ListProviders)
        } else if self.list_scripts {
            Some(Action::ListScripts)
        } else {
            self.new_script.map(Action::NewScript)
        };

        RuntimeOptions {
            action,
            provider: self.provider,
            script_args: self.script_args,
            log_level: self.log_level.map(|l| l.to_level_filter()),
            no_color: self.no_color,
        }
    }
}

/// Process CLI arguments
pub fn process_cli() -> CliResult {
    match Cli::try_parse() {
        Ok(cli) => CliResult::Continue(cli.into_options()),
        Err(e) => {
            // Help and version are "errors" that print to stdout and exit 0
            let code = e.exit_code();
            let _ = e.print();
            CliResult::Exit(code)
        }
    }
}
