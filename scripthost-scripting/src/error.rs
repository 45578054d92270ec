//! Typed error types for the scripting host.
//!
//! The run taxonomy separates host defects (missing provider, failing
//! bootstrap, engine creation) from the expected failures of user scripts, so
//! callers can report the two differently. Binding errors never abort a run;
//! they are collected into the [`RunResult`](crate::runner::RunResult).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Marker text raised by the bootstrap-defined exit functions.
///
/// A script error whose message contains this marker ends the run with
/// [`RunOutcome::Exited`](crate::runner::RunOutcome::Exited) instead of a failure.
pub const EXIT_MARKER: &str = "__EXIT__";

/// No registered provider can run the requested script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoProviderError {
    /// No provider claims the file's extension.
    #[error("Script provider not found for extension '{0}'")]
    Extension(String),

    /// The file has no extension to resolve against.
    #[error("Script provider not found for file without extension: {}", .0.display())]
    MissingExtension(PathBuf),

    /// No provider is registered under the given id.
    #[error("Script provider not found with id '{0}'")]
    Id(String),
}

/// A language-level failure raised while evaluating source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    /// Interpreter message, without position decoration where possible.
    pub message: String,
    /// Name of the evaluated source (file name, `<bootstrap>`, `<inline>`).
    pub source_name: Option<String>,
    /// 1-based line of the failure, if the interpreter reported one.
    pub line: Option<usize>,
    /// 1-based column of the failure, if the interpreter reported one.
    pub column: Option<usize>,
}

impl ScriptError {
    /// Create an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source_name: None,
            line: None,
            column: None,
        }
    }

    /// Attach the evaluated source name.
    pub fn in_source(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Attach a line/column position.
    pub fn at(mut self, line: Option<usize>, column: Option<usize>) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Whether this error was raised by a bootstrap exit function.
    pub fn is_exit(&self) -> bool {
        self.message.contains(EXIT_MARKER)
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        match (&self.source_name, self.line, self.column) {
            (Some(name), Some(line), Some(col)) => write!(f, " ({name}:{line}:{col})"),
            (Some(name), Some(line), None) => write!(f, " ({name}:{line})"),
            (None, Some(line), Some(col)) => write!(f, " (line {line}, column {col})"),
            (None, Some(line), None) => write!(f, " (line {line})"),
            (Some(name), None, _) => write!(f, " ({name})"),
            (None, None, _) => Ok(()),
        }
    }
}

impl std::error::Error for ScriptError {}

/// Failures of individual binding contributions. Logged, never fatal to a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// A binding factory returned an error or panicked.
    #[error("Binding '{name}' could not be instantiated: {reason}")]
    Instantiation {
        /// Variable name of the failing descriptor.
        name: String,
        /// Factory failure description.
        reason: String,
    },

    /// A bound object's dispose capability returned an error or panicked.
    #[error("Binding '{name}' failed to dispose: {reason}")]
    Disposal {
        /// Variable name of the binding being disposed.
        name: String,
        /// Disposal failure description.
        reason: String,
    },
}

/// Terminal error of a script run.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    /// Provider resolution failed.
    #[error(transparent)]
    NoProvider(#[from] NoProviderError),

    /// The script file could not be read.
    #[error("Could not read script '{}': {reason}", path.display())]
    ScriptRead {
        /// Path that failed to read.
        path: PathBuf,
        /// I/O failure description.
        reason: String,
    },

    /// The provider could not construct an engine instance.
    #[error("Script engine could not be created by provider '{provider}': {reason}")]
    EngineCreation {
        /// Provider id.
        provider: String,
        /// Failure description.
        reason: String,
    },

    /// A binding could not be injected into the engine.
    #[error("Binding '{name}' could not be injected: {source}")]
    Injection {
        /// Variable name being injected.
        name: String,
        /// Engine failure.
        #[source]
        source: ScriptError,
    },

    /// The provider's bootstrap source failed.
    #[error("Bootstrap of provider '{provider}' failed: {source}")]
    Bootstrap {
        /// Provider id.
        provider: String,
        /// Engine failure.
        #[source]
        source: ScriptError,
    },

    /// The user script failed to parse or raised an error.
    #[error(transparent)]
    Script(#[from] ScriptError),
}

impl RunError {
    /// Whether the failure belongs to the user script rather than the host.
    pub fn is_script_error(&self) -> bool {
        matches!(self, RunError::Script(_))
    }
}
