//! Uniform execution contract between the host and scripting languages.
//!
//! A [`ScriptProvider`] describes one language (identity, file extensions,
//! bootstrap source) and constructs isolated [`EngineInstance`]s. The
//! orchestrator only ever talks to these two traits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ScriptError;
use crate::output::OutputMultiplexer;
use crate::value::DomValue;

/// Source text to evaluate, with a name used in error positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    /// Display name (file name, `<bootstrap:rhai>`, `<inline>`).
    pub name: String,
    /// Source text.
    pub text: String,
    /// Originating file, when the source was read from disk.
    pub path: Option<PathBuf>,
}

impl ScriptSource {
    /// Source that did not come from a file.
    pub fn inline(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            path: None,
        }
    }

    /// Source read from `path`.
    pub fn from_file(path: &Path, text: String) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            text,
            path: Some(path.to_path_buf()),
        }
    }
}

/// Host services handed to a provider when it creates an engine.
#[derive(Clone)]
pub struct EngineContext {
    /// Destination of the engine's own print/debug output.
    pub output: Arc<OutputMultiplexer>,
}

/// One isolated execution context. Never reused across runs.
pub trait EngineInstance {
    /// Define a global variable visible to every later evaluation.
    fn inject(&mut self, name: &str, value: DomValue) -> Result<(), ScriptError>;

    /// Evaluate source text in this instance.
    fn evaluate(&mut self, source: &ScriptSource) -> Result<(), ScriptError>;
}

/// A registered strategy for executing scripts of one language.
pub trait ScriptProvider: Send + Sync {
    /// Stable identifier.
    fn id(&self) -> &str;

    /// Human label.
    fn display_name(&self) -> &str;

    /// File suffixes with a leading dot. The first is the default for new files.
    fn supported_extensions(&self) -> &[String];

    /// Initialization source executed before every user script.
    fn bootstrap(&self) -> Option<ScriptSource>;

    /// Text used when creating a new script file for this language.
    fn new_file_template(&self) -> &str {
        ""
    }

    /// Construct a fresh engine instance.
    fn create_engine(&self, ctx: &EngineContext) -> Result<Box<dyn EngineInstance>, String>;
}

impl std::fmt::Debug for dyn ScriptProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptProvider")
            .field("id", &self.id())
            .field("extensions", &self.supported_extensions())
            .finish_non_exhaustive()
    }
}

/// Normalize an extension to lowercase with a leading dot.
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}
