//! Scripting host core for scripthost.
//!
//! Runs user scripts in any registered language against a shared set of DOM
//! bindings, capturing their output for a display sink and releasing every
//! bound object after the run.

pub mod bindings;
pub mod dom;
pub mod engines;
pub mod error;
pub mod output;
pub mod provider;
pub mod registry;
pub mod runner;
pub mod script_files;
pub mod value;

pub use bindings::{BindingContributions, BindingDescriptor, BindingRegistry, LoadedBindings};
pub use error::{BindingError, EXIT_MARKER, NoProviderError, RunError, ScriptError};
pub use output::{
    CapturedOutputRecord, ColorTag, DisplaySink, MemorySink, OutputMultiplexer, SharedBuffer,
    Stream,
};
pub use provider::{EngineContext, EngineInstance, ScriptProvider, ScriptSource};
pub use registry::ProviderRegistry;
pub use runner::{RunOutcome, RunResult, RunState, RunnerOptions, ScriptLocator, ScriptRunner};
pub use value::{BoundObject, Disposable, DomFactory, DomObject, DomValue};
