//! Scripting system re-exports from the `scripthost-scripting` crate.

pub use scripthost_scripting::bindings;
pub use scripthost_scripting::dom;
pub use scripthost_scripting::engines;
pub use scripthost_scripting::error;
pub use scripthost_scripting::output;
pub use scripthost_scripting::provider;
pub use scripthost_scripting::registry;
pub use scripthost_scripting::runner;
pub use scripthost_scripting::script_files;
pub use scripthost_scripting::value;

pub use scripthost_scripting::{
    BindingDescriptor, BindingRegistry, ColorTag, DisplaySink, DomValue, OutputMultiplexer,
    ProviderRegistry, RunError, RunOutcome, RunResult, RunState, ScriptLocator, ScriptProvider,
    ScriptRunner,
};
