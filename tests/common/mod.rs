//! Shared integration test helpers for scripthost.
//!
//! Include this module at the top of each test file that needs it:
//!
//! ```ignore
//! mod common;
//! use common::{TestHost, js_provider};
//! ```
//!
//! Rust integration tests use `mod common;` (not `use`) to bring in helpers
//! from `tests/common/mod.rs`. The `#![allow(dead_code)]` attribute
//! suppresses warnings when only a subset of helpers are used per file.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use scripthost::scripting::engines::RhaiProvider;
use scripthost::scripting::error::ScriptError;
use scripthost::scripting::output::{MemorySink, SharedBuffer};
use scripthost::scripting::provider::{EngineContext, EngineInstance, ScriptSource};
use scripthost::scripting::runner::RunnerOptions;
use scripthost::scripting::value::{Disposable, DomObject, DomValue};
use scripthost::scripting::{
    BindingRegistry, DisplaySink, OutputMultiplexer, ProviderRegistry, ScriptProvider,
    ScriptRunner,
};

/// Rhai registered as a `.js` language, standing in for a JavaScript engine.
pub fn js_provider() -> Arc<dyn ScriptProvider> {
    Arc::new(RhaiProvider::with_identity("js", "JavaScript", &[".js"]))
}

/// Runner wired to in-memory destinations and an optional recording sink.
pub struct TestHost {
    pub providers: Arc<ProviderRegistry>,
    pub bindings: Arc<BindingRegistry>,
    pub output: Arc<OutputMultiplexer>,
    pub stdout: SharedBuffer,
    pub stderr: SharedBuffer,
    pub sink: Arc<MemorySink>,
    pub runner: ScriptRunner,
}

impl TestHost {
    /// Host with a `.js` provider and an available sink.
    pub fn new() -> Self {
        Self::with_providers(vec![js_provider()])
    }

    pub fn with_providers(providers: Vec<Arc<dyn ScriptProvider>>) -> Self {
        Self::build(providers, RunnerOptions::default(), true)
    }

    /// Host without a display sink, so output passes through to the buffers.
    pub fn without_sink(providers: Vec<Arc<dyn ScriptProvider>>) -> Self {
        Self::build(providers, RunnerOptions::default(), false)
    }

    pub fn build(
        providers: Vec<Arc<dyn ScriptProvider>>,
        options: RunnerOptions,
        with_sink: bool,
    ) -> Self {
        let registry = Arc::new(ProviderRegistry::new());
        for provider in providers {
            registry.register(provider);
        }
        let bindings = Arc::new(BindingRegistry::new());
        let stdout = SharedBuffer::new();
        let stderr = SharedBuffer::new();
        let output = Arc::new(OutputMultiplexer::with_destinations(
            Box::new(stdout.clone()),
            Box::new(stderr.clone()),
        ));
        let sink = Arc::new(MemorySink::new());
        if with_sink {
            output.set_sink(Some(sink.clone() as Arc<dyn DisplaySink>));
        }
        let runner = ScriptRunner::with_options(
            Arc::clone(&registry),
            Arc::clone(&bindings),
            Arc::clone(&output),
            options,
        );
        Self {
            providers: registry,
            bindings,
            output,
            stdout,
            stderr,
            sink,
            runner,
        }
    }
}

/// Host object counting its disposals.
pub struct CountingObject {
    pub label: String,
    pub disposals: AtomicUsize,
    pub fail_dispose: bool,
}

impl CountingObject {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            disposals: AtomicUsize::new(0),
            fail_dispose: false,
        })
    }

    pub fn failing(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            disposals: AtomicUsize::new(0),
            fail_dispose: true,
        })
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

impl DomObject for CountingObject {
    fn type_name(&self) -> &str {
        "Counting"
    }

    fn methods(&self) -> &[&'static str] {
        &["label"]
    }

    fn call(&self, method: &str, _args: &[DomValue]) -> Result<DomValue, String> {
        match method {
            "label" => Ok(DomValue::Str(self.label.clone())),
            _ => Err(format!("Counting has no method '{method}'")),
        }
    }

    fn as_disposable(&self) -> Option<&dyn Disposable> {
        Some(self)
    }
}

impl Disposable for CountingObject {
    fn dispose(&self) -> Result<(), String> {
        self.disposals.fetch_add(1, Ordering::SeqCst);
        if self.fail_dispose {
            Err(format!("{} refused to close", self.label))
        } else {
            Ok(())
        }
    }
}

/// What a [`StubProvider`] engine saw during a run.
#[derive(Debug, Default)]
pub struct StubLog {
    pub injected: Vec<String>,
    pub evaluated: Vec<String>,
    pub engines_created: usize,
}

/// Provider whose engines record calls instead of interpreting anything.
///
/// Sources containing `FAIL` raise a script error, sources containing `EXIT`
/// raise the exit marker and sources containing `PANIC` panic.
pub struct StubProvider {
    pub id: String,
    pub extensions: Vec<String>,
    pub bootstrap: Option<String>,
    pub fail_create: bool,
    pub log: Arc<Mutex<StubLog>>,
}

impl StubProvider {
    pub fn new(id: &str, extensions: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            bootstrap: None,
            fail_create: false,
            log: Arc::new(Mutex::new(StubLog::default())),
        }
    }

    pub fn with_bootstrap(mut self, text: &str) -> Self {
        self.bootstrap = Some(text.to_string());
        self
    }

    pub fn failing_engine(mut self) -> Self {
        self.fail_create = true;
        self
    }
}

impl ScriptProvider for StubProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.id
    }

    fn supported_extensions(&self) -> &[String] {
        &self.extensions
    }

    fn bootstrap(&self) -> Option<ScriptSource> {
        self.bootstrap
            .as_ref()
            .map(|text| ScriptSource::inline("<bootstrap:stub>", text.clone()))
    }

    fn create_engine(&self, _ctx: &EngineContext) -> Result<Box<dyn EngineInstance>, String> {
        if self.fail_create {
            return Err("stub engine unavailable".to_string());
        }
        self.log.lock().engines_created += 1;
        Ok(Box::new(StubEngine {
            log: Arc::clone(&self.log),
        }))
    }
}

struct StubEngine {
    log: Arc<Mutex<StubLog>>,
}

impl EngineInstance for StubEngine {
    fn inject(&mut self, name: &str, _value: DomValue) -> Result<(), ScriptError> {
        self.log.lock().injected.push(name.to_string());
        Ok(())
    }

    fn evaluate(&mut self, source: &ScriptSource) -> Result<(), ScriptError> {
        self.log.lock().evaluated.push(source.name.clone());
        if source.text.contains("PANIC") {
            panic!("stub engine panicked in {}", source.name);
        }
        if source.text.contains("FAIL") {
            return Err(ScriptError::new("stub failure")
                .in_source(&source.name)
                .at(Some(1), Some(1)));
        }
        if source.text.contains("EXIT") {
            return Err(ScriptError::new(scripthost::scripting::error::EXIT_MARKER));
        }
        Ok(())
    }
}

/// Write a script file, creating parent directories.
pub fn write_script(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create script dir");
    }
    fs::write(&path, text).expect("Failed to write script");
    path
}
