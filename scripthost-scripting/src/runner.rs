//! Script execution orchestrator.
//!
//! [`ScriptRunner::run`] resolves a provider, creates a fresh engine, injects
//! the bindings of the run, evaluates the provider bootstrap and then the user
//! script. Bound instances are released by a [`BindingScope`] on every path
//! from engine creation onward, including unwinding, and output interception
//! is ended the same way.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bindings::{BindingRegistry, dispose_value};
use crate::error::{BindingError, RunError};
use crate::output::{OutputMultiplexer, Stream};
use crate::provider::{EngineContext, ScriptProvider, ScriptSource};
use crate::registry::ProviderRegistry;
use crate::script_files;
use crate::value::DomValue;

/// Where the script comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLocator {
    /// A script file (or `.link` file pointing at one).
    File(PathBuf),
    /// Source text plus a language hint (provider id or extension).
    Inline { source: String, language: String },
}

impl ScriptLocator {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        ScriptLocator::File(path.into())
    }

    pub fn inline(source: impl Into<String>, language: impl Into<String>) -> Self {
        ScriptLocator::Inline {
            source: source.into(),
            language: language.into(),
        }
    }
}

/// Lifecycle states of one run, recorded in [`RunResult::trace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    ProviderResolved,
    EngineCreated,
    BindingsInjected,
    BootstrapRun,
    ScriptRun,
    Disposed,
    Succeeded,
    Failed,
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The script ran to completion.
    Completed,
    /// The script called the bootstrap exit function.
    Exited,
}

/// Result of [`ScriptRunner::run`].
#[derive(Debug)]
pub struct RunResult {
    /// Provider that ran the script, if resolution succeeded.
    pub provider_id: Option<String>,
    pub outcome: Result<RunOutcome, RunError>,
    /// Visited states, starting with `Idle`.
    pub trace: Vec<RunState>,
    /// Bindings that failed to instantiate. The run continued without them.
    pub binding_failures: Vec<BindingError>,
    /// Bindings whose disposal failed.
    pub disposal_errors: Vec<BindingError>,
}

impl RunResult {
    fn new() -> Self {
        Self {
            provider_id: None,
            outcome: Ok(RunOutcome::Completed),
            trace: vec![RunState::Idle],
            binding_failures: Vec::new(),
            disposal_errors: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&RunError> {
        self.outcome.as_ref().err()
    }

    /// `Succeeded` or `Failed`.
    pub fn final_state(&self) -> RunState {
        self.trace.last().copied().unwrap_or(RunState::Idle)
    }

    pub fn visited(&self, state: RunState) -> bool {
        self.trace.contains(&state)
    }
}

/// Behavior switches of a [`ScriptRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Hold the runner's lock for the whole run.
    pub serialize_runs: bool,
    /// Show the display sink when a run starts.
    pub show_console_on_run: bool,
    /// Clear the display sink when a run starts.
    pub clear_console_on_run: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            serialize_runs: true,
            show_console_on_run: false,
            clear_console_on_run: false,
        }
    }
}

/// Owns the bound instances of one run and disposes them exactly once.
///
/// Disposal runs in reverse acquisition order, either explicitly through
/// [`BindingScope::dispose`] or on drop.
#[derive(Debug, Default)]
pub struct BindingScope {
    entries: Vec<(String, DomValue)>,
    disposed: bool,
}

impl BindingScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = (String, DomValue)>) {
        self.entries.extend(entries);
    }

    pub fn entries(&self) -> &[(String, DomValue)] {
        &self.entries
    }

    /// Release every instance. Later calls do nothing.
    pub fn dispose(&mut self) -> Vec<BindingError> {
        if self.disposed {
            return Vec::new();
        }
        self.disposed = true;

        let mut errors = Vec::new();
        for (name, value) in self.entries.drain(..).rev() {
            match dispose_value(&name, &value) {
                Ok(true) => log::trace!("Disposed binding '{}'", name),
                Ok(false) => {}
                Err(err) => {
                    log::warn!("{}", err);
                    errors.push(err);
                }
            }
        }
        errors
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        if !self.disposed {
            let _ = self.dispose();
        }
    }
}

/// Output interception held for the length of one run. Ends it on
/// [`CaptureScope::end`] or on drop.
struct CaptureScope<'a> {
    output: &'a OutputMultiplexer,
    began: bool,
}

impl<'a> CaptureScope<'a> {
    fn begin(output: &'a OutputMultiplexer) -> Self {
        let began = output.begin();
        if !began {
            log::debug!("Output already intercepted, run output joins it");
        }
        Self { output, began }
    }

    fn end(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.began {
            self.began = false;
            self.output.end();
        }
    }
}

impl Drop for CaptureScope<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Runs scripts against the registered providers and bindings.
pub struct ScriptRunner {
    providers: Arc<ProviderRegistry>,
    bindings: Arc<BindingRegistry>,
    output: Arc<OutputMultiplexer>,
    options: RunnerOptions,
    run_lock: Mutex<()>,
}

impl ScriptRunner {
    pub fn new(
        providers: Arc<ProviderRegistry>,
        bindings: Arc<BindingRegistry>,
        output: Arc<OutputMultiplexer>,
    ) -> Self {
        Self::with_options(providers, bindings, output, RunnerOptions::default())
    }

    pub fn with_options(
        providers: Arc<ProviderRegistry>,
        bindings: Arc<BindingRegistry>,
        output: Arc<OutputMultiplexer>,
        options: RunnerOptions,
    ) -> Self {
        Self {
            providers,
            bindings,
            output,
            options,
            run_lock: Mutex::new(()),
        }
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    pub fn bindings(&self) -> &Arc<BindingRegistry> {
        &self.bindings
    }

    pub fn output(&self) -> &Arc<OutputMultiplexer> {
        &self.output
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Run a script to completion. Blocks the calling thread.
    pub fn run(&self, locator: &ScriptLocator, provider_id: Option<&str>) -> RunResult {
        let _serial = self.options.serialize_runs.then(|| self.run_lock.lock());
        let mut result = RunResult::new();

        let (provider, source) = match self.prepare(locator, provider_id) {
            Ok(prepared) => prepared,
            Err(err) => {
                log::error!("Script run aborted: {}", err);
                self.report(Stream::Err, &format!("Script Error: {err}\n"));
                result.outcome = Err(err);
                // Nothing was acquired, so disposal is trivially complete.
                result.trace.push(RunState::Disposed);
                result.trace.push(RunState::Failed);
                return result;
            }
        };
        log::info!("Running script '{}' with provider '{}'", source.name, provider.id());
        result.provider_id = Some(provider.id().to_string());
        result.trace.push(RunState::ProviderResolved);

        if self.options.clear_console_on_run {
            self.output.clear_sink();
        }
        if self.options.show_console_on_run {
            self.output.show_sink();
        }
        let capture = CaptureScope::begin(&self.output);

        let mut scope = BindingScope::new();
        let outcome = self.execute(provider.as_ref(), &source, &mut scope, &mut result);

        result.disposal_errors = scope.dispose();
        result.trace.push(RunState::Disposed);

        match &outcome {
            Ok(RunOutcome::Completed) => log::debug!("Script '{}' completed", source.name),
            Ok(RunOutcome::Exited) => {
                log::debug!("Script '{}' exited", source.name);
                self.report(Stream::Out, "Exited\n");
            }
            Err(err) => {
                log::error!("Script '{}' failed: {}", source.name, err);
                self.report(Stream::Err, &format!("Script Error: {err}\n"));
            }
        }

        capture.end();

        result.trace.push(if outcome.is_ok() {
            RunState::Succeeded
        } else {
            RunState::Failed
        });
        result.outcome = outcome;
        result
    }

    /// Resolve the provider and read the script text.
    fn prepare(
        &self,
        locator: &ScriptLocator,
        provider_id: Option<&str>,
    ) -> Result<(Arc<dyn ScriptProvider>, ScriptSource), RunError> {
        match locator {
            ScriptLocator::File(path) => {
                let path = if script_files::is_linked_file(path) {
                    script_files::resolve_link_file(path).map_err(|e| RunError::ScriptRead {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?
                } else {
                    path.clone()
                };

                let provider = match provider_id {
                    Some(id) => self.providers.resolve_by_id(id)?,
                    None => self.providers.resolve_by_extension(&path)?,
                };

                let text = fs::read_to_string(&path).map_err(|e| RunError::ScriptRead {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                Ok((provider, ScriptSource::from_file(&path, text)))
            }
            ScriptLocator::Inline { source, language } => {
                let provider = match provider_id {
                    Some(id) => self.providers.resolve_by_id(id)?,
                    None => self.providers.resolve_hint(language)?,
                };
                Ok((provider, ScriptSource::inline("<inline>", source.clone())))
            }
        }
    }

    /// Steps from engine creation to the end of the user script.
    fn execute(
        &self,
        provider: &dyn ScriptProvider,
        source: &ScriptSource,
        scope: &mut BindingScope,
        result: &mut RunResult,
    ) -> Result<RunOutcome, RunError> {
        let ctx = EngineContext {
            output: Arc::clone(&self.output),
        };
        let mut engine =
            provider
                .create_engine(&ctx)
                .map_err(|reason| RunError::EngineCreation {
                    provider: provider.id().to_string(),
                    reason,
                })?;
        result.trace.push(RunState::EngineCreated);

        let (entries, failures) = self.bindings.load_bindings().into_parts();
        result.binding_failures = failures;
        scope.extend(entries);

        for (name, value) in scope.entries() {
            engine
                .inject(name, value.clone())
                .map_err(|source| RunError::Injection {
                    name: name.clone(),
                    source,
                })?;
        }
        result.trace.push(RunState::BindingsInjected);

        if let Some(bootstrap) = provider.bootstrap() {
            engine
                .evaluate(&bootstrap)
                .map_err(|source| RunError::Bootstrap {
                    provider: provider.id().to_string(),
                    source,
                })?;
        }
        result.trace.push(RunState::BootstrapRun);

        let outcome = match engine.evaluate(source) {
            Ok(()) => RunOutcome::Completed,
            Err(err) if err.is_exit() => RunOutcome::Exited,
            Err(err) => return Err(RunError::Script(err)),
        };
        result.trace.push(RunState::ScriptRun);
        Ok(outcome)
    }

    fn report(&self, stream: Stream, text: &str) {
        if let Err(e) = self.output.print(stream, text) {
            log::warn!("Failed to write run report: {}", e);
        }
    }
}

impl std::fmt::Debug for ScriptRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRunner")
            .field("providers", &self.providers.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
