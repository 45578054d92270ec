//! Script host assembled from the configuration.
//!
//! [`ScriptHost`] registers the built-in and configured providers, the
//! standard bindings and a [`ScriptRunner`] whose options follow the
//! `console` and `runner` config sections.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{Config, ExternalProviderConfig};
use crate::scripting::dom::StandardBindings;
use crate::scripting::engines::{CommandProvider, CommandSpec, register_builtin_providers};
use crate::scripting::runner::RunnerOptions;
use crate::scripting::{
    BindingRegistry, OutputMultiplexer, ProviderRegistry, RunResult, ScriptLocator,
    ScriptProvider, ScriptRunner, script_files,
};

/// Provider used for new scripts when none is named.
pub const DEFAULT_PROVIDER: &str = "rhai";

/// Providers, bindings and runner configured for one process.
pub struct ScriptHost {
    runner: ScriptRunner,
    scripts_dir: PathBuf,
}

impl ScriptHost {
    /// Host writing to the process-wide stdout/stderr.
    pub fn new(config: &Config, argv: Vec<String>) -> Result<Self> {
        Self::with_output(config, OutputMultiplexer::global(), argv)
    }

    /// Host writing through `output`.
    pub fn with_output(
        config: &Config,
        output: Arc<OutputMultiplexer>,
        argv: Vec<String>,
    ) -> Result<Self> {
        let providers = Arc::new(ProviderRegistry::new());
        register_builtin_providers(&providers, config.runner.max_operations);
        for provider in config.enabled_providers() {
            providers.register(Arc::new(command_provider(provider)?));
            debug_info!(
                "HOST",
                "Registered external provider '{}' ({})",
                provider.id,
                provider.command
            );
        }

        let scripts_dir = config.scripts_folder_path();
        let bindings = Arc::new(BindingRegistry::new());
        bindings.add_source(Arc::new(
            StandardBindings::new(Arc::clone(&output))
                .with_scripts_dir(&scripts_dir)
                .with_argv(argv),
        ));

        let options = RunnerOptions {
            serialize_runs: config.runner.serialize_runs,
            show_console_on_run: config.console.show_on_run,
            clear_console_on_run: config.console.clear_on_run,
        };
        log::info!(
            "Script host ready: {} providers, scripts folder {:?}",
            providers.len(),
            scripts_dir
        );

        Ok(Self {
            runner: ScriptRunner::with_options(providers, bindings, output, options),
            scripts_dir,
        })
    }

    pub fn runner(&self) -> &ScriptRunner {
        &self.runner
    }

    pub fn output(&self) -> &Arc<OutputMultiplexer> {
        self.runner.output()
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Registered providers, ordered by id.
    pub fn providers(&self) -> Vec<Arc<dyn ScriptProvider>> {
        let mut providers = self.runner.providers().all();
        providers.sort_by(|a, b| a.id().cmp(b.id()));
        providers
    }

    /// Run a script file. Relative paths missing from the working directory
    /// are looked up in the scripts folder.
    pub fn run_file(&self, path: &Path, provider: Option<&str>) -> RunResult {
        let path = self.locate(path);
        debug_info!("HOST", "Running {}", path.display());
        let result = self.runner.run(&ScriptLocator::file(path), provider);
        self.log_result(&result);
        result
    }

    /// Run source text; `language` is a provider id or an extension.
    pub fn run_inline(&self, code: &str, language: &str, provider: Option<&str>) -> RunResult {
        debug_trace!("HOST", "Inline {} script, {} bytes", language, code.len());
        let result = self.runner.run(&ScriptLocator::inline(code, language), provider);
        self.log_result(&result);
        result
    }

    fn log_result(&self, result: &RunResult) {
        match result.error() {
            Some(err) => debug_error!("HOST", "Run failed: {}", err),
            None => debug_log!("HOST", "Run finished with {:?}", result.provider_id),
        }
    }

    /// Script files in the scripts folder, skipping hidden folders.
    pub fn list_scripts(&self) -> Result<Vec<PathBuf>> {
        if !self.scripts_dir.exists() {
            return Ok(Vec::new());
        }
        script_files::list_scripts(&self.scripts_dir, self.runner.providers()).with_context(
            || format!("Failed to list scripts in {}", self.scripts_dir.display()),
        )
    }

    /// Create a new script in the scripts folder. Without a provider id the
    /// extension of `name` picks the provider, falling back to Rhai.
    pub fn new_script(&self, name: &str, provider: Option<&str>) -> Result<PathBuf> {
        let registry = self.runner.providers();
        let provider = match provider {
            Some(id) => registry.resolve_by_id(id)?,
            None => registry
                .resolve_by_extension(name)
                .or_else(|_| registry.resolve_by_id(DEFAULT_PROVIDER))?,
        };
        script_files::create_new_script(&self.scripts_dir, name, provider.as_ref())
            .with_context(|| format!("Failed to create script '{name}'"))
    }

    fn locate(&self, path: &Path) -> PathBuf {
        if path.is_relative() && !path.exists() {
            let candidate = self.scripts_dir.join(path);
            if candidate.exists() {
                return candidate;
            }
        }
        path.to_path_buf()
    }
}

impl std::fmt::Debug for ScriptHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptHost")
            .field("runner", &self.runner)
            .field("scripts_dir", &self.scripts_dir)
            .finish()
    }
}

/// Build a command provider from its config entry.
fn command_provider(config: &ExternalProviderConfig) -> Result<CommandProvider> {
    let (command, args) = config.command_line()?;
    CommandProvider::new(CommandSpec {
        id: config.id.clone(),
        name: config.display_name().to_string(),
        extensions: config.extensions.clone(),
        command,
        args,
        env_vars: config.env_vars.clone(),
        bootstrap: config.bootstrap.as_ref().map(PathBuf::from),
        template: config.template.clone().unwrap_or_default(),
    })
    .with_context(|| format!("Failed to set up provider '{}'", config.id))
}
