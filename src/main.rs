use anyhow::Result;
use scripthost::cli::{self, Action, RuntimeOptions};
use scripthost::config::Config;
use scripthost::host::ScriptHost;
use scripthost::scripting::RunOutcome;
use scripthost::sink::TerminalSink;
use std::sync::Arc;

/// Exit code for usage errors (no script given).
const USAGE_EXIT_CODE: i32 = 2;

fn main() -> Result<()> {
    // Process CLI arguments first (before logging init for cleaner output)
    let runtime_options = match cli::process_cli() {
        cli::CliResult::Exit(code) => {
            if code == 0 {
                return Ok(());
            }
            std::process::exit(code);
        }
        cli::CliResult::Continue(options) => options,
    };
    // Routes all log::info!() etc. to /tmp/scripthost_debug.log.
    // CLI --log-level takes precedence, then DEBUG_LEVEL, then config (applied below).
    scripthost::debug::init_log_bridge(runtime_options.log_level);

    log::info!("Starting scripthost {}", scripthost::VERSION);

    let Some(action) = runtime_options.action.clone() else {
        log::error!("No script given: --run-script requires a file path");
        eprintln!("scripthost: error: no script given (use --run-script <FILE>)");
        std::process::exit(USAGE_EXIT_CODE);
    };

    let config = Config::load()?;
    scripthost::debug::apply_config_level(config.log_level.to_level_filter());

    let code = run(&config, action, runtime_options)?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn run(config: &Config, action: Action, options: RuntimeOptions) -> Result<i32> {
    let host = ScriptHost::new(config, options.script_args)?;
    let color = config.console.color && !options.no_color;
    host.output().set_sink(Some(Arc::new(TerminalSink::new(color))));

    let result = match action {
        Action::RunFile(path) => host.run_file(&path, options.provider.as_deref()),
        Action::Eval { code, language } => {
            host.run_inline(&code, &language, options.provider.as_deref())
        }
        Action::ListProviders => {
            for provider in host.providers() {
                println!(
                    "{:<12} {:<20} {}",
                    provider.id(),
                    provider.display_name(),
                    provider.supported_extensions().join(" ")
                );
            }
            return Ok(0);
        }
        Action::ListScripts => {
            for script in host.list_scripts()? {
                let shown = script.strip_prefix(host.scripts_dir()).unwrap_or(&script);
                println!("{}", shown.display());
            }
            return Ok(0);
        }
        Action::NewScript(name) => {
            let path = host.new_script(&name, options.provider.as_deref())?;
            println!("{}", path.display());
            return Ok(0);
        }
    };

    match result.outcome {
        Ok(RunOutcome::Completed | RunOutcome::Exited) => Ok(0),
        Err(e) => {
            log::error!("Run failed: {}", e);
            Ok(1)
        }
    }
}
