//! External interpreter providers.
//!
//! A [`CommandProvider`] runs each evaluation in a subprocess of a configured
//! interpreter (`python3`, `node`, `sh`, ...). The source text is written to
//! the child's stdin, stdout and stderr are forwarded line by line into the
//! output multiplexer, and plain (non-object) bindings are exported as JSON in
//! `SCRIPTHOST_<NAME>` environment variables.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::error::{EXIT_MARKER, ScriptError};
use crate::output::{OutputMultiplexer, Stream};
use crate::provider::{EngineContext, EngineInstance, ScriptProvider, ScriptSource};
use crate::value::DomValue;

/// Prefix of environment variables carrying exported bindings.
pub const ENV_PREFIX: &str = "SCRIPTHOST_";

/// Number of trailing stderr lines kept for the error message.
const ERROR_TAIL_LINES: usize = 5;

/// Definition of an external interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub id: String,
    pub name: String,
    /// Extensions with a leading dot.
    pub extensions: Vec<String>,
    /// Interpreter executable.
    pub command: String,
    pub args: Vec<String>,
    pub env_vars: HashMap<String, String>,
    /// Setup file checked on its own, then run ahead of every script.
    pub bootstrap: Option<PathBuf>,
    /// Content of new script files.
    pub template: String,
}

/// Provider running scripts through an external interpreter.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    spec: Arc<CommandSpec>,
    bootstrap: Option<ScriptSource>,
}

impl CommandProvider {
    /// Build a provider, reading the configured bootstrap file.
    pub fn new(spec: CommandSpec) -> io::Result<Self> {
        let bootstrap = match &spec.bootstrap {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| {
                    io::Error::new(
                        e.kind(),
                        format!("Failed to read bootstrap '{}': {}", path.display(), e),
                    )
                })?;
                Some(ScriptSource {
                    name: bootstrap_name(&spec.id),
                    text,
                    path: Some(path.clone()),
                })
            }
            None => None,
        };
        Ok(Self {
            spec: Arc::new(spec),
            bootstrap,
        })
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }
}

impl ScriptProvider for CommandProvider {
    fn id(&self) -> &str {
        &self.spec.id
    }

    fn display_name(&self) -> &str {
        &self.spec.name
    }

    fn supported_extensions(&self) -> &[String] {
        &self.spec.extensions
    }

    fn bootstrap(&self) -> Option<ScriptSource> {
        self.bootstrap.clone()
    }

    fn new_file_template(&self) -> &str {
        &self.spec.template
    }

    fn create_engine(&self, ctx: &EngineContext) -> Result<Box<dyn EngineInstance>, String> {
        Ok(Box::new(CommandInstance {
            spec: Arc::clone(&self.spec),
            prelude: None,
            exports: HashMap::new(),
            output: Arc::clone(&ctx.output),
        }))
    }
}

fn bootstrap_name(id: &str) -> String {
    format!("<bootstrap:{id}>")
}

/// Every evaluation is its own interpreter process. The bootstrap is first
/// run alone with its output discarded; once it succeeds its text becomes
/// the prelude of the user script so its definitions are in scope.
struct CommandInstance {
    spec: Arc<CommandSpec>,
    prelude: Option<String>,
    exports: HashMap<String, String>,
    output: Arc<OutputMultiplexer>,
}

impl CommandInstance {
    fn is_bootstrap(&self, source: &ScriptSource) -> bool {
        self.prelude.is_none()
            && source.name == bootstrap_name(&self.spec.id)
            && source.path.is_some()
            && source.path == self.spec.bootstrap
    }

    /// Run `input` in a fresh interpreter and map a failed exit to an error.
    fn run_process(
        &self,
        input: &str,
        source: &ScriptSource,
        forward: bool,
    ) -> Result<(), ScriptError> {
        let mut env = self.spec.env_vars.clone();
        env.extend(self.exports.iter().map(|(k, v)| (k.clone(), v.clone())));

        let output = forward.then(|| Arc::clone(&self.output));
        let mut process = ScriptProcess::spawn(&self.spec.command, &self.spec.args, &env, output)
            .map_err(|e| ScriptError::new(e).in_source(&source.name))?;

        if let Err(e) = process.write_source(input) {
            // The interpreter may exit before reading everything; its status decides.
            log::warn!("{}", e);
        }

        let status = process
            .wait()
            .map_err(|e| ScriptError::new(e).in_source(&source.name))?;
        if status.success() {
            return Ok(());
        }

        let tail = process.error_tail();
        if tail.iter().any(|line| line.contains(EXIT_MARKER)) {
            return Err(ScriptError::new(EXIT_MARKER).in_source(&source.name));
        }
        let mut message = match status.code() {
            Some(code) => format!("'{}' exited with status {}", self.spec.command, code),
            None => format!("'{}' was terminated by a signal", self.spec.command),
        };
        if let Some(last) = tail.last() {
            message.push_str(": ");
            message.push_str(last);
        }
        Err(ScriptError::new(message).in_source(&source.name))
    }
}

impl EngineInstance for CommandInstance {
    fn inject(&mut self, name: &str, value: DomValue) -> Result<(), ScriptError> {
        if value.as_object().is_some() {
            log::trace!(
                "Binding '{}' is a host object, not exported to '{}'",
                name,
                self.spec.command
            );
            return Ok(());
        }
        let json = serde_json::to_string(&value.to_json())
            .map_err(|e| ScriptError::new(format!("Failed to export '{name}': {e}")))?;
        self.exports.insert(env_var_name(name), json);
        Ok(())
    }

    fn evaluate(&mut self, source: &ScriptSource) -> Result<(), ScriptError> {
        if self.is_bootstrap(source) {
            self.run_process(&source.text, source, false)?;
            log::debug!("Bootstrap for '{}' checked", self.spec.id);
            self.prelude = Some(source.text.clone());
            return Ok(());
        }

        let Some(prelude) = self.prelude.as_deref().filter(|p| !p.is_empty()) else {
            return self.run_process(&source.text, source, true);
        };
        let offset = prelude.lines().count();
        let separator = if prelude.ends_with('\n') { "" } else { "\n" };
        let input = format!("{prelude}{separator}{}", source.text);
        self.run_process(&input, source, true).map_err(|mut err| {
            if !err.is_exit() {
                // Interpreter line numbers count the prelude too.
                err.message
                    .push_str(&format!(" (script starts at line {})", offset + 1));
            }
            err
        })
    }
}

/// `__SCRIPTS_DIR__` becomes `SCRIPTHOST_SCRIPTS_DIR`.
pub fn env_var_name(binding: &str) -> String {
    let cleaned: String = binding
        .trim_matches('_')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{ENV_PREFIX}{cleaned}")
}

/// One interpreter subprocess with piped stdio.
struct ScriptProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    readers: Vec<JoinHandle<()>>,
    /// Last lines read from stderr.
    error_tail: Arc<Mutex<Vec<String>>>,
}

impl ScriptProcess {
    /// Spawn `command` and start forwarding its stdout and stderr lines.
    fn spawn(
        command: &str,
        args: &[String],
        env_vars: &HashMap<String, String>,
        output: Option<Arc<OutputMultiplexer>>,
    ) -> Result<Self, String> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .envs(env_vars)
            .spawn()
            .map_err(|e| format!("Failed to spawn '{}': {}", command, e))?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| "Failed to capture stdout".to_string())?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| "Failed to capture stderr".to_string())?;

        let error_tail = Arc::new(Mutex::new(Vec::new()));

        let out = output.clone();
        let stdout_thread = std::thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(text) => {
                        let Some(out) = &out else { continue };
                        if let Err(e) = out.print(Stream::Out, &format!("{text}\n")) {
                            log::warn!("ScriptProcess: failed to forward stdout: {}", e);
                        }
                    }
                    Err(e) => {
                        log::warn!("ScriptProcess: error reading stdout: {}", e);
                        break;
                    }
                }
            }
        });

        let tail = Arc::clone(&error_tail);
        let stderr_thread = std::thread::spawn(move || {
            for line in BufReader::new(stderr).lines() {
                match line {
                    Ok(text) => {
                        if let Some(output) = &output
                            && let Err(e) = output.print(Stream::Err, &format!("{text}\n"))
                        {
                            log::warn!("ScriptProcess: failed to forward stderr: {}", e);
                        }
                        let mut tail = tail.lock();
                        if tail.len() == ERROR_TAIL_LINES {
                            tail.remove(0);
                        }
                        tail.push(text);
                    }
                    Err(e) => {
                        log::warn!("ScriptProcess: error reading stderr: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            child,
            stdin,
            readers: vec![stdout_thread, stderr_thread],
            error_tail,
        })
    }

    /// Write the whole source and close stdin.
    fn write_source(&mut self, text: &str) -> Result<(), String> {
        let mut stdin = self
            .stdin
            .take()
            .ok_or_else(|| "stdin writer is not available".to_string())?;
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| format!("Failed to write to stdin: {}", e))?;
        stdin
            .flush()
            .map_err(|e| format!("Failed to flush stdin: {}", e))
    }

    /// Wait for exit and for both readers to drain.
    fn wait(&mut self) -> Result<ExitStatus, String> {
        self.stdin.take();
        let status = self
            .child
            .wait()
            .map_err(|e| format!("Failed to wait for interpreter: {}", e))?;
        for reader in self.readers.drain(..) {
            if reader.join().is_err() {
                log::warn!("ScriptProcess: output reader thread panicked");
            }
        }
        Ok(status)
    }

    fn error_tail(&self) -> Vec<String> {
        self.error_tail.lock().clone()
    }
}

impl Drop for ScriptProcess {
    fn drop(&mut self) {
        self.stdin.take();
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("__SCRIPTS_DIR__"), "SCRIPTHOST_SCRIPTS_DIR");
        assert_eq!(env_var_name("my-value"), "SCRIPTHOST_MY_VALUE");
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use crate::output::MemorySink;

        fn sh_engine() -> (Box<dyn EngineInstance>, Arc<MemorySink>) {
            let output = Arc::new(OutputMultiplexer::with_destinations(
                Box::new(std::io::sink()),
                Box::new(std::io::sink()),
            ));
            let sink = Arc::new(MemorySink::new());
            output.set_sink(Some(sink.clone()));
            output.begin();
            let provider = CommandProvider::new(CommandSpec {
                id: "sh".to_string(),
                name: "Shell".to_string(),
                extensions: vec![".sh".to_string()],
                command: "sh".to_string(),
                args: vec!["-s".to_string()],
                ..CommandSpec::default()
            })
            .unwrap();
            let engine = provider
                .create_engine(&EngineContext { output })
                .unwrap();
            (engine, sink)
        }

        #[test]
        fn test_stdout_and_exports_reach_the_output() {
            let (mut engine, sink) = sh_engine();
            engine.inject("answer", DomValue::Int(42)).unwrap();
            engine
                .evaluate(&ScriptSource::inline("t.sh", "echo \"value=$SCRIPTHOST_ANSWER\""))
                .unwrap();
            assert_eq!(sink.text(), "value=42\n");
        }

        #[test]
        fn test_nonzero_exit_is_script_error() {
            let (mut engine, sink) = sh_engine();
            let err = engine
                .evaluate(&ScriptSource::inline("t.sh", "echo oops >&2\nexit 3"))
                .unwrap_err();
            assert!(err.message.contains("status 3"));
            assert!(err.message.contains("oops"));
            assert!(!err.is_exit());
            assert_eq!(sink.text_with(crate::output::ColorTag::Error), "oops\n");
        }

        #[test]
        fn test_exit_marker_on_stderr_means_exit() {
            let (mut engine, _) = sh_engine();
            let err = engine
                .evaluate(&ScriptSource::inline("t.sh", "echo __EXIT__ >&2\nexit 1"))
                .unwrap_err();
            assert!(err.is_exit());
        }

        #[test]
        fn test_bootstrap_is_checked_alone_then_runs_ahead_of_script() {
            let dir = tempfile::TempDir::new().unwrap();
            let path = dir.path().join("init.sh");
            fs::write(&path, "echo setup\ngreet() { echo \"hi $1\"; }\n").unwrap();
            let output = Arc::new(OutputMultiplexer::with_destinations(
                Box::new(std::io::sink()),
                Box::new(std::io::sink()),
            ));
            let sink = Arc::new(MemorySink::new());
            output.set_sink(Some(sink.clone()));
            output.begin();
            let provider = CommandProvider::new(CommandSpec {
                id: "sh".to_string(),
                command: "sh".to_string(),
                args: vec!["-s".to_string()],
                bootstrap: Some(path),
                ..CommandSpec::default()
            })
            .unwrap();
            let bootstrap = provider.bootstrap().unwrap();
            assert_eq!(bootstrap.name, "<bootstrap:sh>");

            let mut engine = provider.create_engine(&EngineContext { output }).unwrap();
            engine.evaluate(&bootstrap).unwrap();
            assert_eq!(sink.text(), "");

            engine
                .evaluate(&ScriptSource::inline("t.sh", "greet bob"))
                .unwrap();
            assert_eq!(sink.text(), "setup\nhi bob\n");

            let err = engine
                .evaluate(&ScriptSource::inline("t.sh", "exit 4"))
                .unwrap_err();
            assert!(err.message.contains("status 4"));
            assert!(err.message.contains("script starts at line 3"));
        }

        #[test]
        fn test_missing_bootstrap_file_fails_construction() {
            let result = CommandProvider::new(CommandSpec {
                id: "sh".to_string(),
                command: "sh".to_string(),
                bootstrap: Some(PathBuf::from("/nonexistent/scripthost/init.sh")),
                ..CommandSpec::default()
            });
            assert!(result.is_err());
        }
    }
}
