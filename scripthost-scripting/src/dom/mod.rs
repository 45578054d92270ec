//! Standard DOM bindings available to every script.
//!
//! | Name              | Value                                    |
//! |-------------------|------------------------------------------|
//! | `console`         | [`ConsoleBinding`]                       |
//! | `fs`              | [`FileSystemBinding`]                    |
//! | `process`         | [`ProcessBinding`]                       |
//! | `__SCRIPTS_DIR__` | scripts folder with a trailing separator |

pub mod console;
pub mod fs;
pub mod process;

use std::path::{MAIN_SEPARATOR, PathBuf};
use std::sync::Arc;

use crate::bindings::{BindingContributions, BindingDescriptor};
use crate::output::OutputMultiplexer;
use crate::value::DomValue;

pub use console::ConsoleBinding;
pub use fs::{FileSystemBinding, FsError, write_file};
pub use process::ProcessBinding;

/// Variable holding the scripts folder.
pub const SCRIPTS_DIR_VARIABLE: &str = "__SCRIPTS_DIR__";

/// Contribution source of the standard bindings.
#[derive(Debug, Clone)]
pub struct StandardBindings {
    output: Arc<OutputMultiplexer>,
    scripts_dir: Option<PathBuf>,
    argv: Vec<String>,
}

impl StandardBindings {
    pub fn new(output: Arc<OutputMultiplexer>) -> Self {
        Self {
            output,
            scripts_dir: None,
            argv: Vec::new(),
        }
    }

    pub fn with_scripts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scripts_dir = Some(dir.into());
        self
    }

    pub fn with_argv(mut self, argv: Vec<String>) -> Self {
        self.argv = argv;
        self
    }

    fn scripts_dir_string(&self) -> Option<String> {
        self.scripts_dir.as_ref().map(|dir| {
            let mut s = dir.to_string_lossy().into_owned();
            if !s.ends_with(MAIN_SEPARATOR) {
                s.push(MAIN_SEPARATOR);
            }
            s
        })
    }
}

impl BindingContributions for StandardBindings {
    fn contributions(&self) -> Vec<BindingDescriptor> {
        let output = Arc::clone(&self.output);
        let argv = self.argv.clone();
        let scripts_dir = self.scripts_dir_string();

        let mut descriptors = vec![
            BindingDescriptor::object("console", move || {
                Arc::new(ConsoleBinding::new(Arc::clone(&output)))
            }),
            BindingDescriptor::object("fs", || Arc::new(FileSystemBinding::new())),
        ];
        let process_dir = scripts_dir.clone();
        descriptors.push(BindingDescriptor::object("process", move || {
            Arc::new(ProcessBinding::new(argv.clone(), process_dir.clone()))
        }));
        if let Some(dir) = scripts_dir {
            descriptors.push(BindingDescriptor::value(
                SCRIPTS_DIR_VARIABLE,
                DomValue::Str(dir),
            ));
        }
        descriptors
    }
}
