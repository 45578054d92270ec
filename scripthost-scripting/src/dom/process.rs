//! `process` binding.

use crate::value::{DomObject, DomValue, expect_args, str_arg};

/// Script arguments and host environment.
#[derive(Debug, Clone, Default)]
pub struct ProcessBinding {
    argv: Vec<String>,
    scripts_dir: Option<String>,
}

impl ProcessBinding {
    pub fn new(argv: Vec<String>, scripts_dir: Option<String>) -> Self {
        Self { argv, scripts_dir }
    }
}

impl DomObject for ProcessBinding {
    fn type_name(&self) -> &str {
        "Process"
    }

    fn methods(&self) -> &[&'static str] {
        &["env"]
    }

    fn properties(&self) -> &[&'static str] {
        &["argv", "platform", "scripts_dir"]
    }

    fn call(&self, method: &str, args: &[DomValue]) -> Result<DomValue, String> {
        match method {
            "env" => {
                expect_args(method, args, 1, 1)?;
                let name = str_arg(method, args, 0)?;
                Ok(std::env::var(name).map(DomValue::Str).unwrap_or_default())
            }
            _ => Err(format!("Process has no method '{method}'")),
        }
    }

    fn get(&self, property: &str) -> Option<DomValue> {
        match property {
            "argv" => Some(DomValue::List(
                self.argv.iter().map(|a| DomValue::from(a.as_str())).collect(),
            )),
            "platform" => Some(DomValue::from(std::env::consts::OS)),
            "scripts_dir" => Some(
                self.scripts_dir
                    .as_deref()
                    .map(DomValue::from)
                    .unwrap_or_default(),
            ),
            _ => None,
        }
    }
}
