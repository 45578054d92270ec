//! Configuration types for external interpreter providers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ConfigError;

/// An external interpreter that runs scripts with the source on stdin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalProviderConfig {
    /// Stable provider identifier (e.g. "python")
    pub id: String,

    /// Human-readable name (defaults to the id)
    #[serde(default)]
    pub name: String,

    /// Whether this provider is registered (default: true)
    #[serde(default = "crate::defaults::bool_true")]
    pub enabled: bool,

    /// File extensions with a leading dot; the first is used for new scripts
    pub extensions: Vec<String>,

    /// Interpreter command line, e.g. "python3 -u"
    pub command: String,

    /// Extra arguments appended after the command line
    #[serde(default)]
    pub args: Vec<String>,

    /// Additional environment variables for the interpreter process
    #[serde(default)]
    pub env_vars: HashMap<String, String>,

    /// File prepended to every script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<String>,

    /// Content of newly created scripts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl ExternalProviderConfig {
    /// Name to display: `name`, or the id when unset.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Split `command` into the executable and its arguments, then append `args`.
    pub fn command_line(&self) -> Result<(String, Vec<String>), ConfigError> {
        let mut words = shell_words::split(&self.command).map_err(|e| {
            ConfigError::Validation(format!(
                "providers[{}].command is not a valid command line: {}",
                self.id, e
            ))
        })?;
        if words.is_empty() {
            return Err(ConfigError::Validation(format!(
                "providers[{}].command must not be empty",
                self.id
            )));
        }
        let program = words.remove(0);
        words.extend(self.args.iter().cloned());
        Ok((program, words))
    }

    /// Check the fields that do not depend on other providers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "providers[].id must not be empty".to_string(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Validation(format!(
                "providers[{}].extensions must not be empty",
                self.id
            )));
        }
        if let Some(ext) = self
            .extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(ConfigError::Validation(format!(
                "providers[{}].extensions entry '{}' must start with '.'",
                self.id, ext
            )));
        }
        self.command_line().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn python() -> ExternalProviderConfig {
        ExternalProviderConfig {
            id: "python".to_string(),
            name: String::new(),
            enabled: true,
            extensions: vec![".py".to_string()],
            command: "python3 -u".to_string(),
            args: vec!["-".to_string()],
            env_vars: HashMap::new(),
            bootstrap: None,
            template: None,
        }
    }

    #[test]
    fn test_command_line_splits_and_appends_args() {
        let (program, args) = python().command_line().unwrap();
        assert_eq!(program, "python3");
        assert_eq!(args, vec!["-u", "-"]);
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        assert_eq!(python().display_name(), "python");
    }

    #[test]
    fn test_validation_rejects_bad_fields() {
        let mut bad_ext = python();
        bad_ext.extensions = vec!["py".to_string()];
        assert!(matches!(bad_ext.validate(), Err(ConfigError::Validation(_))));

        let mut empty_cmd = python();
        empty_cmd.command = "   ".to_string();
        assert!(empty_cmd.validate().is_err());

        let mut unbalanced = python();
        unbalanced.command = "python3 \"-u".to_string();
        assert!(unbalanced.validate().is_err());

        assert!(python().validate().is_ok());
    }
}
