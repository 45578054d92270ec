//! Integration tests for configuration loading, validation and provider setup.

use std::fs;

use scripthost::config::{Config, ConfigError, LogLevel};
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
scripts_folder: /opt/scripts
log_level: info
console:
  show_on_run: false
  color: false
runner:
  serialize_runs: false
  max_operations: 50000
providers:
  - id: python
    name: Python 3
    extensions: [".py"]
    command: python3 -u
    args: ["-"]
    env_vars:
      PYTHONIOENCODING: utf-8
  - id: node
    extensions: [".js", ".mjs"]
    command: node
    enabled: false
    template: "console.log('new');\n"
"#;

fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.yaml");
    fs::write(&path, contents).unwrap();
    (temp, path)
}

#[test]
fn test_full_config_loads() {
    let (_temp, path) = write_config(FULL_CONFIG);
    let config = Config::load_from(&path).unwrap();

    assert_eq!(config.scripts_folder.as_deref(), Some("/opt/scripts"));
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Info);
    assert!(!config.console.show_on_run);
    assert!(!config.console.clear_on_run);
    assert!(!config.console.color);
    assert!(!config.runner.serialize_runs);
    assert_eq!(config.runner.max_operations, 50_000);

    assert_eq!(config.providers.len(), 2);
    let python = &config.providers[0];
    assert_eq!(python.display_name(), "Python 3");
    assert!(python.enabled);
    assert_eq!(python.env_vars["PYTHONIOENCODING"], "utf-8");
    let (program, args) = python.command_line().unwrap();
    assert_eq!(program, "python3");
    assert_eq!(args, vec!["-u", "-"]);

    let enabled: Vec<&str> = config.enabled_providers().map(|p| p.id.as_str()).collect();
    assert_eq!(enabled, vec!["python"]);
    assert_eq!(
        config.providers[1].template.as_deref(),
        Some("console.log('new');\n")
    );
}

#[test]
fn test_missing_sections_use_defaults() {
    let (_temp, path) = write_config("log_level: trace\n");
    let config = Config::load_from(&path).unwrap();

    assert_eq!(config.log_level, LogLevel::Trace);
    assert!(config.console.show_on_run);
    assert!(config.console.color);
    assert!(config.runner.serialize_runs);
    assert_eq!(config.runner.max_operations, 0);
    assert!(config.providers.is_empty());
}

#[test]
fn test_provider_without_dot_extension_is_rejected() {
    let (_temp, path) = write_config(
        "providers:\n  - id: py\n    extensions: [\"py\"]\n    command: python3\n",
    );
    let err = Config::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(err.to_string().contains("must start with '.'"));
}

#[test]
fn test_provider_with_empty_command_is_rejected() {
    let (_temp, path) = write_config(
        "providers:\n  - id: py\n    extensions: [\".py\"]\n    command: \"\"\n",
    );
    assert!(matches!(
        Config::load_from(&path),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_unknown_log_level_is_parse_error() {
    let (_temp, path) = write_config("log_level: loud\n");
    assert!(matches!(
        Config::load_from(&path),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_round_trip_through_save() {
    let (_temp, path) = write_config(FULL_CONFIG);
    let config = Config::load_from(&path).unwrap();

    let saved = path.with_file_name("saved.yaml");
    config.save_to(&saved).unwrap();

    assert_eq!(Config::load_from(&saved).unwrap(), config);
}

#[test]
fn test_log_levels_are_ordered_by_verbosity() {
    let filters: Vec<log::LevelFilter> = LogLevel::all()
        .iter()
        .map(|level| level.to_level_filter())
        .collect();
    let mut sorted = filters.clone();
    sorted.sort();
    assert_eq!(filters, sorted);
}
