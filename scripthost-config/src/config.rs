//! The `Config` struct with persistence and path resolution.
//!
//! Covers:
//! - `load` / `save` (YAML file I/O with atomic write)
//! - XDG-style path helpers (`config_path`, `config_dir`)
//! - Scripts folder resolution (`scripts_folder_path`)
//! - Validation of external provider definitions

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::providers::ExternalProviderConfig;
use crate::types::{ConsoleConfig, LogLevel, RunnerConfig};

/// Top-level configuration of scripthost.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// User scripts folder; `~/` is expanded. Defaults to `<data dir>/scripthost/scripts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts_folder: Option<String>,

    /// Log level for the debug log file
    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub console: ConsoleConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    /// External interpreter providers
    #[serde(default)]
    pub providers: Vec<ExternalProviderConfig>,
}

impl Config {
    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        log::info!("Config path: {:?}", config_path);

        if config_path.exists() {
            log::info!("Loading existing config from {:?}", config_path);
            Ok(Self::load_from(&config_path)?)
        } else {
            log::info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            if let Err(e) = config.save() {
                log::error!("Failed to save default config: {}", e);
                return Err(e);
            }
            log::info!("Default config created successfully");
            Ok(config)
        }
    }

    /// Load and validate configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(&contents)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        Ok(self.save_to(&Self::config_path())?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml_ng::to_string(self)?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Get the configuration file path (using XDG convention)
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Get the configuration directory path (using XDG convention)
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            if let Some(config_dir) = dirs::config_dir() {
                config_dir.join("scripthost")
            } else {
                PathBuf::from(".")
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            // ~/.config/scripthost on all Unix platforms, macOS included
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(".config").join("scripthost")
            } else {
                PathBuf::from(".")
            }
        }
    }

    /// Resolved scripts folder, expanding a leading `~/`.
    pub fn scripts_folder_path(&self) -> PathBuf {
        match self.scripts_folder.as_deref().map(str::trim) {
            Some(folder) if !folder.is_empty() => expand_home(folder),
            _ => crate::defaults::scripts_folder(),
        }
    }

    /// Enabled external providers.
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ExternalProviderConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }

    /// Reject empty or duplicate provider ids, bad extensions and empty commands.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for provider in &self.providers {
            provider.validate()?;
            if !seen.insert(provider.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate provider id '{}'",
                    provider.id
                )));
            }
        }
        Ok(())
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
