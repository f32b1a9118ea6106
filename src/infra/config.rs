//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! The backend base URL can additionally be overridden with the
//! BACKEND_URL environment variable, regardless of where the rest of the
//! configuration came from.

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BackendSection {
    /// Base URL of the simulator backend
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout for single request/response calls (connect, BTS fetch).
    /// Streaming calls are only bounded by their connect timeout.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UiSection {
    /// Frame cadence of the panel event loop
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_tick_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExportSection {
    /// Directory CSV exports are written to
    #[serde(default = "default_export_dir")]
    pub dir: String,
}

fn default_export_dir() -> String {
    "export".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub ui: UiSection,
    #[serde(default)]
    pub export: ExportSection,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    base_url: String,
    request_timeout_ms: u64,
    connect_timeout_ms: u64,
    tick_ms: u64,
    export_dir: String,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            tick_ms: default_tick_ms(),
            export_dir: default_export_dir(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from an explicit argument or environment
    pub fn resolve_config_path(explicit: Option<&str>) -> String {
        if let Some(path) = explicit {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file. Does not apply env overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            base_url: toml_config.backend.base_url,
            request_timeout_ms: toml_config.backend.request_timeout_ms,
            connect_timeout_ms: toml_config.backend.connect_timeout_ms,
            tick_ms: toml_config.ui.tick_ms,
            export_dir: toml_config.export.dir,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to
    /// defaults, then applies environment overrides either way
    pub fn load_from_path(path: &str) -> Self {
        let config = match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        };
        config.apply_env_overrides()
    }

    /// Apply environment overrides (BACKEND_URL)
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("BACKEND_URL") {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
        self
    }

    // Getters for all config fields
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout_ms(&self) -> u64 {
        self.request_timeout_ms
    }

    pub fn connect_timeout_ms(&self) -> u64 {
        self.connect_timeout_ms
    }

    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    pub fn export_dir(&self) -> &str {
        &self.export_dir
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for explicit base URL overrides (CLI flag, tests)
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}
