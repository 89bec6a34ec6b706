//! Configuration loading.
//!
//! Settings come from `<root>/.reducto.json`, falling back to
//! `<config dir>/reducto/config.json`, falling back to defaults. Every field
//! is optional in the file. CLI flags are applied on top by the caller.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Per-repository config file name
pub const PROJECT_CONFIG_FILE: &str = ".reducto.json";

/// Default engine port on localhost
pub const DEFAULT_ENGINE_PORT: u16 = 8765;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub runner: RunnerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub port: u16,
    pub startup_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
    /// Per-request timeout for analysis calls
    pub request_timeout_secs: u64,
    /// Searched for the engine package before the executable's directories
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_dirs: Vec<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_ENGINE_PORT,
            startup_timeout_secs: 30,
            shutdown_timeout_secs: 5,
            request_timeout_secs: 600,
            search_dirs: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Command runner settings.
///
/// The `*_command` fields replace the command the project classifier would
/// otherwise pick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub timeout_secs: u64,
    pub test_command: Option<Vec<String>>,
    pub lint_command: Option<Vec<String>>,
    pub build_command: Option<Vec<String>>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            test_command: None,
            lint_command: None,
            build_command: None,
        }
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration for the repository at `root`.
    pub fn load(root: &Path) -> Result<Self> {
        for path in Self::candidate_paths(root) {
            if path.is_file() {
                debug!("Loading config from {}", path.display());
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn candidate_paths(root: &Path) -> Vec<PathBuf> {
        let mut paths = vec![root.join(PROJECT_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("reducto").join("config.json"));
        }
        paths
    }
}
