//! Configuration data model.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::{
    DEFAULT_API_TIMEOUT_SECS, DEFAULT_CHUNK_COUNT, DEFAULT_CHUNK_DELAY_MS, DEFAULT_MAX_ITERATIONS,
};
use crate::agent::{RunOptions, StreamOptions};
use crate::settings::ModelSettings;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub agent: AgentConfig,
    pub stream: StreamConfig,
    pub network: NetworkConfig,
    pub settings: SettingsConfig,
    pub display: DisplayConfig,
    /// Values layered over the stored model settings (env vars, CLI flags).
    pub model_overrides: ModelOverrides,
}

impl Config {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_iterations: self.agent.max_iterations,
            stream: StreamOptions {
                chunk_count: self.stream.chunk_count,
                chunk_delay: Duration::from_millis(self.stream.chunk_delay_ms),
            },
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.network.api_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model round-trips allowed per turn.
    pub max_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Simulated streaming of final answers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub chunk_count: usize,
    pub chunk_delay_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_count: DEFAULT_CHUNK_COUNT,
            chunk_delay_ms: DEFAULT_CHUNK_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Timeout for model API requests.
    pub api_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_timeout_secs: DEFAULT_API_TIMEOUT_SECS,
        }
    }
}

/// Location of the persisted settings store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Explicit store path; `~/` is expanded. Defaults under the config dir.
    pub path: Option<String>,
}

impl SettingsConfig {
    pub(super) fn resolved_path(&self, config_root: Option<PathBuf>) -> Option<PathBuf> {
        match self.path.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => Some(super::sources::expand_home(path)),
            None => config_root.map(super::sources::default_settings_path_in),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub color: bool,
    /// Print the live event feed while a comparison runs.
    pub show_events: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: true,
            show_events: true,
        }
    }
}

/// Optional replacements for stored model settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOverrides {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub model_name: Option<String>,
}

impl ModelOverrides {
    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.api_url.is_none() && self.model_name.is_none()
    }

    /// Copy every set override onto `settings`.
    pub fn apply(&self, settings: &mut ModelSettings) {
        if let Some(key) = &self.api_key {
            settings.api_key = key.clone();
        }
        if let Some(url) = &self.api_url {
            settings.api_url = url.clone();
        }
        if let Some(model) = &self.model_name {
            settings.model_name = model.clone();
        }
    }
}

/// Raw `duet.toml` contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileConfig {
    pub agent: AgentConfig,
    pub stream: StreamConfig,
    pub network: NetworkConfig,
    pub settings: SettingsConfig,
    pub display: DisplayConfig,
}

/// Configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// File the config was read from; `None` for built-in defaults.
    pub source: Option<PathBuf>,
    /// Resolved settings store path; `None` when no config dir exists.
    pub settings_path: Option<PathBuf>,
}
