//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`DUET_API_KEY`, `DUET_BASE_URL`, `DUET_MODEL`,
//!    `DUET_API_TIMEOUT_SECS`)
//! 2. TOML file specified via `--config`
//! 3. `./duet.toml` in the current directory
//! 4. `$XDG_CONFIG_HOME/duet/duet.toml` (or `~/.config/duet/duet.toml`)
//! 5. Built-in defaults
//!
//! Model connection settings and prompts are not part of this file; they
//! live in the settings store (see [`crate::settings`]). The env overrides
//! for them are carried in [`Config::model_overrides`].

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

mod defaults;
mod env;
mod sources;
mod types;

pub use defaults::DEFAULT_CONFIG_TEMPLATE;
pub use sources::{
    config_root_dir, default_global_config_path, write_default_config_at, ConfigInitResult,
};
pub use types::{
    AgentConfig, Config, DisplayConfig, LoadedConfig, ModelOverrides, NetworkConfig,
    SettingsConfig, StreamConfig,
};

use env::apply_env_overrides;
use sources::read_config_text_with_sources;
use types::FileConfig;

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from `--config`).
pub fn load_config(path_override: Option<&str>) -> Result<LoadedConfig, ConfigError> {
    load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )
}

fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<LoadedConfig, ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let (text, source) = read_config_text_with_sources(path_override, &read_file, &config_root)?;
    let parsed: FileConfig = toml::from_str(&text)?;
    let settings_path = parsed.settings.resolved_path(config_root());

    let mut config = Config {
        agent: parsed.agent,
        stream: parsed.stream,
        network: parsed.network,
        settings: parsed.settings,
        display: parsed.display,
        model_overrides: ModelOverrides::default(),
    };
    apply_env_overrides(&mut config, &env_lookup)?;
    validate(&config)?;

    Ok(LoadedConfig {
        config,
        source,
        settings_path,
    })
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.agent.max_iterations == 0 {
        return Err(ConfigError::Invalid(
            "agent.max_iterations must be at least 1".into(),
        ));
    }
    if config.stream.chunk_count == 0 {
        return Err(ConfigError::Invalid(
            "stream.chunk_count must be at least 1".into(),
        ));
    }
    if config.network.api_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "network.api_timeout_secs must be at least 1".into(),
        ));
    }
    Ok(())
}
