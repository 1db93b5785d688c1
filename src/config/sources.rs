//! Config-file source discovery and well-known paths.
//!
//! Source order: explicit path > `./duet.toml` > global file > built-in
//! defaults.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::defaults::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_CONFIG_TEMPLATE, SETTINGS_FILE_NAME,
};

/// Read config text from the highest-precedence available source.
///
/// Returns the text and its path, or empty text and `None` when no file
/// exists.
pub(super) fn read_config_text_with_sources<FRead, FRoot>(
    path_override: Option<&str>,
    read_file: &FRead,
    config_root: &FRoot,
) -> Result<(String, Option<PathBuf>), ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FRoot: Fn() -> Option<PathBuf>,
{
    // An explicit path must exist.
    if let Some(p) = path_override {
        let path = PathBuf::from(p);
        let text = read_file(&path)?;
        return Ok((text, Some(path)));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if let Ok(text) = read_file(&local) {
        return Ok((text, Some(local)));
    }
    if let Some(dir) = config_root() {
        let global = global_config_path_in(dir);
        if let Ok(text) = read_file(&global) {
            return Ok((text, Some(global)));
        }
    }

    Ok((String::new(), None))
}

/// User config root: `$XDG_CONFIG_HOME`, else `~/.config`, else the
/// platform config dir.
pub fn config_root_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .or_else(dirs::config_dir)
}

pub(super) fn global_config_path_in(root: PathBuf) -> PathBuf {
    root.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

pub(super) fn default_settings_path_in(root: PathBuf) -> PathBuf {
    root.join(CONFIG_DIR_NAME).join(SETTINGS_FILE_NAME)
}

/// Default per-user config path (`~/.config/duet/duet.toml`).
pub fn default_global_config_path() -> Option<PathBuf> {
    config_root_dir().map(global_config_path_in)
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Outcome of writing the default config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigInitResult {
    Created { path: PathBuf },
    AlreadyExists { path: PathBuf },
    Overwritten { path: PathBuf, backup_path: PathBuf },
}

/// Write the commented default config to `path`.
///
/// Without `force` an existing file is left alone. With `force` it is first
/// copied to `<name>.bak` next to it.
pub fn write_default_config_at(path: &Path, force: bool) -> Result<ConfigInitResult, ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    if path.exists() {
        if !force {
            return Ok(ConfigInitResult::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        let mut backup = path.as_os_str().to_owned();
        backup.push(".bak");
        let backup_path = PathBuf::from(backup);
        std::fs::copy(path, &backup_path)?;
        std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
        return Ok(ConfigInitResult::Overwritten {
            path: path.to_path_buf(),
            backup_path,
        });
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
    Ok(ConfigInitResult::Created {
        path: path.to_path_buf(),
    })
}
