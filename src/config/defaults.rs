//! Default configuration constants.

/// Config file name searched locally and under the user config dir.
pub(super) const CONFIG_FILE_NAME: &str = "duet.toml";
/// Directory under the user config root holding duet's files.
pub(super) const CONFIG_DIR_NAME: &str = "duet";
/// Settings store file name inside [`CONFIG_DIR_NAME`].
pub(super) const SETTINGS_FILE_NAME: &str = "settings.json";
/// Default timeout for model API requests.
pub(super) const DEFAULT_API_TIMEOUT_SECS: u64 = 120;
pub(super) const DEFAULT_MAX_ITERATIONS: usize = crate::agent::DEFAULT_MAX_ITERATIONS;
pub(super) const DEFAULT_CHUNK_COUNT: usize = crate::agent::stream::DEFAULT_CHUNK_COUNT;
pub(super) const DEFAULT_CHUNK_DELAY_MS: u64 = 30;

/// Commented template describing every key.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# duet configuration

[agent]
# Model round-trips allowed per turn before giving up.
max_iterations = 5

[stream]
# Simulated streaming of final answers.
chunk_count = 15
chunk_delay_ms = 30

[network]
api_timeout_secs = 120

[settings]
# Where model settings and prompts are stored.
# path = "~/.config/duet/settings.json"

[display]
color = true
show_events = true
"#;
