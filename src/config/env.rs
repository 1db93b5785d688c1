//! Environment overrides (`DUET_*`).

use crate::error::ConfigError;

use super::Config;

pub(super) const API_KEY_ENV: &str = "DUET_API_KEY";
pub(super) const BASE_URL_ENV: &str = "DUET_BASE_URL";
pub(super) const MODEL_ENV: &str = "DUET_MODEL";
pub(super) const API_TIMEOUT_ENV: &str = "DUET_API_TIMEOUT_SECS";

pub(super) fn apply_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(key) = non_empty(env_lookup, API_KEY_ENV) {
        config.model_overrides.api_key = Some(key);
    }
    if let Some(url) = non_empty(env_lookup, BASE_URL_ENV) {
        config.model_overrides.api_url = Some(url);
    }
    if let Some(model) = non_empty(env_lookup, MODEL_ENV) {
        config.model_overrides.model_name = Some(model);
    }
    if let Some(timeout) = non_empty(env_lookup, API_TIMEOUT_ENV) {
        let parsed = timeout.parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid {API_TIMEOUT_ENV} value `{timeout}`: expected positive integer seconds"
            ))
        })?;
        // Zero would mean an immediate timeout.
        config.network.api_timeout_secs = parsed.max(1);
    }
    Ok(())
}

fn non_empty<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
