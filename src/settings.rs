//! Persisted user settings.
//!
//! Settings live in a flat key-value store whose values are JSON text, the
//! same shape a browser's local storage would hold:
//!
//! | key             | value                                           |
//! |-----------------|-------------------------------------------------|
//! | `modelSettings` | `{apiUrl, apiKey, modelName, temperature, topP}` |
//! | `systemPromptA` | prompt text (JSON string)                        |
//! | `systemPromptB` | prompt text (JSON string)                        |
//!
//! Reads never fail the caller: stored fields are merged over defaults and
//! unreadable values fall back to defaults with a warning.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

pub const MODEL_SETTINGS_KEY: &str = "modelSettings";
pub const PROMPT_A_KEY: &str = "systemPromptA";
pub const PROMPT_B_KEY: &str = "systemPromptB";

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL_NAME: &str = "gpt-4";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 0.9;

/// Built-in instruction text for both prompt slots.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"你是一个AI助手，专门使用工具来回答用户问题。
You are an assistant that answers user questions through tools.

## 可用工具 / Available tools
- get_character_info: 查询人物信息数据库 / query the character database
  - 参数 / parameter: name (string) - 人物姓名 / person name
  - 可用人物 / known people: 张三、李四、王五、赵六、孙七

## 使用规则 / Rules
1. 当用户询问任何人物信息时，必须调用 get_character_info 工具。
   Whenever the user asks about a person, you must call get_character_info.
2. 基于工具返回的准确信息回答用户。Answer only from the tool's result.
3. 如果人物不存在，提供可用人物列表。If the person is unknown, list the known people.
4. 禁止直接回答人物相关问题。Never answer questions about people without the tool.

## 响应格式 / Response format
- 保持回答简洁明了 / keep answers short and clear
- 如有错误，提供有用的建议 / on errors, suggest a useful next step"#;

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Key-value store holding JSON-encoded values.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ConfigError>;
    fn remove(&self, key: &str) -> Result<(), ConfigError>;
}

/// In-memory store, used by tests and as a throwaway session store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ConfigError> {
        self.values().remove(key);
        Ok(())
    }
}

/// Store backed by one JSON object file (`{"key": "<json text>", ...}`).
///
/// Each write rewrites the whole file; a missing file reads as empty.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }

    fn update(
        &self,
        apply: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), ConfigError> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut values = self.read_all()?;
        apply(&mut values);
        self.write_all(&values)
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), ConfigError> {
        self.update(|values| {
            values.remove(key);
        })
    }
}

// ---------------------------------------------------------------------------
// Typed settings
// ---------------------------------------------------------------------------

/// Connection and sampling parameters for the model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelSettings {
    pub api_url: String,
    pub api_key: String,
    pub model_name: String,
    pub temperature: f64,
    pub top_p: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }
}

impl ModelSettings {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Reject values outside the ranges the endpoint accepts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("apiUrl cannot be empty".into()));
        }
        if self.model_name.trim().is_empty() {
            return Err(ConfigError::Invalid("modelName cannot be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature {} is outside 0..=2",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigError::Invalid(format!(
                "topP {} is outside 0..=1",
                self.top_p
            )));
        }
        Ok(())
    }
}

/// Which of the two compared prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptSlot {
    A,
    B,
}

impl PromptSlot {
    pub const ALL: [PromptSlot; 2] = [PromptSlot::A, PromptSlot::B];

    pub fn key(self) -> &'static str {
        match self {
            Self::A => PROMPT_A_KEY,
            Self::B => PROMPT_B_KEY,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::A => "Prompt A",
            Self::B => "Prompt B",
        }
    }

    /// Parse `a`/`b` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a" => Some(Self::A),
            "b" => Some(Self::B),
            _ => None,
        }
    }
}

/// Load model settings, merging stored fields over defaults.
pub fn load_model_settings(store: &dyn SettingsStore) -> ModelSettings {
    match store.get(MODEL_SETTINGS_KEY) {
        Ok(Some(raw)) => merge_stored_fields(&raw),
        Ok(None) => ModelSettings::default(),
        Err(err) => {
            warn!(%err, "failed to read model settings; using defaults");
            ModelSettings::default()
        }
    }
}

/// Overlay each stored field onto the defaults on its own, so one
/// mistyped value only resets that field.
fn merge_stored_fields(raw: &str) -> ModelSettings {
    let stored = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) => {
            warn!("stored model settings are not an object; using defaults");
            return ModelSettings::default();
        }
        Err(err) => {
            warn!(%err, "stored model settings are unreadable; using defaults");
            return ModelSettings::default();
        }
    };
    let mut merged = match serde_json::to_value(ModelSettings::default()) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => return ModelSettings::default(),
    };
    for (key, value) in stored {
        let mut candidate = merged.clone();
        candidate.insert(key.clone(), value);
        match serde_json::from_value::<ModelSettings>(serde_json::Value::Object(candidate.clone()))
        {
            Ok(_) => merged = candidate,
            Err(err) => warn!(%err, key = %key, "ignoring unreadable stored setting"),
        }
    }
    serde_json::from_value(serde_json::Value::Object(merged)).unwrap_or_default()
}

pub fn save_model_settings(
    store: &dyn SettingsStore,
    settings: &ModelSettings,
) -> Result<(), ConfigError> {
    settings.validate()?;
    store.set(MODEL_SETTINGS_KEY, &serde_json::to_string(settings)?)
}

/// Load a prompt. Values that aren't JSON strings are taken as raw text.
pub fn load_prompt(store: &dyn SettingsStore, slot: PromptSlot) -> String {
    let raw = match store.get(slot.key()) {
        Ok(Some(raw)) => raw,
        Ok(None) => return DEFAULT_SYSTEM_PROMPT.to_string(),
        Err(err) => {
            warn!(%err, key = slot.key(), "failed to read prompt; using default");
            return DEFAULT_SYSTEM_PROMPT.to_string();
        }
    };
    let text = serde_json::from_str::<String>(&raw).unwrap_or(raw);
    if text.trim().is_empty() {
        DEFAULT_SYSTEM_PROMPT.to_string()
    } else {
        text
    }
}

pub fn save_prompt(
    store: &dyn SettingsStore,
    slot: PromptSlot,
    prompt: &str,
) -> Result<(), ConfigError> {
    if prompt.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "{} cannot be empty",
            slot.key()
        )));
    }
    store.set(slot.key(), &serde_json::to_string(prompt)?)
}

/// Remove every stored setting so defaults apply again.
pub fn reset_settings(store: &dyn SettingsStore) -> Result<(), ConfigError> {
    store.remove(MODEL_SETTINGS_KEY)?;
    for slot in PromptSlot::ALL {
        store.remove(slot.key())?;
    }
    Ok(())
}
