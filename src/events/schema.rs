//! Status event schema.
//!
//! Every event carries a generated id (`<kind>_<unix-ms>_<random>`) and a
//! wall-clock timestamp in unix milliseconds.

use crate::tools::ToolExecutionResult;
use crate::types::Usage;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Event family, also the subscription key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ApiRequest,
    ToolCall,
    Stream,
    System,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiRequest => "api_request",
            Self::ToolCall => "tool_call",
            Self::Stream => "stream",
            Self::System => "system",
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            Self::ApiRequest => "api",
            Self::ToolCall => "tool",
            Self::Stream => "stream",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Started,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SystemLevel {
    Info,
    Warn,
    Error,
}

/// Sampling settings snapshot attached to request events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RequestSettings {
    pub temperature: f64,
    pub top_p: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiRequestEvent {
    pub id: String,
    pub timestamp_ms: u64,
    pub model: String,
    pub message_count: usize,
    pub settings: RequestSettings,
    pub status: LifecycleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallEvent {
    pub id: String,
    pub timestamp_ms: u64,
    /// Id of the model tool call this event tracks.
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
    pub status: LifecycleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolExecutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamEvent {
    pub id: String,
    pub timestamp_ms: u64,
    pub content: String,
    pub is_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemEvent {
    pub id: String,
    pub timestamp_ms: u64,
    pub level: SystemLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// One lifecycle transition published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusEvent {
    ApiRequest(ApiRequestEvent),
    ToolCall(ToolCallEvent),
    Stream(StreamEvent),
    System(SystemEvent),
}

impl StatusEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ApiRequest(_) => EventKind::ApiRequest,
            Self::ToolCall(_) => EventKind::ToolCall,
            Self::Stream(_) => EventKind::Stream,
            Self::System(_) => EventKind::System,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::ApiRequest(e) => &e.id,
            Self::ToolCall(e) => &e.id,
            Self::Stream(e) => &e.id,
            Self::System(e) => &e.id,
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Self::ApiRequest(e) => e.timestamp_ms,
            Self::ToolCall(e) => e.timestamp_ms,
            Self::Stream(e) => e.timestamp_ms,
            Self::System(e) => e.timestamp_ms,
        }
    }

    pub fn status(&self) -> Option<LifecycleStatus> {
        match self {
            Self::ApiRequest(e) => Some(e.status),
            Self::ToolCall(e) => Some(e.status),
            Self::Stream(_) | Self::System(_) => None,
        }
    }

    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            Self::ApiRequest(e) => e.duration_ms,
            Self::ToolCall(e) => e.duration_ms,
            Self::Stream(_) | Self::System(_) => None,
        }
    }

    /// System notice with a fresh id.
    pub fn system(level: SystemLevel, message: impl Into<String>) -> Self {
        Self::System(SystemEvent {
            id: new_event_id(EventKind::System),
            timestamp_ms: now_unix_millis(),
            level,
            message: message.into(),
            details: None,
        })
    }

    /// Stream notice with a fresh id.
    pub fn stream(content: impl Into<String>, is_complete: bool) -> Self {
        Self::Stream(StreamEvent {
            id: new_event_id(EventKind::Stream),
            timestamp_ms: now_unix_millis(),
            content: content.into(),
            is_complete,
        })
    }
}

/// Generate an event id such as `api_1718000000000_k3j9x0a2b`.
pub fn new_event_id(kind: EventKind) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    format!("{}_{}_{suffix}", kind.id_prefix(), now_unix_millis())
}

/// Current wall-clock time in unix milliseconds.
pub fn now_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
