//! Error types for each layer of the harness.
//!
//! Only [`AgentError`] escapes an orchestration run. Tool failures are folded
//! into [`crate::tools::ToolExecutionResult`] values before they reach the
//! conversation, so the model can correct itself within the same run.

use std::fmt;

// ---------------------------------------------------------------------------
// ToolError
// ---------------------------------------------------------------------------

/// Errors raised inside a tool executor.
#[derive(Debug)]
pub enum ToolError {
    /// The model supplied arguments the tool couldn't use.
    InvalidArguments(String),
    /// A resource the tool needs is not available in its execution context.
    MissingResource(String),
    /// The tool ran but encountered a failure.
    ExecutionFailed(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArguments(msg) => write!(f, "invalid arguments: {msg}"),
            Self::MissingResource(key) => write!(f, "unknown resource: {key}"),
            Self::ExecutionFailed(msg) => write!(f, "execution failed: {msg}"),
        }
    }
}

impl std::error::Error for ToolError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading config files or reading/writing the settings store.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Json(e) => write!(f, "json: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// User-facing failure categories for endpoint errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFailureKind {
    /// The endpoint rejected the credential (401).
    InvalidCredentials,
    /// The endpoint is throttling requests (429).
    RateLimited,
    /// The endpoint failed internally (5xx).
    ServerError,
    /// Anything else: transport failures, other statuses, bad payloads.
    Other,
}

/// Errors from the HTTP API layer.
#[derive(Debug)]
pub enum ApiError {
    /// Network / reqwest-level error.
    Http(reqwest::Error),
    /// Non-2xx status from the API.
    Status { code: u16, body: String },
    /// The endpoint answered 2xx with a payload we could not use.
    InvalidResponse(String),
}

impl ApiError {
    /// HTTP status code when the endpoint produced one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidResponse(_) => None,
        }
    }

    /// Classify this error for presentation.
    pub fn failure_kind(&self) -> ApiFailureKind {
        match self.status_code() {
            Some(401) => ApiFailureKind::InvalidCredentials,
            Some(429) => ApiFailureKind::RateLimited,
            Some(code) if (500..=599).contains(&code) => ApiFailureKind::ServerError,
            _ => ApiFailureKind::Other,
        }
    }

    /// Message shown to the user when a run fails on this error.
    pub fn user_message(&self) -> String {
        match self.failure_kind() {
            ApiFailureKind::InvalidCredentials => {
                "Invalid API key, check the key in your model settings".to_string()
            }
            ApiFailureKind::RateLimited => "Too many requests, try again later".to_string(),
            ApiFailureKind::ServerError => {
                "The model server had an internal error, try again later".to_string()
            }
            ApiFailureKind::Other => format!("API call failed: {}", self.detail()),
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Http(e) => e.to_string(),
            Self::Status { code, body } if body.trim().is_empty() => format!("status {code}"),
            Self::Status { code, body } => format!("status {code}: {}", body.trim()),
            Self::InvalidResponse(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "http: {e}"),
            Self::Status { code, body } => write!(f, "status {code}: {body}"),
            Self::InvalidResponse(msg) => write!(f, "invalid response: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e)
    }
}

// ---------------------------------------------------------------------------
// AgentError
// ---------------------------------------------------------------------------

/// Hard failures of one orchestration run.
#[derive(Debug)]
pub enum AgentError {
    Config(ConfigError),
    /// No API key configured; raised before any network call.
    MissingApiKey,
    Api(ApiError),
    /// Model returned no choices in the response.
    EmptyResponse,
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::MissingApiKey => write!(
                f,
                "API key is not configured, set it with `duet settings set-model --api-key`"
            ),
            Self::Api(e) => write!(f, "{}", e.user_message()),
            Self::EmptyResponse => write!(f, "API call failed: model returned empty response"),
        }
    }
}

impl std::error::Error for AgentError {}

impl From<ConfigError> for AgentError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ApiError> for AgentError {
    fn from(e: ApiError) -> Self {
        Self::Api(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ApiError {
        ApiError::Status {
            code,
            body: "{\"error\":\"x\"}".into(),
        }
    }

    #[test]
    fn tool_error_display() {
        assert_eq!(
            ToolError::InvalidArguments("name is required".into()).to_string(),
            "invalid arguments: name is required"
        );
        assert_eq!(
            ToolError::MissingResource("charactersData".into()).to_string(),
            "unknown resource: charactersData"
        );
    }

    #[test]
    fn api_errors_classify_by_status() {
        assert_eq!(status(401).failure_kind(), ApiFailureKind::InvalidCredentials);
        assert_eq!(status(429).failure_kind(), ApiFailureKind::RateLimited);
        assert_eq!(status(500).failure_kind(), ApiFailureKind::ServerError);
        assert_eq!(status(503).failure_kind(), ApiFailureKind::ServerError);
        assert_eq!(status(404).failure_kind(), ApiFailureKind::Other);
        assert_eq!(
            ApiError::InvalidResponse("bad".into()).failure_kind(),
            ApiFailureKind::Other
        );
    }

    #[test]
    fn generic_failure_message_carries_detail() {
        let msg = status(404).user_message();
        assert!(msg.starts_with("API call failed:"), "got: {msg}");
        assert!(msg.contains("404"));
    }

    #[test]
    fn agent_error_uses_classified_api_message() {
        let e = AgentError::from(status(429));
        assert_eq!(e.to_string(), "Too many requests, try again later");
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e = ConfigError::from(io_err);
        let s = e.to_string();
        assert!(s.starts_with("io:"), "got: {s}");
        assert!(s.contains("file not found"));
    }

    #[test]
    fn config_error_from_toml() {
        let toml_err: toml::de::Error = toml::from_str::<toml::Value>("x = [unclosed").unwrap_err();
        let e = ConfigError::from(toml_err);
        assert!(e.to_string().starts_with("toml:"));
    }

    #[test]
    fn config_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(ConfigError::from(json_err).to_string().starts_with("json:"));
    }
}
