//! `/chat/completions` request helper.

use crate::error::ApiError;
use crate::types::{ChatRequest, ChatResponse};

const COMPLETIONS_PATH: &str = "/chat/completions";

/// Resolve the endpoint URL from a configured API URL.
///
/// A URL already ending in `/chat/completions` is used as-is; anything else
/// is treated as a base URL.
pub fn completions_url(api_url: &str) -> String {
    let trimmed = api_url.trim().trim_end_matches('/');
    if trimmed.ends_with(COMPLETIONS_PATH) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{COMPLETIONS_PATH}")
    }
}

/// Send one request and parse the chat response payload.
pub(crate) async fn request(
    http: &reqwest::Client,
    url: &str,
    request: &ChatRequest,
    api_key: &str,
) -> Result<ChatResponse, ApiError> {
    let mut req = http.post(url).json(request);
    if !api_key.trim().is_empty() {
        req = req.bearer_auth(api_key.trim());
    }

    let response = req.send().await?;
    if !response.status().is_success() {
        let code = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status { code, body });
    }

    let text = response.text().await?;
    serde_json::from_str::<ChatResponse>(&text)
        .map_err(|e| ApiError::InvalidResponse(format!("invalid JSON response: {e}")))
}
