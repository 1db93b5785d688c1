//! reqwest-backed [`ModelClient`].

use super::completions;
use super::ModelClient;
use crate::error::ApiError;
use crate::settings::ModelSettings;
use crate::types::{ChatRequest, ChatResponse};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Client for one OpenAI-compatible endpoint.
pub struct ApiClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl ApiClient {
    /// Build a client from model settings; `timeout` bounds each request.
    pub fn new(settings: &ModelSettings, timeout: Duration) -> Self {
        // Fall back to reqwest defaults if builder creation fails for any reason.
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            url: completions::completions_url(&settings.api_url),
            api_key: settings.api_key.trim().to_string(),
        }
    }

    /// Resolved `/chat/completions` URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        debug!(
            url = %self.url,
            model = %request.model,
            messages = request.messages.len(),
            "posting chat completion"
        );
        completions::request(&self.http, &self.url, request, &self.api_key).await
    }
}

#[async_trait]
impl ModelClient for ApiClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        ApiClient::chat(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiFailureKind;
    use crate::testsupport::{http_json_response, StubServer};
    use crate::types::Message;
    use tokio::net::TcpListener;

    fn request() -> ChatRequest {
        ChatRequest {
            model: "dummy-model".to_string(),
            messages: vec![Message::user("hello")],
            tools: None,
            temperature: Some(0.7),
            top_p: Some(0.9),
        }
    }

    fn settings(base: String) -> ModelSettings {
        ModelSettings {
            api_url: base,
            api_key: "test-key".to_string(),
            ..ModelSettings::default()
        }
    }

    #[tokio::test]
    async fn posts_bearer_request_and_parses_response() {
        let body = r#"{"id":"ok","choices":[{"index":0,"message":{"role":"assistant","content":"done"},"finish_reason":"stop"}]}"#;
        let server = StubServer::start(vec![http_json_response(200, body)]).await;
        let client = ApiClient::new(&settings(server.base_url()), Duration::from_secs(3));
        assert_eq!(client.url(), format!("{}/chat/completions", server.base_url()));

        let response = client.chat(&request()).await.expect("response");
        assert_eq!(response.choices[0].message.content_text(), "done");

        let captured = server.requests().await;
        assert_eq!(captured.len(), 1);
        assert!(captured[0].starts_with("POST /v1/chat/completions"));
        assert!(captured[0].contains("authorization: Bearer test-key")
            || captured[0].contains("Authorization: Bearer test-key"));
        assert!(captured[0].contains("\"top_p\":0.9"));
    }

    #[tokio::test]
    async fn non_success_status_is_classified() {
        let server =
            StubServer::start(vec![http_json_response(401, r#"{"error":"bad key"}"#)]).await;
        let client = ApiClient::new(&settings(server.base_url()), Duration::from_secs(3));
        let err = client.chat(&request()).await.expect_err("401 expected");
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.failure_kind(), ApiFailureKind::InvalidCredentials);
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let server = StubServer::start(vec![http_json_response(200, "not json")]).await;
        let client = ApiClient::new(&settings(server.base_url()), Duration::from_secs(3));
        let err = client.chat(&request()).await.expect_err("parse failure");
        assert!(matches!(err, ApiError::InvalidResponse(_)), "got: {err}");
    }

    #[tokio::test]
    async fn api_client_respects_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept one connection and keep it open so the client must time out.
        let _accept = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.expect("accept");
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let client = ApiClient::new(&settings(format!("http://{addr}")), Duration::from_millis(50));
        let err = client.chat(&request()).await.expect_err("timeout expected");
        match err {
            ApiError::Http(inner) => assert!(inner.is_timeout(), "unexpected error: {inner}"),
            other => panic!("expected timeout Http error, got: {other}"),
        }
    }
}
