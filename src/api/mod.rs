//! HTTP client for OpenAI-compatible `/chat/completions` endpoints.
//!
//! The agent loop talks to [`ModelClient`]; production code uses
//! [`ApiClient`], tests substitute scripted clients.

use crate::error::ApiError;
use crate::types::{ChatRequest, ChatResponse};
use async_trait::async_trait;

mod client;
mod completions;

pub use client::ApiClient;
pub use completions::completions_url;

/// Minimal model API interface used by the agent loop.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;
}
