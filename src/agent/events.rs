//! Agent telemetry plumbing.
//!
//! Builds status events for the run lifecycle and tool dispatch so the main
//! loop only deals with request/tool flow.

use super::Agent;
use crate::events::{
    new_event_id, now_unix_millis, ApiRequestEvent, EventKind, LifecycleStatus, RequestSettings,
    StatusEvent, SystemLevel, ToolCallEvent,
};
use crate::tools::ToolOutcome;
use crate::types::{ToolCall, Usage};
use serde_json::Value;
use std::time::Duration;

impl Agent {
    fn api_request_event(
        &self,
        message_count: usize,
        status: LifecycleStatus,
        duration: Option<Duration>,
    ) -> ApiRequestEvent {
        ApiRequestEvent {
            id: new_event_id(EventKind::ApiRequest),
            timestamp_ms: now_unix_millis(),
            model: self.model.model_name.clone(),
            message_count,
            settings: RequestSettings {
                temperature: self.model.temperature,
                top_p: self.model.top_p,
            },
            status,
            duration_ms: duration.map(|d| d.as_millis() as u64),
            error: None,
            tokens: None,
        }
    }

    pub(super) fn emit_request_started(&self, message_count: usize) {
        let event = self.api_request_event(message_count, LifecycleStatus::Started, None);
        self.events.emit(StatusEvent::ApiRequest(event));
    }

    pub(super) fn emit_request_completed(
        &self,
        message_count: usize,
        elapsed: Duration,
        tokens: Option<Usage>,
    ) {
        let mut event =
            self.api_request_event(message_count, LifecycleStatus::Completed, Some(elapsed));
        event.tokens = tokens;
        self.events.emit(StatusEvent::ApiRequest(event));
    }

    pub(super) fn emit_request_failed(&self, message_count: usize, elapsed: Duration, error: String) {
        let mut event =
            self.api_request_event(message_count, LifecycleStatus::Failed, Some(elapsed));
        event.error = Some(error);
        self.events.emit(StatusEvent::ApiRequest(event));
    }

    pub(super) fn emit_tool_started(&self, call: &ToolCall, arguments: Value) {
        self.events.emit(StatusEvent::ToolCall(ToolCallEvent {
            id: new_event_id(EventKind::ToolCall),
            timestamp_ms: now_unix_millis(),
            call_id: call.id.clone(),
            tool_name: call.function.name.clone(),
            arguments,
            status: LifecycleStatus::Started,
            duration_ms: None,
            result: None,
            error: None,
        }));
    }

    /// `completed` when the tool succeeded, `failed` otherwise.
    pub(super) fn emit_tool_finished(&self, outcome: &ToolOutcome) {
        let status = if outcome.succeeded() {
            LifecycleStatus::Completed
        } else {
            LifecycleStatus::Failed
        };
        self.events.emit(StatusEvent::ToolCall(ToolCallEvent {
            id: new_event_id(EventKind::ToolCall),
            timestamp_ms: now_unix_millis(),
            call_id: outcome.call_id.clone(),
            tool_name: outcome.tool_name.clone(),
            arguments: Value::Object(outcome.arguments.clone()),
            status,
            duration_ms: Some(outcome.duration_ms),
            result: Some(outcome.result.clone()),
            error: outcome.result.error.clone(),
        }));
    }

    pub(super) fn emit_iteration_cap(&self, iterations: usize) {
        self.events.emit(StatusEvent::system(
            SystemLevel::Warn,
            format!("reached the iteration limit ({iterations}) without a final answer"),
        ));
    }

    pub(super) fn emit_stream_complete(&self, content: &str) {
        self.events.emit(StatusEvent::stream(content, true));
    }
}
