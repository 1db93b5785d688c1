//! Core orchestration loop.
//!
//! An [`Agent`] runs one user turn against the model: it submits history
//! plus tool definitions, executes requested tools and feeds the results
//! back, until the model produces a final text reply or the iteration cap is
//! reached. Final replies are delivered in simulated stream chunks. Lifecycle
//! telemetry goes to the shared [`EventBus`].

use crate::api::{ApiClient, ModelClient};
use crate::error::AgentError;
use crate::events::EventBus;
use crate::settings::ModelSettings;
use crate::tools::{character, parse_arguments, ExecutionContext, ToolOutcome, ToolRegistry};
use crate::types::{ChatRequest, Message, ToolCall, Usage};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

mod events;
pub mod intent;
pub mod stream;

pub use intent::{IntentChain, IntentExtractor, IntentSource, ModelReply};
pub use stream::StreamOptions;

pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Loop bounds and streaming behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub max_iterations: usize,
    pub stream: StreamOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            stream: StreamOptions::default(),
        }
    }
}

/// Result of one finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Final reply text; empty when the model said nothing or the cap hit.
    pub content: String,
    pub iterations: usize,
    /// True when the loop stopped at the iteration cap.
    pub capped: bool,
    /// Full history sent to the model, system prompt first.
    pub messages: Vec<Message>,
    /// Token usage summed over all responses that reported it.
    pub usage: Option<Usage>,
}

struct LoopEnd {
    content: String,
    iterations: usize,
    capped: bool,
}

/// Drives conversation turns for one model configuration.
pub struct Agent {
    client: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    events: Arc<EventBus>,
    context: ExecutionContext,
    model: ModelSettings,
    options: RunOptions,
    intents: IntentChain,
}

impl Agent {
    /// Agent talking to the HTTP endpoint in `model`.
    pub fn new(
        model: ModelSettings,
        timeout: Duration,
        tools: Arc<ToolRegistry>,
        events: Arc<EventBus>,
    ) -> Self {
        let client = Arc::new(ApiClient::new(&model, timeout));
        Self::with_client(model, tools, events, client)
    }

    /// Agent with an explicit model client (tests, alternative backends).
    pub fn with_client(
        model: ModelSettings,
        tools: Arc<ToolRegistry>,
        events: Arc<EventBus>,
        client: Arc<dyn ModelClient>,
    ) -> Self {
        Self {
            client,
            tools,
            events,
            context: character::builtin_context(),
            model,
            options: RunOptions::default(),
            intents: IntentChain::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_intents(mut self, intents: IntentChain) -> Self {
        self.intents = intents;
        self
    }

    pub fn model(&self) -> &ModelSettings {
        &self.model
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Run one turn.
    ///
    /// `turns` is the prior conversation ending with the new user message;
    /// the system prompt is prepended. Final text is fed to `on_chunk` in
    /// slices. Only configuration and endpoint failures are returned as
    /// errors; tool problems are fed back to the model.
    pub async fn run(
        &self,
        system_prompt: &str,
        turns: &[Message],
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<RunOutcome, AgentError> {
        if !self.model.has_api_key() {
            return Err(AgentError::MissingApiKey);
        }

        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(Message::system(system_prompt));
        messages.extend_from_slice(turns);

        let started = Instant::now();
        self.emit_request_started(messages.len());
        let mut usage: Option<Usage> = None;

        match self.drive(&mut messages, &mut usage, on_chunk).await {
            Ok(end) => {
                info!(
                    model = %self.model.model_name,
                    iterations = end.iterations,
                    capped = end.capped,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "run completed"
                );
                self.emit_request_completed(messages.len(), started.elapsed(), usage);
                Ok(RunOutcome {
                    content: end.content,
                    iterations: end.iterations,
                    capped: end.capped,
                    messages,
                    usage,
                })
            }
            Err(err) => {
                warn!(model = %self.model.model_name, error = %err, "run failed");
                self.emit_request_failed(messages.len(), started.elapsed(), err.to_string());
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        messages: &mut Vec<Message>,
        usage: &mut Option<Usage>,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<LoopEnd, AgentError> {
        let definitions = (!self.tools.is_empty()).then(|| self.tools.definitions());
        let mut iterations = 0;

        while iterations < self.options.max_iterations {
            iterations += 1;
            let request = ChatRequest {
                model: self.model.model_name.clone(),
                messages: messages.clone(),
                tools: definitions.clone(),
                temperature: Some(self.model.temperature),
                top_p: Some(self.model.top_p),
            };
            debug!(
                iteration = iterations,
                messages = request.messages.len(),
                "requesting model reply"
            );

            let response = self.client.chat(&request).await?;
            if let Some(reported) = &response.usage {
                usage.get_or_insert_with(Usage::default).add(reported);
            }
            let choice = response
                .choices
                .into_iter()
                .next()
                .ok_or(AgentError::EmptyResponse)?;
            debug!(
                iteration = iterations,
                finish_reason = choice.finish_reason.as_deref().unwrap_or("none"),
                "model replied"
            );

            match self.intents.classify(&choice.message) {
                ModelReply::ToolCalls {
                    content, calls, ..
                } => {
                    messages.push(Message::assistant_tool_calls(content, calls.clone()));
                    for outcome in self.dispatch(&calls).await {
                        messages.push(Message::tool_result(
                            outcome.call_id,
                            outcome.result.to_message_content(),
                        ));
                    }
                }
                ModelReply::Content(text) => {
                    stream::deliver(&text, self.options.stream, on_chunk).await;
                    self.emit_stream_complete(&text);
                    return Ok(LoopEnd {
                        content: text,
                        iterations,
                        capped: false,
                    });
                }
                ModelReply::Empty => {
                    debug!(iteration = iterations, "model returned no content");
                    return Ok(LoopEnd {
                        content: String::new(),
                        iterations,
                        capped: false,
                    });
                }
            }
        }

        warn!(
            max_iterations = self.options.max_iterations,
            "iteration cap reached without a final answer"
        );
        self.emit_iteration_cap(iterations);
        Ok(LoopEnd {
            content: String::new(),
            iterations,
            capped: true,
        })
    }

    /// Run every call concurrently; outcomes come back in request order.
    async fn dispatch(&self, calls: &[ToolCall]) -> Vec<ToolOutcome> {
        join_all(calls.iter().map(|call| self.dispatch_one(call))).await
    }

    async fn dispatch_one(&self, call: &ToolCall) -> ToolOutcome {
        let arguments = Value::Object(parse_arguments(&call.function.arguments));
        info!(tool = %call.function.name, call_id = %call.id, "dispatching tool call");
        self.emit_tool_started(call, arguments);
        let outcome = self.tools.execute_call(call, &self.context).await;
        if !outcome.succeeded() {
            debug!(
                tool = %outcome.tool_name,
                error = outcome.result.error.as_deref().unwrap_or(""),
                "tool call failed"
            );
        }
        self.emit_tool_finished(&outcome);
        outcome
    }
}
