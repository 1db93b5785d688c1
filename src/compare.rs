//! Side-by-side comparison of two system prompts.
//!
//! A [`Comparison`] owns one transcript column per prompt slot. Sending a
//! message appends the user turn to both columns, runs both orchestrations
//! concurrently on the current task, and streams each answer into its own
//! assistant placeholder.

use crate::agent::{Agent, RunOutcome};
use crate::error::AgentError;
use crate::settings::PromptSlot;
use crate::types::{Message, Role};
use std::sync::Mutex;
use tracing::{info, warn};

/// Greeting that seeds a fresh column.
pub fn greeting(slot: PromptSlot) -> &'static str {
    match slot {
        PromptSlot::A => "你好！我是使用提示词A的AI助手，有什么可以帮助你的吗？",
        PromptSlot::B => "你好！我是使用提示词B的AI助手，有什么可以帮助你的吗？",
    }
}

/// One transcript column.
#[derive(Debug, Clone)]
pub struct ChatColumn {
    slot: PromptSlot,
    messages: Vec<Message>,
    error: Option<String>,
}

impl ChatColumn {
    fn new(slot: PromptSlot) -> Self {
        Self {
            slot,
            messages: vec![Message::assistant(greeting(slot))],
            error: None,
        }
    }

    pub fn slot(&self) -> PromptSlot {
        self.slot
    }

    /// Visible transcript, greeting first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Error from the last send, if it failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn reset(&mut self) {
        *self = Self::new(self.slot);
    }

    /// Append the user turn and an empty placeholder; return the history to
    /// send (everything up to and including the user turn).
    fn begin_turn(&mut self, user: Message) -> Vec<Message> {
        self.error = None;
        self.messages.push(user);
        let history = self.messages.clone();
        self.messages.push(Message::assistant(""));
        history
    }

    fn append_chunk(&mut self, chunk: &str) {
        if let Some(placeholder) = self.messages.last_mut() {
            placeholder
                .content
                .get_or_insert_with(String::new)
                .push_str(chunk);
        }
    }

    /// Drop the placeholder if nothing was streamed into it.
    fn drop_empty_placeholder(&mut self) {
        let empty = self
            .messages
            .last()
            .is_some_and(|m| m.role == Role::Assistant && m.content_text().is_empty());
        if empty {
            self.messages.pop();
        }
    }

    fn finish_turn(&mut self, result: &Result<RunOutcome, AgentError>) {
        match result {
            Ok(outcome) => {
                if outcome.capped {
                    warn!(slot = self.slot.label(), "turn ended at the iteration cap");
                }
            }
            Err(err) => self.error = Some(err.to_string()),
        }
        self.drop_empty_placeholder();
    }
}

/// Per-column results of one send.
#[derive(Debug)]
pub struct ComparisonReport {
    pub a: Result<RunOutcome, AgentError>,
    pub b: Result<RunOutcome, AgentError>,
}

impl ComparisonReport {
    pub fn get(&self, slot: PromptSlot) -> &Result<RunOutcome, AgentError> {
        match slot {
            PromptSlot::A => &self.a,
            PromptSlot::B => &self.b,
        }
    }
}

/// Two prompts sharing one agent configuration.
pub struct Comparison {
    agent: Agent,
    prompts: [String; 2],
    columns: [ChatColumn; 2],
}

fn index(slot: PromptSlot) -> usize {
    match slot {
        PromptSlot::A => 0,
        PromptSlot::B => 1,
    }
}

impl Comparison {
    pub fn new(agent: Agent, prompt_a: impl Into<String>, prompt_b: impl Into<String>) -> Self {
        Self {
            agent,
            prompts: [prompt_a.into(), prompt_b.into()],
            columns: [ChatColumn::new(PromptSlot::A), ChatColumn::new(PromptSlot::B)],
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn column(&self, slot: PromptSlot) -> &ChatColumn {
        &self.columns[index(slot)]
    }

    pub fn prompt(&self, slot: PromptSlot) -> &str {
        &self.prompts[index(slot)]
    }

    pub fn set_prompt(&mut self, slot: PromptSlot, prompt: impl Into<String>) {
        self.prompts[index(slot)] = prompt.into();
    }

    /// Reset a column to its greeting.
    pub fn clear(&mut self, slot: PromptSlot) {
        self.columns[index(slot)].reset();
    }

    /// Send `input` to both prompts.
    ///
    /// Returns `None` for blank input. Without an API key both columns get
    /// the error and nothing is appended. Otherwise both runs proceed
    /// concurrently; `on_chunk` receives streamed text tagged by slot. A
    /// failed column keeps its user turn, loses its placeholder and records
    /// the error; the other column is unaffected.
    pub async fn send<F>(&mut self, input: &str, on_chunk: F) -> Option<ComparisonReport>
    where
        F: FnMut(PromptSlot, &str) + Send,
    {
        if input.trim().is_empty() {
            return None;
        }
        if !self.agent.model().has_api_key() {
            let message = AgentError::MissingApiKey.to_string();
            for column in &mut self.columns {
                column.error = Some(message.clone());
            }
            return Some(ComparisonReport {
                a: Err(AgentError::MissingApiKey),
                b: Err(AgentError::MissingApiKey),
            });
        }

        info!(chars = input.chars().count(), "sending to both prompts");
        let user = Message::user(input);
        let [column_a, column_b] = &mut self.columns;
        let [prompt_a, prompt_b] = &self.prompts;
        let history_a = column_a.begin_turn(user.clone());
        let history_b = column_b.begin_turn(user);

        let sink = Mutex::new(on_chunk);
        let forward = |slot: PromptSlot, chunk: &str| {
            let mut callback = sink.lock().unwrap_or_else(|p| p.into_inner());
            (&mut *callback)(slot, chunk);
        };
        let mut stream_a = |chunk: &str| {
            column_a.append_chunk(chunk);
            forward(PromptSlot::A, chunk);
        };
        let mut stream_b = |chunk: &str| {
            column_b.append_chunk(chunk);
            forward(PromptSlot::B, chunk);
        };

        let (a, b) = tokio::join!(
            self.agent.run(prompt_a, &history_a, &mut stream_a),
            self.agent.run(prompt_b, &history_b, &mut stream_b),
        );

        let [column_a, column_b] = &mut self.columns;
        column_a.finish_turn(&a);
        column_b.finish_turn(&b);
        Some(ComparisonReport { a, b })
    }
}
