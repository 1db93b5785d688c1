//! Terminal output for comparison transcripts and the status feed.
//!
//! Transcripts go to stdout; events, stats and diagnostics go to stderr so
//! they can be filtered separately.

use crate::agent::RunOutcome;
use crate::compare::ChatColumn;
use crate::error::AgentError;
use crate::events::{BusStats, LifecycleStatus, StatusEvent, SystemLevel};
use crate::settings::{ModelSettings, PromptSlot};
use crate::textutil::{truncate_single_line, truncate_with_suffix_by_chars};
use crate::types::Role;
use crossterm::style::{Color, Stylize};

const INDENT: &str = "  ";
const ARGS_PREVIEW_CHARS: usize = 80;
const ERROR_PREVIEW_CHARS: usize = 160;
const PROMPT_PREVIEW_CHARS: usize = 60;

/// One-line plain description of an event.
pub fn describe_event(event: &StatusEvent) -> String {
    match event {
        StatusEvent::ApiRequest(e) => match e.status {
            LifecycleStatus::Started => format!(
                "api_request started {} ({} messages, temperature {}, top_p {})",
                e.model, e.message_count, e.settings.temperature, e.settings.top_p
            ),
            LifecycleStatus::Completed => {
                let mut line = format!(
                    "api_request completed {} in {}ms",
                    e.model,
                    e.duration_ms.unwrap_or(0)
                );
                if let Some(tokens) = e.tokens {
                    line.push_str(&format!(" ({} tokens)", tokens.total_tokens));
                }
                line
            }
            LifecycleStatus::Failed => format!(
                "api_request failed {} in {}ms: {}",
                e.model,
                e.duration_ms.unwrap_or(0),
                truncate_single_line(e.error.as_deref().unwrap_or("unknown error"), ERROR_PREVIEW_CHARS)
            ),
        },
        StatusEvent::ToolCall(e) => match e.status {
            LifecycleStatus::Started => format!(
                "tool_call started {}({}) [{}]",
                e.tool_name,
                truncate_single_line(&e.arguments.to_string(), ARGS_PREVIEW_CHARS),
                e.call_id
            ),
            LifecycleStatus::Completed => format!(
                "tool_call completed {} in {}ms [{}]",
                e.tool_name,
                e.duration_ms.unwrap_or(0),
                e.call_id
            ),
            LifecycleStatus::Failed => format!(
                "tool_call failed {} [{}]: {}",
                e.tool_name,
                e.call_id,
                truncate_single_line(e.error.as_deref().unwrap_or("unknown error"), ERROR_PREVIEW_CHARS)
            ),
        },
        StatusEvent::Stream(e) => {
            let state = if e.is_complete { "complete" } else { "partial" };
            format!("stream {state} ({} chars)", e.content.chars().count())
        }
        StatusEvent::System(e) => {
            let level = match e.level {
                SystemLevel::Info => "info",
                SystemLevel::Warn => "warn",
                SystemLevel::Error => "error",
            };
            format!("system {level}: {}", e.message)
        }
    }
}

fn event_color(event: &StatusEvent) -> Color {
    match event {
        StatusEvent::System(e) => match e.level {
            SystemLevel::Info => Color::Grey,
            SystemLevel::Warn => Color::Yellow,
            SystemLevel::Error => Color::Red,
        },
        StatusEvent::Stream(_) => Color::Magenta,
        other => match other.status() {
            Some(LifecycleStatus::Completed) => Color::Green,
            Some(LifecycleStatus::Failed) => Color::Red,
            _ => Color::Cyan,
        },
    }
}

fn slot_color(slot: PromptSlot) -> Color {
    match slot {
        PromptSlot::A => Color::Blue,
        PromptSlot::B => Color::Green,
    }
}

/// Stateless terminal renderer.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Print one status event line (to stderr).
    pub fn event(&self, event: &StatusEvent) {
        let line = describe_event(event);
        if self.color {
            let color = event_color(event);
            eprintln!("{INDENT}{} {}", "•".with(color), line.with(color));
        } else {
            eprintln!("{INDENT}- {line}");
        }
    }

    /// Print a column's transcript and error (to stdout).
    pub fn column(&self, column: &ChatColumn) {
        let title = format!("── {} ──", column.slot().label());
        if self.color {
            println!("{}", title.with(slot_color(column.slot())).bold());
        } else {
            println!("{title}");
        }
        for message in column.messages() {
            let label = match message.role {
                Role::User => "you",
                Role::Assistant => "assistant",
                Role::System => "system",
                Role::Tool => "tool",
            };
            if self.color {
                println!("{} {}", format!("{label}:").bold(), message.content_text());
            } else {
                println!("{label}: {}", message.content_text());
            }
        }
        if let Some(error) = column.error() {
            self.error(error);
        }
        println!();
    }

    /// Print the latest reply of one column (to stdout).
    pub fn reply(&self, slot: PromptSlot, outcome: &Result<RunOutcome, AgentError>) {
        let title = format!("[{}]", slot.label());
        if self.color {
            println!("{}", title.with(slot_color(slot)).bold());
        } else {
            println!("{title}");
        }
        match outcome {
            Ok(run) => {
                if run.content.is_empty() {
                    println!("(no reply)");
                } else {
                    println!("{}", run.content);
                }
                if run.capped {
                    self.warn(&format!(
                        "stopped after {} iterations without a final answer",
                        run.iterations
                    ));
                }
            }
            Err(err) => self.error(&err.to_string()),
        }
        println!();
    }

    pub fn stats(&self, stats: &BusStats) {
        self.section("events");
        self.field("total", &stats.total_events.to_string());
        self.field("api requests", &stats.api_requests.to_string());
        self.field("tool calls", &stats.tool_calls.to_string());
        self.field("errors", &stats.errors.to_string());
        self.field(
            "avg response",
            &format!("{:.0}ms", stats.avg_response_time_ms),
        );
    }

    /// Print model settings with the key masked, plus prompt previews.
    pub fn settings(&self, model: &ModelSettings, prompts: &[(PromptSlot, String)]) {
        self.section("model");
        self.field("api url", &model.api_url);
        self.field("api key", &mask_key(&model.api_key));
        self.field("model", &model.model_name);
        self.field("temperature", &model.temperature.to_string());
        self.field("top_p", &model.top_p.to_string());
        self.section("prompts");
        for (slot, prompt) in prompts {
            let preview = truncate_single_line(prompt, PROMPT_PREVIEW_CHARS);
            self.field(slot.label(), &preview);
        }
    }

    pub fn section(&self, title: &str) {
        if self.color {
            eprintln!("{} {}", "•".with(Color::DarkGrey), title.bold());
        } else {
            eprintln!("{title}:");
        }
    }

    pub fn field(&self, key: &str, value: &str) {
        if self.color {
            eprintln!("{INDENT}{} {value}", format!("{key}:").with(Color::DarkGrey));
        } else {
            eprintln!("{INDENT}{key}: {value}");
        }
    }

    pub fn warn(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", "warning:".with(Color::Yellow).bold());
        } else {
            eprintln!("warning: {msg}");
        }
    }

    pub fn error(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", "error:".with(Color::Red).bold());
        } else {
            eprintln!("error: {msg}");
        }
    }
}

/// Show only the first and last few characters of a key.
pub fn mask_key(key: &str) -> String {
    let key = key.trim();
    let count = key.chars().count();
    if count == 0 {
        return "(not set)".to_string();
    }
    if count <= 8 {
        return "*".repeat(count);
    }
    let head = truncate_with_suffix_by_chars(key, 3, "");
    let tail: String = key.chars().skip(count - 4).collect();
    format!("{head}…{tail}")
}
