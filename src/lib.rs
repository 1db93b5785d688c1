//! duet: compare two system prompts against the same model, side by side.
//!
//! Each message is sent to two conversations that differ only in their
//! system prompt. Both run concurrently through the same tool-calling loop
//! against any OpenAI-compatible chat completions endpoint, and every
//! request and tool invocation is published on a shared event bus.
//!
//! # Quick start
//!
//! ```no_run
//! use duet::agent::Agent;
//! use duet::compare::Comparison;
//! use duet::events::EventBus;
//! use duet::settings::{ModelSettings, PromptSlot};
//! use duet::tools::ToolRegistry;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let model = ModelSettings {
//!     api_key: "sk-...".into(),
//!     ..ModelSettings::default()
//! };
//! let agent = Agent::new(
//!     model,
//!     Duration::from_secs(120),
//!     Arc::new(ToolRegistry::with_builtin_tools()),
//!     Arc::new(EventBus::new()),
//! );
//! let mut comparison = Comparison::new(agent, "Answer briefly.", "Answer in detail.");
//! comparison.send("张三", |_, _| {}).await;
//! println!("{:?}", comparison.column(PromptSlot::A).messages());
//! # }
//! ```

pub mod agent;
pub mod api;
pub mod compare;
pub mod config;
pub mod error;
pub mod events;
pub mod render;
pub mod settings;
#[cfg(test)]
pub mod testsupport;
pub mod textutil;
pub mod tools;
pub mod types;
