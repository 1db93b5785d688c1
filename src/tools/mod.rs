//! Pluggable tool system.
//!
//! A [`Tool`] pairs its metadata and OpenAI function definition with an async
//! [`ToolExecutor`]. Tools are registered in a [`ToolRegistry`], which the
//! agent loop consults both for the definitions it advertises to the model
//! and for dispatching the calls the model makes.

pub mod character;
pub mod context;

pub use context::ExecutionContext;

use crate::error::ToolError;
use crate::types::{ParameterSchema, ToolCall, ToolDefinition};
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of one tool execution, serialized verbatim into the tool message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Registered tool names, attached when the model asked for an unknown tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_tools: Option<Vec<String>>,
}

impl ToolExecutionResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            available_tools: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            available_tools: None,
        }
    }

    /// Attach diagnostic data to a result (used by failures that help the
    /// model correct its next call).
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// JSON text placed in the tool-role message.
    pub fn to_message_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!("{{\"success\":false,\"error\":\"failed to serialize tool result: {e}\"}}")
        })
    }
}

// ---------------------------------------------------------------------------
// Tool
// ---------------------------------------------------------------------------

/// Executes a tool's behavior against parsed arguments.
///
/// Implementations may return `Err`; [`Tool::invoke`] converts every error
/// (and panic) into a failed [`ToolExecutionResult`].
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        args: &Map<String, Value>,
        context: &ExecutionContext,
    ) -> Result<ToolExecutionResult, ToolError>;
}

/// Descriptive metadata; `name` is the registry key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub version: String,
    pub category: String,
}

/// A registered capability the model can call.
pub struct Tool {
    pub metadata: ToolMetadata,
    pub definition: ToolDefinition,
    executor: Arc<dyn ToolExecutor>,
}

impl Tool {
    pub fn new(
        metadata: ToolMetadata,
        definition: ToolDefinition,
        executor: impl ToolExecutor + 'static,
    ) -> Self {
        Self {
            metadata,
            definition,
            executor: Arc::new(executor),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Run the executor. Never fails: errors and panics become failure results.
    pub async fn invoke(
        &self,
        args: &Map<String, Value>,
        context: &ExecutionContext,
    ) -> ToolExecutionResult {
        let run = AssertUnwindSafe(self.executor.execute(args, context)).catch_unwind();
        match run.await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => ToolExecutionResult::failure(format!(
                "error while running tool {}: {err}",
                self.name()
            )),
            Err(_) => {
                warn!(tool = %self.name(), "tool executor panicked");
                ToolExecutionResult::failure(format!("tool {} crashed while running", self.name()))
            }
        }
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

/// Parse a raw arguments payload. Malformed or non-object JSON degrades to an
/// empty record rather than failing the call.
pub fn parse_arguments(raw: &str) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            debug!(kind = %json_kind(&other), "tool arguments are not an object; using empty record");
            Map::new()
        }
        Err(err) => {
            debug!(%err, "malformed tool arguments; using empty record");
            Map::new()
        }
    }
}

/// Fetch a required string argument: present, a string, and not blank.
/// Returns the trimmed value.
pub fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ToolError::InvalidArguments(format!(
            "missing required parameter: {key}"
        ))),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ToolError::InvalidArguments(
            format!("parameter {key} must not be empty"),
        )),
        Some(Value::String(s)) => Ok(s.trim()),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "parameter {key} must be a string, got {}",
            json_kind(other)
        ))),
    }
}

/// Check every parameter the schema marks as required.
pub fn validate_required(
    schema: &ParameterSchema,
    args: &Map<String, Value>,
) -> Result<(), ToolError> {
    for key in &schema.required {
        let is_string = schema
            .properties
            .get(key)
            .is_some_and(|spec| spec.param_type == "string");
        if is_string {
            required_str(args, key)?;
        } else if matches!(args.get(key), None | Some(Value::Null)) {
            return Err(ToolError::InvalidArguments(format!(
                "missing required parameter: {key}"
            )));
        }
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tool registry
// ---------------------------------------------------------------------------

/// Per-tool summary returned by [`ToolRegistry::stats`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ToolSummary {
    pub name: String,
    pub category: String,
    pub version: String,
}

/// Registry snapshot.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegistryStats {
    pub total: usize,
    pub tools: Vec<ToolSummary>,
}

/// Result of dispatching one model tool call through the registry.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    /// Id of the originating [`ToolCall`].
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Map<String, Value>,
    pub result: ToolExecutionResult,
    pub duration_ms: u64,
}

impl ToolOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.success
    }
}

/// Registry of available tools, keyed by `metadata.name`.
///
/// Iteration follows insertion order; re-registering a name replaces the
/// tool in place.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry with every built-in tool.
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        registry.register(character::character_query_tool());
        registry
    }

    /// Insert a tool. A tool with the same name is replaced (last writer wins).
    pub fn register(&mut self, tool: Tool) {
        let name = tool.name().to_string();
        let tool = Arc::new(tool);
        if let Some(slot) = self.tools.iter_mut().find(|t| t.name() == name) {
            warn!(tool = %name, "tool already registered; overwriting");
            *slot = tool;
        } else {
            info!(tool = %name, description = %tool.metadata.description, "tool registered");
            self.tools.push(tool);
        }
    }

    /// Remove a tool if present.
    pub fn unregister(&mut self, name: &str) {
        let before = self.tools.len();
        self.tools.retain(|t| t.name() != name);
        if self.tools.len() != before {
            info!(tool = %name, "tool unregistered");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn get_all(&self) -> &[Arc<Tool>] {
        &self.tools
    }

    /// Tool definitions for the API request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn available_tools(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total: self.tools.len(),
            tools: self
                .tools
                .iter()
                .map(|t| ToolSummary {
                    name: t.metadata.name.clone(),
                    category: t.metadata.category.clone(),
                    version: t.metadata.version.clone(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolve and run one model tool call.
    ///
    /// Unknown tools and invalid arguments produce failure results instead of
    /// errors so the model can retry with corrected input.
    pub async fn execute_call(&self, call: &ToolCall, context: &ExecutionContext) -> ToolOutcome {
        let started = Instant::now();
        let name = call.function.name.as_str();
        let arguments = parse_arguments(&call.function.arguments);

        let result = match self.get(name) {
            None => {
                warn!(tool = %name, call_id = %call.id, "model requested unknown tool");
                let mut result = ToolExecutionResult::failure(format!("unknown tool: {name}"));
                result.available_tools = Some(self.available_tools());
                result
            }
            Some(tool) => match validate_required(&tool.definition.function.parameters, &arguments)
            {
                Err(err) => ToolExecutionResult::failure(err.to_string()),
                Ok(()) => tool.invoke(&arguments, context).await,
            },
        };

        ToolOutcome {
            call_id: call.id.clone(),
            tool_name: name.to_string(),
            arguments,
            result,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}
