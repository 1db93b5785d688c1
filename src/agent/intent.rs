//! Tool-call intent detection.
//!
//! A model reply is classified by an [`IntentChain`]: each
//! [`IntentExtractor`] is tried in priority order and the first one that
//! finds calls wins. Replies without calls are plain content or empty.

use crate::types::{Message, ToolCall};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

static ARRAY_MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""tool_calls"\s*:\s*\["#).ok());
/// Start of an object whose first key is one a call object carries.
static CALL_OBJECT_START: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"\{\s*"(?:id|type|function)"\s*:"#).ok());

/// Which extractor produced the calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentSource {
    /// Native `tool_calls` field on the response message.
    Structured,
    /// Tool-call JSON embedded in the text content.
    Pattern,
}

/// Classified model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    ToolCalls {
        /// Accompanying text, `""` when none.
        content: String,
        calls: Vec<ToolCall>,
        source: IntentSource,
    },
    Content(String),
    Empty,
}

pub trait IntentExtractor: Send + Sync {
    fn source(&self) -> IntentSource;

    /// Calls found in `message`, or `None`.
    fn extract(&self, message: &Message) -> Option<Vec<ToolCall>>;
}

/// Reads the message's `tool_calls` field.
pub struct StructuredIntent;

impl IntentExtractor for StructuredIntent {
    fn source(&self) -> IntentSource {
        IntentSource::Structured
    }

    fn extract(&self, message: &Message) -> Option<Vec<ToolCall>> {
        message
            .tool_calls
            .as_ref()
            .filter(|calls| !calls.is_empty())
            .cloned()
    }
}

/// Finds tool calls written into the text content.
///
/// Two shapes are recognized, in order:
/// - an array under a `"tool_calls"` key: `{"tool_calls": [{...}, ...]}`
/// - bare call objects with `id`, `type: "function"` and `function` keys,
///   in any order
///
/// Arguments may be a JSON string or an inline object.
pub struct PatternIntent;

impl IntentExtractor for PatternIntent {
    fn source(&self) -> IntentSource {
        IntentSource::Pattern
    }

    fn extract(&self, message: &Message) -> Option<Vec<ToolCall>> {
        let text = message.content.as_deref()?;
        if let Some(calls) = array_form(text) {
            return Some(calls);
        }
        let calls = object_form(text);
        (!calls.is_empty()).then_some(calls)
    }
}

#[derive(Deserialize)]
struct TextualCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default)]
    call_type: Option<String>,
    function: TextualFunction,
}

#[derive(Deserialize)]
struct TextualFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl TextualCall {
    fn into_tool_call(self, index: usize) -> ToolCall {
        let id = if self.id.trim().is_empty() {
            format!("call_text_{index}")
        } else {
            self.id
        };
        let arguments = match self.function.arguments {
            Value::String(text) => text,
            Value::Null => "{}".to_string(),
            other => other.to_string(),
        };
        ToolCall::new(id, self.function.name, arguments)
    }
}

fn array_form(text: &str) -> Option<Vec<ToolCall>> {
    let marker = ARRAY_MARKER.as_ref()?;
    for found in marker.find_iter(text) {
        // Parse from the opening bracket; trailing text is ignored.
        let start = found.end() - 1;
        let mut values =
            serde_json::Deserializer::from_str(&text[start..]).into_iter::<Vec<TextualCall>>();
        if let Some(Ok(parsed)) = values.next() {
            let calls: Vec<ToolCall> = parsed
                .into_iter()
                .filter(|c| !c.function.name.trim().is_empty())
                .enumerate()
                .map(|(i, c)| c.into_tool_call(i))
                .collect();
            if !calls.is_empty() {
                return Some(calls);
            }
        }
    }
    None
}

fn object_form(text: &str) -> Vec<ToolCall> {
    let Some(object_start) = CALL_OBJECT_START.as_ref() else {
        return Vec::new();
    };
    let mut calls = Vec::new();
    let mut resume_at = 0;
    for found in object_start.find_iter(text) {
        if found.start() < resume_at {
            continue;
        }
        let mut values =
            serde_json::Deserializer::from_str(&text[found.start()..]).into_iter::<TextualCall>();
        let Some(Ok(call)) = values.next() else {
            continue;
        };
        if call.call_type.as_deref() != Some("function") || call.function.name.trim().is_empty()
        {
            continue;
        }
        resume_at = found.start() + values.byte_offset();
        calls.push(call.into_tool_call(calls.len()));
    }
    calls
}

/// Ordered extractors; the first hit wins.
pub struct IntentChain {
    extractors: Vec<Box<dyn IntentExtractor>>,
}

impl Default for IntentChain {
    fn default() -> Self {
        Self::new(vec![Box::new(StructuredIntent), Box::new(PatternIntent)])
    }
}

impl IntentChain {
    pub fn new(extractors: Vec<Box<dyn IntentExtractor>>) -> Self {
        Self { extractors }
    }

    pub fn classify(&self, message: &Message) -> ModelReply {
        for extractor in &self.extractors {
            if let Some(calls) = extractor.extract(message) {
                debug!(
                    source = ?extractor.source(),
                    count = calls.len(),
                    "tool-call intent detected"
                );
                return ModelReply::ToolCalls {
                    content: message.content.clone().unwrap_or_default(),
                    calls,
                    source: extractor.source(),
                };
            }
        }
        match message.content.as_deref() {
            Some(text) if !text.is_empty() => ModelReply::Content(text.to_string()),
            _ => ModelReply::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(message: Message) -> ModelReply {
        IntentChain::default().classify(&message)
    }

    #[test]
    fn structured_calls_take_priority_over_text() {
        let message = Message::assistant_tool_calls(
            r#"{"tool_calls":[{"id":"t","function":{"name":"other","arguments":"{}"}}]}"#,
            vec![ToolCall::new("call_1", "get_character_info", r#"{"name":"张三"}"#)],
        );
        match classify(message) {
            ModelReply::ToolCalls { calls, source, .. } => {
                assert_eq!(source, IntentSource::Structured);
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].id, "call_1");
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn array_under_tool_calls_key_is_extracted() {
        let text = r#"Let me look that up.
{"tool_calls": [
  {"id": "call_a", "type": "function", "function": {"name": "get_character_info", "arguments": "{\"name\":\"李四\"}"}},
  {"id": "call_b", "function": {"name": "get_character_info", "arguments": {"name": "王五"}}}
]}
done"#;
        match classify(Message::assistant(text)) {
            ModelReply::ToolCalls {
                calls,
                source,
                content,
            } => {
                assert_eq!(source, IntentSource::Pattern);
                assert_eq!(content, text);
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].function.arguments, r#"{"name":"李四"}"#);
                assert_eq!(calls[1].id, "call_b");
                let args: Value = serde_json::from_str(&calls[1].function.arguments).unwrap();
                assert_eq!(args["name"], "王五");
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn repeated_single_objects_are_extracted_in_order() {
        let text = r#"first {"id":"c1","type":"function","function":{"name":"get_character_info","arguments":"{\"name\":\"赵六\"}"}}
then {"id": "c2", "type": "function", "function": {"name": "get_character_info", "arguments": {"name": "孙七"}}}
and {"id": "ignored", "type": "note"}"#;
        let ModelReply::ToolCalls { calls, .. } = classify(Message::assistant(text)) else {
            panic!("expected tool calls");
        };
        let ids: Vec<&str> = calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn single_objects_match_regardless_of_key_order() {
        let text = r#"{"type":"function","id":"c1","function":{"name":"get_character_info","arguments":{"name":"张三"}}}
and {"function": {"name": "get_character_info", "arguments": "{\"name\":\"李四\"}"}, "type": "function", "id": "c2"}"#;
        let ModelReply::ToolCalls { calls, source, .. } = classify(Message::assistant(text)) else {
            panic!("expected tool calls");
        };
        assert_eq!(source, IntentSource::Pattern);
        let ids: Vec<&str> = calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(calls[0].function.arguments, r#"{"name":"张三"}"#);
        assert_eq!(calls[1].function.arguments, r#"{"name":"李四"}"#);
    }

    #[test]
    fn objects_without_function_type_stay_content() {
        let text = r#"{"type":"note","id":"n1","function":{"name":"get_character_info"}}"#;
        assert_eq!(
            classify(Message::assistant(text)),
            ModelReply::Content(text.into())
        );
    }

    #[test]
    fn missing_ids_and_arguments_are_filled() {
        let text = r#"{"tool_calls":[{"function":{"name":"get_character_info"}}]}"#;
        let ModelReply::ToolCalls { calls, .. } = classify(Message::assistant(text)) else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].id, "call_text_0");
        assert_eq!(calls[0].function.arguments, "{}");
    }

    #[test]
    fn plain_text_and_malformed_json_are_content() {
        assert_eq!(
            classify(Message::assistant("张三今年28岁。")),
            ModelReply::Content("张三今年28岁。".into())
        );
        let broken = r#"{"tool_calls": [{"id": "x", "function": "#;
        assert_eq!(
            classify(Message::assistant(broken)),
            ModelReply::Content(broken.into())
        );
    }

    #[test]
    fn empty_reply_is_empty() {
        let mut message = Message::assistant("");
        assert_eq!(classify(message.clone()), ModelReply::Empty);
        message.content = None;
        message.tool_calls = Some(Vec::new());
        assert_eq!(classify(message), ModelReply::Empty);
    }

    #[test]
    fn chain_without_pattern_extractor_ignores_text_calls() {
        let chain = IntentChain::new(vec![Box::new(StructuredIntent)]);
        let text = r#"{"id":"c1","type":"function","function":{"name":"x","arguments":"{}"}}"#;
        assert_eq!(
            chain.classify(&Message::assistant(text)),
            ModelReply::Content(text.into())
        );
    }
}
