//! Built-in person lookup tool.
//!
//! `get_character_info` resolves a name against the `charactersData` resource
//! of the execution context. Misses list every known name so the model can
//! retry with a valid one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{required_str, ExecutionContext, Tool, ToolExecutionResult, ToolExecutor, ToolMetadata};
use crate::error::ToolError;
use crate::types::{ParameterSchema, ToolDefinition};

pub const CHARACTER_TOOL_NAME: &str = "get_character_info";
/// Execution-context key holding a `Vec<Character>`.
pub const CHARACTERS_RESOURCE: &str = "charactersData";

/// One record of the character dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Character {
    pub name: String,
    pub age: u32,
    pub occupation: String,
    pub background: String,
    pub personality: String,
}

impl Character {
    fn new(name: &str, age: u32, occupation: &str, background: &str, personality: &str) -> Self {
        Self {
            name: name.into(),
            age,
            occupation: occupation.into(),
            background: background.into(),
            personality: personality.into(),
        }
    }
}

/// The bundled dataset.
pub fn builtin_characters() -> Vec<Character> {
    vec![
        Character::new(
            "张三",
            28,
            "软件工程师",
            "毕业于浙江大学计算机系，在杭州一家互联网公司负责后端开发。",
            "内向细致，做事有条理，喜欢钻研技术问题。",
        ),
        Character::new(
            "李四",
            35,
            "中学教师",
            "在成都一所中学教了十年语文，业余时间写散文。",
            "温和耐心，善于倾听，讲话风趣。",
        ),
        Character::new(
            "王五",
            42,
            "餐厅老板",
            "早年在广州学厨，后来回到老家开了一家川菜馆。",
            "豪爽热情，脾气急但心肠好。",
        ),
        Character::new(
            "赵六",
            31,
            "医生",
            "北京协和医学院毕业，现任三甲医院急诊科主治医师。",
            "冷静果断，责任心强，压力下依然沉着。",
        ),
        Character::new(
            "孙七",
            24,
            "自由摄影师",
            "大学主修新闻，毕业后背着相机走遍西南各省。",
            "好奇心强，乐观随性，不喜欢被约束。",
        ),
    ]
}

/// Context preloaded with the bundled dataset.
pub fn builtin_context() -> ExecutionContext {
    ExecutionContext::new().with_resource(CHARACTERS_RESOURCE, builtin_characters())
}

/// Looks up one character by exact (trimmed, case-sensitive) name.
pub struct CharacterQueryExecutor;

#[async_trait]
impl ToolExecutor for CharacterQueryExecutor {
    async fn execute(
        &self,
        args: &Map<String, Value>,
        context: &ExecutionContext,
    ) -> Result<ToolExecutionResult, ToolError> {
        let name = match required_str(args, "name") {
            Ok(name) => name,
            Err(_) => {
                return Ok(ToolExecutionResult::failure(
                    "character name must be a non-empty string",
                ))
            }
        };

        if !context.has_resource(CHARACTERS_RESOURCE) {
            return Ok(ToolExecutionResult::failure(
                "character data resource is not configured",
            ));
        }
        let characters = context.get_resource::<Vec<Character>>(CHARACTERS_RESOURCE)?;

        let Some(character) = characters.iter().find(|c| c.name == name) else {
            let names: Vec<&str> = characters.iter().map(|c| c.name.as_str()).collect();
            return Ok(
                ToolExecutionResult::failure(format!("no character named \"{name}\""))
                    .with_data(json!({ "availableCharacters": names })),
            );
        };

        let data = serde_json::to_value(character)
            .map_err(|e| ToolError::ExecutionFailed(format!("failed to encode character: {e}")))?;
        Ok(ToolExecutionResult::ok(data))
    }
}

fn definition() -> ToolDefinition {
    ToolDefinition::function(
        CHARACTER_TOOL_NAME,
        "Mandatory: whenever the user asks about any person (name, age, occupation, background, personality), call this tool to query the database. Never answer questions about people directly. 强制使用：用户询问任何人物信息时必须调用此工具。",
        ParameterSchema::object().param(
            "name",
            "string",
            "Name of the person to look up, taken from the user's question. Known people: 张三、李四、王五、赵六、孙七. Call once per person when several are mentioned.",
            true,
        ),
    )
}

/// Build the registrable tool.
pub fn character_query_tool() -> Tool {
    Tool::new(
        ToolMetadata {
            name: CHARACTER_TOOL_NAME.to_string(),
            description: "Character information lookup".to_string(),
            version: "1.0.0".to_string(),
            category: "data-query".to_string(),
        },
        definition(),
        CharacterQueryExecutor,
    )
}
