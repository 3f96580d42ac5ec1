//! 对话记录：流水线状态中不断增长的 transcript
//!
//! Message 与 LLM API 的角色一一对应；Tool 角色承载工具返回的 Observation。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致，Tool 为工具观察结果）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
        }
    }
}

/// 将整段对话渲染为纯文本（每条一行 `[role] content`），供 Summarizer 拼入 prompt
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("[{}] {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::tool("42")).unwrap();
        assert_eq!(json, r#"{"role":"tool","content":"42"}"#);
    }

    #[test]
    fn test_render_transcript() {
        let messages = vec![
            Message::user("calculate 21*2"),
            Message::assistant("1. use calc"),
            Message::tool("Observation from calc: 42"),
        ];
        assert_eq!(
            render_transcript(&messages),
            "[user] calculate 21*2\n[assistant] 1. use calc\n[tool] Observation from calc: 42"
        );
    }

    #[test]
    fn test_render_empty_transcript() {
        assert_eq!(render_transcript(&[]), "");
    }
}
