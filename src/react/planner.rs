//! Planner：Tool Call 解析与带 system prompt 的模型调用
//!
//! 调用 LLM 得到回复或 JSON Tool Call；parse_llm_output 从文本中提取 JSON 并解析为 ToolCall 或直接回复。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;

/// LLM 返回的 Tool Call（简化 JSON：{"tool": "calc", "args": {"expr": "21*2"}}）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Planner 输出
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerOutput {
    /// 直接回复
    Response(String),
    /// 需要执行工具
    ToolCall(ToolCall),
}

/// 从模型输出中截取 JSON 片段：优先 ```json 代码块，其次第一个 `{` 到最后一个 `}`；没有 `{` 时返回 None
pub fn extract_json_block(output: &str) -> Option<&str> {
    let trimmed = output.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        Some(
            rest.find("```")
                .map(|end| rest[..end].trim())
                .unwrap_or(rest.trim()),
        )
    } else if let Some(start) = trimmed.find('{') {
        match trimmed.rfind('}') {
            Some(end) if end > start => Some(&trimmed[start..=end]),
            _ => Some(trimmed),
        }
    } else {
        None
    }
}

/// 解析 LLM 输出：若含 JSON 对象且 tool 非空则为 ToolCall，否则为 Response。
///
/// 只有看起来像工具调用（片段中出现 `"tool"` 键）却解析失败时才返回 JsonParseError；
/// 普通带花括号的回答（代码、集合记号等）按 Response 处理。
pub fn parse_llm_output(output: &str) -> Result<PlannerOutput, AgentError> {
    let trimmed = output.trim();
    let Some(json_str) = extract_json_block(trimmed) else {
        return Ok(PlannerOutput::Response(trimmed.to_string()));
    };

    let parsed: ToolCall = match serde_json::from_str(json_str) {
        Ok(parsed) => parsed,
        Err(e) if json_str.contains("\"tool\"") => {
            return Err(AgentError::JsonParseError(format!("{}: {}", e, json_str)));
        }
        Err(_) => return Ok(PlannerOutput::Response(trimmed.to_string())),
    };

    if parsed.tool.is_empty() {
        Ok(PlannerOutput::Response(trimmed.to_string()))
    } else {
        Ok(PlannerOutput::ToolCall(parsed))
    }
}

/// Planner：持有 LLM 与 system prompt，负责拼 system + messages 后调用 LLM
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn base_system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// 使用动态拼接的 system（基础 prompt + 工具目录 + 调用格式）
    pub async fn plan_with_system(
        &self,
        messages: &[Message],
        system: &str,
    ) -> Result<String, AgentError> {
        let mut full_messages = vec![Message::system(system.to_string())];
        full_messages.extend(messages.iter().cloned());
        Ok(self.llm.complete(&full_messages).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_response() {
        assert_eq!(
            parse_llm_output("  The answer is 42.  ").unwrap(),
            PlannerOutput::Response("The answer is 42.".to_string())
        );
    }

    #[test]
    fn test_fenced_tool_call() {
        let out = parse_llm_output(
            "I will compute it.\n```json\n{\"tool\": \"calc\", \"args\": {\"expr\": \"21*2\"}}\n```",
        )
        .unwrap();
        match out {
            PlannerOutput::ToolCall(tc) => {
                assert_eq!(tc.tool, "calc");
                assert_eq!(tc.args["expr"], "21*2");
            }
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_json_tool_call() {
        let out = parse_llm_output(r#"{"tool": "web_search", "args": {"query": "itmo"}}"#).unwrap();
        assert!(matches!(out, PlannerOutput::ToolCall(tc) if tc.tool == "web_search"));
    }

    #[test]
    fn test_json_without_tool_is_response() {
        let out = parse_llm_output(r#"{"valid": true, "comment": "ok"}"#).unwrap();
        assert!(matches!(out, PlannerOutput::Response(_)));
    }

    #[test]
    fn test_braces_in_plain_answer_are_response() {
        let answer = "Here it is:\nfn main() { println!(\"42\"); }";
        assert_eq!(
            parse_llm_output(answer).unwrap(),
            PlannerOutput::Response(answer.to_string())
        );
        let set = "The set is {1, 2, 3}.";
        assert_eq!(
            parse_llm_output(set).unwrap(),
            PlannerOutput::Response(set.to_string())
        );
    }

    #[test]
    fn test_malformed_json_is_error() {
        let err = parse_llm_output(r#"{"tool": "calc", "args": {"expr": }"#).unwrap_err();
        assert!(matches!(err, AgentError::JsonParseError(_)));
    }
}
