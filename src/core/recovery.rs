//! 工具调用出错后的处理
//!
//! 能靠模型自行改正的错误（JSON 格式、工具名、超时）给出提示；其余 Abort，
//! 由调用方决定是写成观察文本还是向上传播。模型调用失败不重试。

use crate::core::{AgentError, RecoveryAction};

#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    /// available_tools 写进“工具不存在”的提示
    pub fn handle(&self, err: &AgentError, available_tools: &[String]) -> RecoveryAction {
        match err {
            AgentError::JsonParseError(raw) => RecoveryAction::RetryWithPrompt(format!(
                "Your previous tool call was not valid JSON: {raw}. \
                 To call a tool, output exactly one JSON object and nothing else, \
                 e.g. {{\"tool\": \"calc\", \"args\": {{\"expr\": \"2+2\"}}}}."
            )),
            AgentError::HallucinatedTool(name) => RecoveryAction::RetryWithPrompt(format!(
                "Tool '{name}' does not exist. Available tools: {}. \
                 Call one of them or answer directly.",
                available_tools.join(", ")
            )),
            AgentError::ToolTimeout { tool, secs } => RecoveryAction::RetryWithPrompt(format!(
                "Tool '{tool}' did not finish within {secs}s. \
                 Retry with a smaller input or answer without it."
            )),
            AgentError::ToolExecutionFailed { .. } | AgentError::Llm(_) => RecoveryAction::Abort,
        }
    }
}
