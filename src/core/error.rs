//! 错误类型
//!
//! 模型调用失败（Llm）直接向上传播并终止流水线；其余变体来自工具调用，
//! 由 RecoveryEngine 转成观察文本交还给模型。

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// 模型输出了无法解析的工具调用 JSON
    #[error("Malformed tool call JSON: {0}")]
    JsonParseError(String),

    #[error("Tool '{tool}' failed: {reason}")]
    ToolExecutionFailed { tool: String, reason: String },

    #[error("Tool '{tool}' timed out after {secs}s")]
    ToolTimeout { tool: String, secs: u64 },

    /// 模型调用了未注册的工具
    #[error("Unknown tool: {0}")]
    HallucinatedTool(String),
}

impl AgentError {
    /// 涉及的工具名（模型错误为 None）
    pub fn tool(&self) -> Option<&str> {
        match self {
            AgentError::ToolExecutionFailed { tool, .. } | AgentError::ToolTimeout { tool, .. } => {
                Some(tool)
            }
            AgentError::HallucinatedTool(tool) => Some(tool),
            AgentError::Llm(_) | AgentError::JsonParseError(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// 把提示放进下一轮上下文，让模型改正
    RetryWithPrompt(String),
    /// 原样报告错误
    Abort,
}
