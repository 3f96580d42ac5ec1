//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / OpenRouter / Mock / Scripted）实现 LlmClient：complete（非流式对话）、
//! describe_image（多模态，默认不支持）。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// 模型调用错误；流水线不做重试，错误直接向上传播
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("empty response")]
    EmptyResponse,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("no scripted reply left")]
    Exhausted,
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成，返回首条回复的文本内容
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 图片描述（image_url 可为 http(s) 链接或 data URL）；不支持视觉输入的后端返回 Unsupported
    async fn describe_image(&self, _image_url: &str, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Unsupported("image input".to_string()))
    }

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
