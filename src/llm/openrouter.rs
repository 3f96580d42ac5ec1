//! OpenRouter 客户端（OpenAI 兼容格式）
//!
//! - Base URL: https://openrouter.ai/api/v1
//! - 模型名形如 `google/gemini-2.0-flash-lite-001`，由 `BASE_MODEL` 指定

use crate::llm::OpenAiClient;

/// OpenRouter API 常量
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-lite-001";

/// 创建 OpenRouter 客户端
///
/// - 密钥优先参数，其次 `OPENROUTER_API_KEY`，再次 `OPENAI_API_KEY`
/// - 模型优先参数，其次 `BASE_MODEL`，最后 DEFAULT_MODEL
pub fn create_openrouter_client(
    model: Option<&str>,
    api_key: Option<&str>,
    temperature: f32,
) -> OpenAiClient {
    let api_key = api_key
        .map(String::from)
        .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .unwrap_or_else(|| "sk-placeholder".to_string());

    let model = model
        .map(String::from)
        .or_else(|| std::env::var("BASE_MODEL").ok())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    OpenAiClient::new(Some(OPENROUTER_BASE_URL), &model, Some(api_key.as_str()))
        .with_temperature(temperature)
}
