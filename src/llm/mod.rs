//! LLM 层：客户端抽象与实现（OpenAI 兼容 / OpenRouter / Mock）

pub mod mock;
pub mod openai;
pub mod openrouter;
pub mod traits;

pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use openrouter::{create_openrouter_client, DEFAULT_MODEL, OPENROUTER_BASE_URL};
pub use traits::{LlmClient, LlmError};
