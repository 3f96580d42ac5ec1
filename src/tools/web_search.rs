//! web_search 工具：默认返回 mock 结果；配置 TAVILY_API_KEY 后走 Tavily 搜索
//!
//! 请求带超时；结果超过 max_result_chars 时截断并追加 ...[truncated]。
//! 网络或接口错误以 "search error: ..." 字符串返回给模型。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::registry::{required_str, single_string_schema};
use crate::tools::Tool;

pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// 搜索后端
enum Backend {
    Mock,
    Tavily { client: Client, api_key: String },
}

pub struct WebSearchTool {
    backend: Backend,
    max_results: usize,
    max_result_chars: usize,
}

impl WebSearchTool {
    /// 离线 mock：返回 "[mock] search results for: {query}"
    pub fn mock() -> Self {
        Self {
            backend: Backend::Mock,
            max_results: 5,
            max_result_chars: 4000,
        }
    }

    pub fn tavily(
        api_key: impl Into<String>,
        timeout_secs: u64,
        max_results: usize,
        max_result_chars: usize,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            backend: Backend::Tavily {
                client,
                api_key: api_key.into(),
            },
            max_results,
            max_result_chars,
        }
    }

    /// 有密钥走 Tavily，否则 mock
    pub fn from_key(
        api_key: Option<&str>,
        timeout_secs: u64,
        max_results: usize,
        max_result_chars: usize,
    ) -> Self {
        match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Self::tavily(key, timeout_secs, max_results, max_result_chars),
            None => Self {
                max_results,
                max_result_chars,
                ..Self::mock()
            },
        }
    }

    pub fn is_mock(&self) -> bool {
        matches!(self.backend, Backend::Mock)
    }

    async fn tavily_search(
        &self,
        client: &Client,
        api_key: &str,
        query: &str,
    ) -> Result<String, String> {
        let resp = client
            .post(TAVILY_SEARCH_URL)
            .json(&TavilyRequest {
                api_key,
                query,
                max_results: self.max_results,
            })
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let parsed: TavilyResponse = resp
            .json()
            .await
            .map_err(|e| format!("Invalid response: {}", e))?;

        Ok(format_results(&parsed.results))
    }

    fn truncate(&self, body: String) -> String {
        if body.chars().count() > self.max_result_chars {
            body.chars().take(self.max_result_chars).collect::<String>() + "\n...[truncated]"
        } else {
            body
        }
    }
}

fn format_results(results: &[TavilyResult]) -> String {
    if results.is_empty() {
        return "No results found.".to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {} ({})\n{}", i + 1, r.title, r.url, r.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web and return the top results as text. Args: {\"query\": \"...\"}."
    }

    fn parameters_schema(&self) -> Value {
        single_string_schema("query", "Search query")
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let query = required_str(&args, "query")?.trim();
        tracing::info!(query = %query, mock = self.is_mock(), "web search");
        match &self.backend {
            Backend::Mock => Ok(format!("[mock] search results for: {}", query)),
            Backend::Tavily { client, api_key } => {
                match self.tavily_search(client, api_key, query).await {
                    Ok(body) => Ok(self.truncate(body)),
                    Err(e) => Ok(format!("search error: {}", e)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_search() {
        let out = WebSearchTool::mock()
            .execute(serde_json::json!({"query": "rust"}))
            .await
            .unwrap();
        assert_eq!(out, "[mock] search results for: rust");
    }

    #[test]
    fn test_blank_key_falls_back_to_mock() {
        assert!(WebSearchTool::from_key(Some("  "), 5, 3, 100).is_mock());
        assert!(!WebSearchTool::from_key(Some("tvly-x"), 5, 3, 100).is_mock());
    }

    #[test]
    fn test_format_results() {
        let text = format_results(&[TavilyResult {
            title: "Rust".into(),
            url: "https://rust-lang.org".into(),
            content: " A language ".into(),
        }]);
        assert_eq!(text, "1. Rust (https://rust-lang.org)\nA language");
        assert_eq!(format_results(&[]), "No results found.");
    }

    #[test]
    fn test_truncate() {
        let tool = WebSearchTool::from_key(None, 5, 3, 4);
        assert_eq!(tool.truncate("abcdefgh".into()), "abcd\n...[truncated]");
    }
}
