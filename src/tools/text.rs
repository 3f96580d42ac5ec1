//! 文本工具：count_words / reverse_text / to_uppercase

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::registry::{required_str, single_string_schema};
use crate::tools::Tool;

/// 统计词数（按空白切分）、字符数与行数（按 '\n' 切分，空串算 1 行）
pub fn text_statistics(text: &str) -> String {
    let words = text.split_whitespace().count();
    let chars = text.chars().count();
    let lines = text.split('\n').count();
    format!(
        "Text Statistics:\nWords: {}\nCharacters: {}\nLines: {}",
        words, chars, lines
    )
}

pub struct CountWordsTool;

#[async_trait]
impl Tool for CountWordsTool {
    fn name(&self) -> &str {
        "count_words"
    }

    fn description(&self) -> &str {
        "Count words, characters and lines in text."
    }

    fn parameters_schema(&self) -> Value {
        single_string_schema("text", "Text to analyze")
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        Ok(text_statistics(required_str(&args, "text")?))
    }
}

pub struct ReverseTextTool;

#[async_trait]
impl Tool for ReverseTextTool {
    fn name(&self) -> &str {
        "reverse_text"
    }

    fn description(&self) -> &str {
        "Reverse the given text."
    }

    fn parameters_schema(&self) -> Value {
        single_string_schema("text", "Text to reverse")
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        Ok(required_str(&args, "text")?.chars().rev().collect())
    }
}

pub struct ToUppercaseTool;

#[async_trait]
impl Tool for ToUppercaseTool {
    fn name(&self) -> &str {
        "to_uppercase"
    }

    fn description(&self) -> &str {
        "Convert text to uppercase."
    }

    fn parameters_schema(&self) -> Value {
        single_string_schema("text", "Text to convert")
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        Ok(required_str(&args, "text")?.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics() {
        assert_eq!(
            text_statistics("hello world\nbye"),
            "Text Statistics:\nWords: 3\nCharacters: 15\nLines: 2"
        );
        assert_eq!(
            text_statistics(""),
            "Text Statistics:\nWords: 0\nCharacters: 0\nLines: 1"
        );
    }

    #[tokio::test]
    async fn test_reverse_is_char_based() {
        let out = ReverseTextTool
            .execute(serde_json::json!({"text": "héllo"}))
            .await
            .unwrap();
        assert_eq!(out, "olléh");
    }

    #[tokio::test]
    async fn test_uppercase() {
        let out = ToUppercaseTool
            .execute(serde_json::json!({"text": "mcp"}))
            .await
            .unwrap();
        assert_eq!(out, "MCP");
    }
}
