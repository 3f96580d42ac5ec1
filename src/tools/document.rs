//! 文档工具：convert_document（转 Markdown）与 analyze_document（结构统计）
//!
//! 支持 txt/md（原样）、html/htm（html2text 提取正文）、csv（Markdown 表格）、json（代码块）。
//! 路径中的 `~` 展开为 HOME；失败以 "conversion error: ..." / "analysis error: ..." 字符串返回。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::tools::registry::{required_str, single_string_schema};
use crate::tools::Tool;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("unsupported document format: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("html conversion failed: {0}")]
    Html(String),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid csv: {0}")]
    Csv(#[from] csv::Error),
}

/// 展开开头的 `~` 为 HOME 目录
pub fn expand_tilde(path: &str) -> PathBuf {
    let home = std::env::var("HOME").ok();
    match (path, home) {
        ("~", Some(home)) => PathBuf::from(home),
        (p, Some(home)) if p.starts_with("~/") => Path::new(&home).join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}

/// 按扩展名把文档转为 Markdown 文本
pub async fn convert_to_markdown(file_path: &str) -> Result<String, DocumentError> {
    let path = expand_tilde(file_path);
    if !path.is_file() {
        return Err(DocumentError::NotFound(path.display().to_string()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let bytes = tokio::fs::read(&path).await?;
    match ext.as_str() {
        "" | "txt" | "md" | "markdown" | "rst" | "log" => {
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        "html" | "htm" | "xhtml" => html2text::from_read(bytes.as_slice(), 100)
            .map_err(|e| DocumentError::Html(e.to_string())),
        "csv" => csv_to_markdown(&String::from_utf8_lossy(&bytes)),
        "json" => {
            let value: Value = serde_json::from_slice(&bytes)?;
            Ok(format!("```json\n{}\n```", serde_json::to_string_pretty(&value)?))
        }
        other => Err(DocumentError::Unsupported(format!(".{}", other))),
    }
}

/// 单元格中的换行换成 `<br>`，竖线转义，避免破坏表格
fn markdown_cell(field: &str) -> String {
    field
        .trim()
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
        .replace('|', "\\|")
}

fn csv_to_markdown(content: &str) -> Result<String, DocumentError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let header: Vec<String> = reader.headers()?.iter().map(markdown_cell).collect();
    if header.iter().all(|h| h.is_empty()) {
        return Ok(String::new());
    }
    let width = header.len();
    let mut out = vec![
        format!("| {} |", header.join(" | ")),
        format!("| {} |", vec!["---"; width].join(" | ")),
    ];
    for record in reader.records() {
        let record = record?;
        let mut row: Vec<String> = record.iter().map(markdown_cell).collect();
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        row.resize(width, String::new());
        out.push(format!("| {} |", row.join(" | ")));
    }
    Ok(out.join("\n"))
}

/// 文档统计：名称、字符数、词数、行数、标题数（以 # 开头的行）
pub async fn analyze(file_path: &str) -> Result<String, DocumentError> {
    let content = convert_to_markdown(file_path).await?;
    let lines: Vec<&str> = content.split('\n').collect();
    let words = content.split_whitespace().count();
    let chars = content.chars().count();
    let headers = lines.iter().filter(|l| l.starts_with('#')).count();
    let name = Path::new(file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.to_string());

    Ok(format!(
        "Document: {}\nSize: {} chars, {} words\nLines: {}\nHeaders: {}",
        name,
        chars,
        words,
        lines.len(),
        headers
    ))
}

pub struct ConvertDocumentTool;

#[async_trait]
impl Tool for ConvertDocumentTool {
    fn name(&self) -> &str {
        "convert_document"
    }

    fn description(&self) -> &str {
        "Convert a document (txt, md, html, csv, json) to Markdown text."
    }

    fn parameters_schema(&self) -> Value {
        single_string_schema("file_path", "Path to document file")
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let file_path = required_str(&args, "file_path")?;
        tracing::info!(file_path = %file_path, "convert document");
        Ok(convert_to_markdown(file_path)
            .await
            .unwrap_or_else(|e| format!("conversion error: {}", e)))
    }
}

pub struct AnalyzeDocumentTool;

#[async_trait]
impl Tool for AnalyzeDocumentTool {
    fn name(&self) -> &str {
        "analyze_document"
    }

    fn description(&self) -> &str {
        "Analyze document structure and return statistics (size, words, lines, headers)."
    }

    fn parameters_schema(&self) -> Value {
        single_string_schema("file_path", "Path to document file")
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let file_path = required_str(&args, "file_path")?;
        Ok(analyze(file_path)
            .await
            .unwrap_or_else(|e| format!("analysis error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_to_markdown() {
        let md = csv_to_markdown("name,qty\n\"apple, red\",3\npear\n").unwrap();
        assert_eq!(
            md,
            "| name | qty |\n| --- | --- |\n| apple, red | 3 |\n| pear |  |"
        );
        assert_eq!(csv_to_markdown("").unwrap(), "");
    }

    #[tokio::test]
    async fn test_quoted_newline_stays_in_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.csv");
        std::fs::write(
            &path,
            "name,note\nalice,\"line one\nline two\"\nbob,\"a|b \"\"quoted\"\"\"\n",
        )
        .unwrap();

        let out = convert_to_markdown(path.to_str().unwrap()).await.unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "| alice | line one<br>line two |");
        assert_eq!(lines[3], "| bob | a\\|b \"quoted\" |");
    }

    #[test]
    fn test_expand_tilde() {
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(expand_tilde("~/a.txt"), Path::new(&home).join("a.txt"));
        }
        assert_eq!(expand_tilde("/tmp/a.txt"), PathBuf::from("/tmp/a.txt"));
    }

    #[tokio::test]
    async fn test_analyze_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Title\nsome text here\n## Sub\n").unwrap();

        let out = analyze(path.to_str().unwrap()).await.unwrap();
        assert_eq!(
            out,
            "Document: notes.md\nSize: 30 chars, 7 words\nLines: 4\nHeaders: 2"
        );
    }

    #[tokio::test]
    async fn test_json_is_fenced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"a":1}"#).unwrap();

        let out = convert_to_markdown(path.to_str().unwrap()).await.unwrap();
        assert_eq!(out, "```json\n{\n  \"a\": 1\n}\n```");
    }

    #[tokio::test]
    async fn test_html_text_is_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<html><body><p>Hello MCP</p></body></html>").unwrap();

        let out = convert_to_markdown(path.to_str().unwrap()).await.unwrap();
        assert!(out.contains("Hello MCP"));
        assert!(!out.contains("<p>"));
    }

    #[tokio::test]
    async fn test_errors_are_returned_as_text() {
        let out = ConvertDocumentTool
            .execute(serde_json::json!({"file_path": "/definitely/missing.pdf"}))
            .await
            .unwrap();
        assert!(out.starts_with("conversion error: file not found"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        std::fs::write(&path, b"PK").unwrap();
        let out = AnalyzeDocumentTool
            .execute(serde_json::json!({"file_path": path.to_str().unwrap()}))
            .await
            .unwrap();
        assert_eq!(out, "analysis error: unsupported document format: .pptx");
    }
}
