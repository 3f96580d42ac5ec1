//! describe_image 工具：调用视觉模型描述图片
//!
//! image 参数可为 http(s) 链接、data URL 或本地文件路径；本地文件读入后按扩展名编码为 base64 data URL。

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::llm::LlmClient;
use crate::tools::document::expand_tilde;
use crate::tools::registry::{required_str, single_string_schema};
use crate::tools::Tool;

pub const DEFAULT_IMAGE_PROMPT: &str =
    "Describe this image in detail: objects, people, text, colors and overall context.";

/// 按扩展名推断图片 MIME
fn image_mime(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// 规范化为模型可接受的图片 URL
pub async fn to_image_url(image: &str) -> Result<String, String> {
    let image = image.trim();
    if image.starts_with("http://") || image.starts_with("https://") || image.starts_with("data:") {
        return Ok(image.to_string());
    }
    let path = expand_tilde(image);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let mime = image_mime(ext).ok_or_else(|| format!("unsupported image format: {}", path.display()))?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

pub struct DescribeImageTool {
    llm: Arc<dyn LlmClient>,
}

impl DescribeImageTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tool for DescribeImageTool {
    fn name(&self) -> &str {
        "describe_image"
    }

    fn description(&self) -> &str {
        "Describe an image given its URL or local file path."
    }

    fn parameters_schema(&self) -> Value {
        single_string_schema("image", "Image URL (http/https/data) or local file path")
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let image = required_str(&args, "image")?;
        let url = match to_image_url(image).await {
            Ok(url) => url,
            Err(e) => return Ok(format!("image error: {}", e)),
        };
        tracing::info!(image = %image, "describe image");
        Ok(match self.llm.describe_image(&url, DEFAULT_IMAGE_PROMPT).await {
            Ok(text) => text,
            Err(e) => format!("image error: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_remote_url_is_passed_through() {
        let url = to_image_url(" https://example.com/cat.png ").await.unwrap();
        assert_eq!(url, "https://example.com/cat.png");
    }

    #[tokio::test]
    async fn test_local_file_becomes_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.PNG");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let url = to_image_url(path.to_str().unwrap()).await.unwrap();
        assert_eq!(url, "data:image/png;base64,AQID");
    }

    #[tokio::test]
    async fn test_tool_reports_errors_as_text() {
        let tool = DescribeImageTool::new(Arc::new(MockLlmClient));
        let out = tool
            .execute(serde_json::json!({"image": "/nope/file.bmp"}))
            .await
            .unwrap();
        assert!(out.starts_with("image error: unsupported image format"));

        let out = tool
            .execute(serde_json::json!({"image": "https://example.com/a.jpg"}))
            .await
            .unwrap();
        assert_eq!(out, "[mock] image at https://example.com/a.jpg");
    }
}
