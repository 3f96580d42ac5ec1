//! MCP 客户端：启动 stdio 子进程服务器，发现其工具并包装为本地 Tool
//!
//! McpRemoteTool 可与原生工具一起注册到 ToolRegistry，由 ToolAgent 统一调用。

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, Content, RawContent, Tool as McpTool};
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::child_process::TokioChildProcess;
use rmcp::ServiceExt;
use serde_json::Value;
use tokio::process::Command;

use crate::config::McpServerConfig;
use crate::mcp::McpError;
use crate::tools::Tool;

pub struct McpClient {
    service: RunningService<RoleClient, ()>,
}

impl McpClient {
    /// 启动子进程并完成 MCP 握手
    pub async fn connect_stdio(command: Command) -> Result<Self, McpError> {
        let transport =
            TokioChildProcess::new(command).map_err(|e| McpError::Connection(e.to_string()))?;
        let service = ()
            .serve(transport)
            .await
            .map_err(|e| McpError::Connection(e.to_string()))?;
        Ok(Self { service })
    }

    /// 按 [[mcp.servers]] 配置启动
    pub async fn connect_config(cfg: &McpServerConfig) -> Result<Self, McpError> {
        let mut cmd = Command::new(&cfg.command);
        cmd.args(&cfg.args);
        for (key, value) in &cfg.env {
            cmd.env(key, value);
        }
        tracing::info!(server = %cfg.name, command = %cfg.command, "connecting MCP server");
        Self::connect_stdio(cmd).await
    }

    /// 包装已建立的服务（自定义传输）
    pub fn from_service(service: RunningService<RoleClient, ()>) -> Self {
        Self { service }
    }

    /// 服务端在握手时报告的名称
    pub fn server_name(&self) -> Option<String> {
        self.service
            .peer_info()
            .map(|info| info.server_info.name.clone())
    }

    /// 列出远端全部工具，包装为本地 Tool
    pub async fn discover_tools(&self) -> Result<Vec<Arc<dyn Tool>>, McpError> {
        let tools = self
            .service
            .list_all_tools()
            .await
            .map_err(|e| McpError::Protocol(e.to_string()))?;

        let peer = Arc::new(self.service.peer().clone());
        Ok(tools
            .into_iter()
            .map(|tool| Arc::new(McpRemoteTool::new(tool, Arc::clone(&peer))) as Arc<dyn Tool>)
            .collect())
    }

    /// 关闭连接（子进程随之退出）
    pub async fn close(self) -> Result<(), McpError> {
        self.service
            .cancel()
            .await
            .map_err(|e| McpError::Connection(e.to_string()))?;
        Ok(())
    }
}

/// 远端 MCP 工具
pub struct McpRemoteTool {
    tool: McpTool,
    peer: Arc<Peer<RoleClient>>,
}

impl McpRemoteTool {
    pub fn new(tool: McpTool, peer: Arc<Peer<RoleClient>>) -> Self {
        Self { tool, peer }
    }
}

/// 拼接结果中的文本块
fn extract_text(content: &[Content]) -> String {
    content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Tool for McpRemoteTool {
    fn name(&self) -> &str {
        &self.tool.name
    }

    fn description(&self) -> &str {
        self.tool.description.as_deref().unwrap_or("")
    }

    fn parameters_schema(&self) -> Value {
        Value::Object(self.tool.input_schema.as_ref().clone())
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let name: Cow<'static, str> = self.tool.name.clone();
        let params = CallToolRequestParams {
            meta: None,
            name,
            arguments: args.as_object().cloned(),
            task: None,
        };

        let result = self
            .peer
            .call_tool(params)
            .await
            .map_err(|e| format!("MCP call failed: {}", e))?;

        let text = extract_text(&result.content);
        if result.is_error == Some(true) {
            return Err(text);
        }
        if text.is_empty() {
            if let Some(structured) = result.structured_content {
                return Ok(structured.to_string());
            }
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_text_blocks() {
        let content = vec![Content::text("a"), Content::text("b")];
        assert_eq!(extract_text(&content), "a\nb");
    }
}
