//! MCP 服务端：把 ToolRegistry 中的工具通过 stdio 暴露给 MCP 客户端
//!
//! tools/list 列出全部工具；tools/call 经 ToolExecutor 执行（带超时与审计日志）。
//! 未注册的工具返回 invalid_params，工具失败返回 is_error 结果而非协议错误。

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo, Tool as McpTool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::transport::io::stdio;
use rmcp::{ErrorData, ServerHandler, ServiceExt};

use crate::mcp::McpError;
use crate::tools::{Tool, ToolExecutor, ToolRegistry};

/// 默认单次工具调用超时（秒）
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

pub struct McpServer {
    handler: McpServerHandler,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            handler: McpServerHandler {
                executor: Arc::new(ToolExecutor::new(registry, DEFAULT_TOOL_TIMEOUT_SECS)),
                name: name.into(),
                version: version.into(),
            },
        }
    }

    pub fn with_tool_timeout(mut self, timeout_secs: u64) -> Self {
        let registry = self.handler.executor.registry().clone();
        self.handler.executor = Arc::new(ToolExecutor::new(registry, timeout_secs));
        self
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.handler.executor.tool_names()
    }

    /// 通过 stdin/stdout 提供服务，直到客户端断开
    pub async fn serve_stdio(self) -> Result<(), McpError> {
        tracing::info!(
            server = %self.handler.name,
            tools = ?self.handler.executor.tool_names(),
            "MCP server listening on stdio"
        );
        let service = self
            .handler
            .serve(stdio())
            .await
            .map_err(|e| McpError::Connection(e.to_string()))?;
        service
            .waiting()
            .await
            .map_err(|e| McpError::Connection(e.to_string()))?;
        Ok(())
    }

    /// 取出协议处理器（用于自定义传输，例如测试中的内存管道）
    pub fn into_handler(self) -> McpServerHandler {
        self.handler
    }
}

/// 实现 rmcp ServerHandler 的协议处理器
#[derive(Clone)]
pub struct McpServerHandler {
    executor: Arc<ToolExecutor>,
    name: String,
    version: String,
}

fn to_mcp_tool(tool: &Arc<dyn Tool>) -> McpTool {
    let schema_obj = tool
        .parameters_schema()
        .as_object()
        .cloned()
        .unwrap_or_default();

    McpTool {
        name: Cow::Owned(tool.name().to_string()),
        title: None,
        description: Some(Cow::Owned(tool.description().to_string())),
        input_schema: Arc::new(schema_obj),
        output_schema: None,
        annotations: None,
        execution: None,
        icons: None,
        meta: None,
    }
}

impl ServerHandler for McpServerHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: self.version.clone(),
                ..Default::default()
            },
            instructions: None,
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools: Vec<McpTool> = self.executor.registry().tools().map(to_mcp_tool).collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let tool_name = &*request.name;
        if self.executor.get_tool(tool_name).is_none() {
            return Err(ErrorData::invalid_params(
                format!("tool not found: {}", tool_name),
                None,
            ));
        }

        let input = match request.arguments {
            Some(map) => serde_json::Value::Object(map),
            None => serde_json::Value::Object(serde_json::Map::new()),
        };

        match self.executor.execute(tool_name, input).await {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{CalculateTool, CountWordsTool};

    #[test]
    fn test_server_info() {
        let mut registry = ToolRegistry::new();
        registry.register(CalculateTool);
        let server = McpServer::new(registry, "Math Server", "1.0.0");
        assert_eq!(server.tool_names(), vec!["calculate"]);

        let info = server.into_handler().get_info();
        assert_eq!(info.server_info.name, "Math Server");
        assert_eq!(info.server_info.version, "1.0.0");
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_tool_conversion_keeps_schema() {
        let tool: Arc<dyn Tool> = Arc::new(CountWordsTool);
        let mcp = to_mcp_tool(&tool);
        assert_eq!(mcp.name.as_ref(), "count_words");
        assert_eq!(mcp.description.as_deref(), Some("Count words, characters and lines in text."));
        assert!(mcp.input_schema.contains_key("properties"));
    }
}
