//! MCP 错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum McpError {
    /// 传输建立、握手或服务运行失败
    #[error("MCP connection error: {0}")]
    Connection(String),

    /// 请求失败（tools/list、tools/call）
    #[error("MCP protocol error: {0}")]
    Protocol(String),
}
