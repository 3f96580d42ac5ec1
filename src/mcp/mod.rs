//! Model Context Protocol：stdio 服务端与子进程客户端（基于 rmcp）

pub mod client;
pub mod error;
pub mod server;

pub use client::{McpClient, McpRemoteTool};
pub use error::McpError;
pub use server::{McpServer, McpServerHandler};
