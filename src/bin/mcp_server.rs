//! MAS MCP 服务器（stdio）
//!
//! 把一个工具组通过 MCP 暴露给客户端；stdout 只承载协议消息，日志写 stderr。
//!
//! 启动: cargo run --bin mas-mcp -- --server combined

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mas::agent::create_vision_llm;
use mas::config::load_config;
use mas::mcp::McpServer;
use mas::tools::{build_tool_group, ToolGroup};

#[derive(Parser)]
#[command(name = "mas-mcp")]
#[command(about = "Serve a tool group over MCP (stdio)")]
struct Args {
    /// Tool group: documents, math, text, playground, mas, combined
    #[arg(short, long, default_value = "combined")]
    server: ToolGroup,

    /// Extra config file (overrides config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    mas::observability::init_with_default("warn");

    let args = Args::parse();
    let cfg = load_config(args.config.clone()).context("Failed to load config")?;

    let registry = build_tool_group(args.server, &cfg.tools, create_vision_llm(&cfg));
    McpServer::new(registry, args.server.server_name(), env!("CARGO_PKG_VERSION"))
        .with_tool_timeout(cfg.tools.tool_timeout_secs)
        .serve_stdio()
        .await
        .context("MCP server failed")?;

    Ok(())
}
