//! MAS 单智能体
//!
//! 一个工具调用智能体：本地工具组和/或 MCP 服务器提供的工具。
//!
//! 启动: cargo run --bin mas-agent -- --mcp "mas-mcp --server documents" --query "Analyze ~/notes.md"

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use mas::agent::{close_mcp_clients, create_tool_agent, create_tool_registry};
use mas::config::{load_config, McpServerConfig};
use mas::memory::{Message, Role};
use mas::pipeline::prompts::SUPERVISOR_PROMPT;
use mas::tools::ToolGroup;

#[derive(Parser)]
#[command(name = "mas-agent")]
#[command(about = "Run a single tool-calling agent over local tools and MCP servers")]
struct Args {
    /// Question for the agent
    #[arg(short, long)]
    query: String,

    /// Local tool group (documents, math, text, playground, mas, combined)
    #[arg(short, long)]
    group: Option<ToolGroup>,

    /// MCP server command line, e.g. "mas-mcp --server math" (repeatable)
    #[arg(long = "mcp")]
    mcp: Vec<String>,

    /// System prompt for the agent
    #[arg(long, default_value = SUPERVISOR_PROMPT)]
    system_prompt: String,

    /// Use the offline mock LLM
    #[arg(long)]
    mock: bool,

    /// Extra config file (overrides config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn parse_mcp_command(index: usize, line: &str) -> Option<McpServerConfig> {
    let mut parts = line.split_whitespace().map(String::from);
    let command = parts.next()?;
    Some(McpServerConfig {
        name: format!("cli-{}", index),
        command,
        args: parts.collect(),
        env: HashMap::new(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    mas::observability::init();

    let args = Args::parse();
    let mut cfg = load_config(args.config.clone()).context("Failed to load config")?;
    if args.mock {
        cfg.llm.provider = "mock".to_string();
    }
    cfg.mcp
        .servers
        .extend(args.mcp.iter().enumerate().filter_map(|(i, l)| parse_mcp_command(i, l)));

    let (registry, clients) = create_tool_registry(&cfg, args.group).await;
    if registry.is_empty() {
        tracing::warn!("no tools available; the agent can only answer directly");
    }

    println!("Available tools:");
    for name in registry.tool_names() {
        println!("  - {}", name);
    }

    let agent = create_tool_agent(&cfg, registry, &args.system_prompt, None);
    let result = agent.invoke(&[Message::user(args.query.as_str())]).await;
    close_mcp_clients(clients).await;
    let run = result.context("Agent run failed")?;

    println!("Agent response:");
    for message in run.messages.iter().filter(|m| m.role == Role::Assistant) {
        println!("\n{}", message.content);
    }

    Ok(())
}
