//! 运行时装配
//!
//! 供各二进制调用：create_llm 按配置选择后端（无密钥时退回 Mock），
//! create_tool_registry 构建工具组并接入 [[mcp.servers]] 中的远端工具，
//! create_pipeline 组装四节点流水线，run_query 跑一次查询并生成可保存的轨迹。

use std::path::Path;
use std::sync::Arc;

use crate::config::{AppConfig, McpSection};
use crate::llm::{create_openrouter_client, LlmClient, MockLlmClient, OpenAiClient};
use crate::mcp::McpClient;
use crate::memory::{RunTrace, TracePersistence};
use crate::pipeline::{build_pipeline, PipelineComponents, PipelineSettings, PipelineState, Prompts};
use crate::react::{EventSender, ToolAgent};
use crate::tools::{build_tool_group, ToolExecutor, ToolGroup, ToolRegistry};
use crate::workflow::{CompiledGraph, WorkflowError};

/// 按 [llm] 配置创建客户端；provider = "mock" 或缺少密钥时使用 MockLlmClient
pub fn create_llm(cfg: &AppConfig, model: Option<&str>, temperature: f32) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    if provider == "mock" {
        tracing::info!("Using Mock LLM");
        return Arc::new(MockLlmClient);
    }

    let Some(api_key) = cfg.llm.api_key.as_deref() else {
        tracing::warn!(provider = %provider, "No API key set, using Mock LLM");
        return Arc::new(MockLlmClient);
    };

    let model = model.unwrap_or(&cfg.llm.model);
    tracing::info!(provider = %provider, model = %model, temperature, "Using OpenAI-compatible LLM");

    let client = match (cfg.llm.base_url.as_deref(), provider.as_str()) {
        (None, "openrouter") => create_openrouter_client(Some(model), Some(api_key), temperature),
        (base_url, _) => OpenAiClient::new(base_url, model, Some(api_key)).with_temperature(temperature),
    };
    Arc::new(client.with_timeout(cfg.llm.timeouts.request))
}

/// 视觉模型：llm.vision_model，未设置时与主模型相同
pub fn create_vision_llm(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    create_llm(cfg, cfg.llm.vision_model.as_deref(), 0.0)
}

/// 连接全部 [[mcp.servers]] 并把远端工具注册进 registry；连接失败的服务器告警后跳过
pub async fn connect_mcp_servers(section: &McpSection, registry: &mut ToolRegistry) -> Vec<McpClient> {
    let mut clients = Vec::new();
    for server in &section.servers {
        let client = match McpClient::connect_config(server).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(server = %server.name, error = %e, "MCP server unavailable, skipped");
                continue;
            }
        };
        match client.discover_tools().await {
            Ok(tools) => {
                for tool in tools {
                    if registry.contains(tool.name()) {
                        tracing::warn!(server = %server.name, tool = %tool.name(), "tool name already registered, remote tool ignored");
                        continue;
                    }
                    registry.register_arc(tool);
                }
                clients.push(client);
            }
            Err(e) => {
                tracing::warn!(server = %server.name, error = %e, "MCP tool discovery failed");
                if let Err(e) = client.close().await {
                    tracing::debug!(error = %e, "MCP close failed");
                }
            }
        }
    }
    clients
}

/// 关闭 MCP 连接（子进程随之退出）
pub async fn close_mcp_clients(clients: Vec<McpClient>) {
    for client in clients {
        if let Err(e) = client.close().await {
            tracing::debug!(error = %e, "MCP close failed");
        }
    }
}

/// 工具注册表：本地工具组（可选）+ MCP 远端工具
pub async fn create_tool_registry(
    cfg: &AppConfig,
    group: Option<ToolGroup>,
) -> (ToolRegistry, Vec<McpClient>) {
    let mut registry = match group {
        Some(g) => build_tool_group(g, &cfg.tools, create_vision_llm(cfg)),
        None => ToolRegistry::new(),
    };
    let clients = connect_mcp_servers(&cfg.mcp, &mut registry).await;
    tracing::info!(tools = ?registry.tool_names(), mcp_servers = clients.len(), "tool registry ready");
    (registry, clients)
}

/// 工具智能体：supervisor 温度、max_agent_steps、给定 prompt
pub fn create_tool_agent(
    cfg: &AppConfig,
    registry: ToolRegistry,
    system_prompt: &str,
    event_tx: Option<EventSender>,
) -> ToolAgent {
    let llm = create_llm(cfg, None, cfg.pipeline.temperatures.supervisor);
    let executor = Arc::new(ToolExecutor::new(registry, cfg.tools.tool_timeout_secs));
    let agent = ToolAgent::new(llm, executor, system_prompt).with_max_steps(cfg.pipeline.max_agent_steps);
    match event_tx {
        Some(tx) => agent.with_event_tx(tx),
        None => agent,
    }
}

/// 组装好的流水线与需要在结束时关闭的 MCP 连接
pub struct PipelineRuntime {
    pub graph: CompiledGraph<PipelineState>,
    pub mcp_clients: Vec<McpClient>,
}

impl PipelineRuntime {
    pub async fn shutdown(self) {
        close_mcp_clients(self.mcp_clients).await;
    }
}

/// 按配置构建流水线：各节点独立温度的 LLM，supervisor 使用给定工具组
pub async fn create_pipeline(
    cfg: &AppConfig,
    group: ToolGroup,
    event_tx: Option<EventSender>,
) -> Result<PipelineRuntime, WorkflowError> {
    let prompts = Prompts::load(cfg.pipeline.prompts_dir.as_deref());
    let temps = &cfg.pipeline.temperatures;

    let (registry, mcp_clients) = create_tool_registry(cfg, Some(group)).await;
    let agent = create_tool_agent(cfg, registry, &prompts.supervisor, event_tx.clone());

    let components = PipelineComponents {
        planner_llm: create_llm(cfg, None, temps.planner),
        validator_llm: create_llm(cfg, None, temps.validator),
        summarizer_llm: create_llm(cfg, None, temps.summarizer),
        agent: Arc::new(agent),
        prompts,
        settings: PipelineSettings::from(&cfg.pipeline),
        event_tx,
    };
    let graph = build_pipeline(components)?;
    Ok(PipelineRuntime { graph, mcp_clients })
}

/// 跑一次查询
pub async fn run_query(
    graph: &CompiledGraph<PipelineState>,
    query: &str,
) -> Result<PipelineState, WorkflowError> {
    tracing::info!(
        query = %query,
        graph = %graph.name(),
        recursion_limit = graph.recursion_limit(),
        "pipeline started"
    );
    let state = graph.invoke(PipelineState::new(query)).await?;
    tracing::info!(
        messages = state.messages.len(),
        validated = ?state.validated,
        fail_count = state.validation_fail_count,
        "pipeline finished"
    );
    Ok(state)
}

/// 由最终状态生成轨迹
pub fn trace_from_state(query: &str, state: &PipelineState) -> RunTrace {
    RunTrace {
        id: uuid::Uuid::new_v4().to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
        query: query.to_string(),
        observations: state.messages.clone(),
        summary: state.summary.clone(),
    }
}

/// 保存轨迹到目录，返回文件路径
pub fn save_trace(dir: &Path, trace: &RunTrace) -> anyhow::Result<std::path::PathBuf> {
    TracePersistence::new(dir).save(trace)
}
