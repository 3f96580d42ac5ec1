//! MAS - 多智能体流水线与 MCP 工具服务器
//!
//! 模块划分：
//! - **agent**: 运行时装配（按配置创建 LLM、工具注册表、流水线）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与恢复策略
//! - **judge**: LLM-as-judge，离线评估运行轨迹
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / OpenRouter / Mock）
//! - **mcp**: Model Context Protocol 服务端与客户端（stdio）
//! - **memory**: 对话记录与运行轨迹持久化
//! - **observability**: 日志初始化
//! - **pipeline**: planner → supervisor → validator → summarizer 流水线
//! - **react**: Tool Call 解析与工具调用智能体
//! - **tools**: 工具箱（搜索、计算、文档、图片、代码执行、文本）与执行器
//! - **workflow**: 通用状态图（节点、条件边、递归上限、Mermaid 导出）

pub mod agent;
pub mod config;
pub mod core;
pub mod judge;
pub mod llm;
pub mod mcp;
pub mod memory;
pub mod observability;
pub mod pipeline;
pub mod react;
pub mod tools;
pub mod workflow;
