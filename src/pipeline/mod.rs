//! 多智能体流水线：planner → supervisor → validator →（重试或）summarizer
//!
//! 校验不通过时回到 supervisor，累计失败达到上限后强制进入总结，保证有限步内结束。

pub mod nodes;
pub mod prompts;
pub mod state;

use std::sync::Arc;

pub use nodes::{PlannerNode, SummarizerNode, SupervisorNode, ValidatorNode, PLANNER, SUMMARIZER, SUPERVISOR, VALIDATOR};
pub use prompts::Prompts;
pub use state::{is_valid_verdict, parse_plan, validation_routing, PipelineState, MAX_PLAN_STEPS, MAX_VALIDATION_FAILURES};

use crate::config::PipelineSection;
use crate::llm::LlmClient;
use crate::react::{EventSender, ToolAgent};
use crate::workflow::{CompiledGraph, GraphBuilder, WorkflowError, DEFAULT_RECURSION_LIMIT, END, START};

/// 条件边分支键
pub const ROUTE_ACCEPT: &str = "accept";
pub const ROUTE_RETRY: &str = "retry";

/// 流水线结构参数
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub max_plan_steps: usize,
    pub max_validation_failures: u32,
    /// 交给工具智能体的消息前缀长度；None 表示全部
    pub supervisor_context_messages: Option<usize>,
    /// false 时 validator 直连 summarizer
    pub retry_on_invalid: bool,
    pub recursion_limit: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_plan_steps: MAX_PLAN_STEPS,
            max_validation_failures: MAX_VALIDATION_FAILURES,
            supervisor_context_messages: Some(2),
            retry_on_invalid: true,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

impl From<&PipelineSection> for PipelineSettings {
    fn from(section: &PipelineSection) -> Self {
        Self {
            max_plan_steps: section.max_plan_steps,
            max_validation_failures: section.max_validation_failures,
            supervisor_context_messages: match section.supervisor_context_messages {
                0 => None,
                n => Some(n),
            },
            retry_on_invalid: section.retry_on_invalid,
            recursion_limit: section.recursion_limit,
        }
    }
}

/// 组装流水线所需的全部组件
pub struct PipelineComponents {
    pub planner_llm: Arc<dyn LlmClient>,
    pub validator_llm: Arc<dyn LlmClient>,
    pub summarizer_llm: Arc<dyn LlmClient>,
    /// 监督者使用的工具智能体（持有自己的 LLM 与工具）
    pub agent: Arc<ToolAgent>,
    pub prompts: Prompts,
    pub settings: PipelineSettings,
    pub event_tx: Option<EventSender>,
}

/// 构建并编译流水线图
pub fn build_pipeline(components: PipelineComponents) -> Result<CompiledGraph<PipelineState>, WorkflowError> {
    let PipelineComponents {
        planner_llm,
        validator_llm,
        summarizer_llm,
        agent,
        prompts,
        settings,
        event_tx,
    } = components;
    let prompts = Arc::new(prompts);

    let builder = GraphBuilder::new("mas-pipeline")
        .add_node(
            PLANNER,
            PlannerNode::new(planner_llm, prompts.planner.clone(), settings.max_plan_steps, event_tx.clone()),
        )
        .add_node(
            SUPERVISOR,
            SupervisorNode::new(agent, settings.supervisor_context_messages, event_tx.clone()),
        )
        .add_node(
            VALIDATOR,
            ValidatorNode::new(validator_llm, prompts.validator.clone(), event_tx.clone()),
        )
        .add_node(SUMMARIZER, SummarizerNode::new(summarizer_llm, prompts.clone(), event_tx))
        .add_edge(START, PLANNER)
        .add_edge(PLANNER, SUPERVISOR)
        .add_edge(SUPERVISOR, VALIDATOR)
        .add_edge(SUMMARIZER, END)
        .with_recursion_limit(settings.recursion_limit);

    let builder = if settings.retry_on_invalid {
        let max_failures = settings.max_validation_failures;
        builder.add_conditional_edges(
            VALIDATOR,
            move |state: &PipelineState| {
                if validation_routing(state, max_failures) {
                    ROUTE_ACCEPT.to_string()
                } else {
                    ROUTE_RETRY.to_string()
                }
            },
            [(ROUTE_ACCEPT, SUMMARIZER), (ROUTE_RETRY, SUPERVISOR)],
        )
    } else {
        builder.add_edge(VALIDATOR, SUMMARIZER)
    };

    builder.compile()
}
