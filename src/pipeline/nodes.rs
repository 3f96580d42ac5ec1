//! 四个流水线节点：规划、监督（工具智能体）、校验、总结
//!
//! 每个节点持有自己的 LLM 客户端（温度各不相同），把结果写回 PipelineState 并推送过程事件。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{render_transcript, Message};
use crate::pipeline::prompts::Prompts;
use crate::pipeline::state::{is_valid_verdict, parse_plan, PipelineState};
use crate::react::events::{send_event, EventSender, PipelineEvent};
use crate::react::ToolAgent;
use crate::workflow::Node;

pub const PLANNER: &str = "planner";
pub const SUPERVISOR: &str = "supervisor";
pub const VALIDATOR: &str = "validator";
pub const SUMMARIZER: &str = "summarizer";

fn started(tx: &Option<EventSender>, node: &str) {
    send_event(tx, PipelineEvent::NodeStarted { node: node.to_string() });
}

/// 规划：[system(planner)] + 对话记录 → 步骤列表
pub struct PlannerNode {
    llm: Arc<dyn LlmClient>,
    prompt: String,
    max_steps: usize,
    event_tx: Option<EventSender>,
}

impl PlannerNode {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompt: impl Into<String>,
        max_steps: usize,
        event_tx: Option<EventSender>,
    ) -> Self {
        Self {
            llm,
            prompt: prompt.into(),
            max_steps,
            event_tx,
        }
    }
}

#[async_trait]
impl Node<PipelineState> for PlannerNode {
    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        started(&self.event_tx, PLANNER);
        let mut request = vec![Message::system(self.prompt.clone())];
        request.extend(state.messages.iter().cloned());

        let reply = self.llm.complete(&request).await?;
        let plan = parse_plan(&reply, self.max_steps);
        tracing::info!(steps = plan.as_ref().map_or(0, Vec::len), "plan ready");

        send_event(&self.event_tx, PipelineEvent::Plan { steps: plan.clone() });
        state.messages.push(Message::assistant(reply));
        state.plan = plan;
        Ok(state)
    }
}

/// 监督：把对话记录前缀交给工具智能体，产出的消息全部追加，最后一条作为草稿
pub struct SupervisorNode {
    agent: Arc<ToolAgent>,
    /// None 表示转发全部消息
    context_messages: Option<usize>,
    event_tx: Option<EventSender>,
}

impl SupervisorNode {
    pub fn new(
        agent: Arc<ToolAgent>,
        context_messages: Option<usize>,
        event_tx: Option<EventSender>,
    ) -> Self {
        Self {
            agent,
            context_messages,
            event_tx,
        }
    }

    fn context<'a>(&self, messages: &'a [Message]) -> &'a [Message] {
        match self.context_messages {
            Some(n) => &messages[..n.min(messages.len())],
            None => messages,
        }
    }
}

#[async_trait]
impl Node<PipelineState> for SupervisorNode {
    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        started(&self.event_tx, SUPERVISOR);
        let run = self.agent.invoke(self.context(&state.messages)).await?;
        tracing::info!(
            produced = run.messages.len(),
            attempt = state.validation_fail_count + 1,
            "supervisor draft ready"
        );

        send_event(&self.event_tx, PipelineEvent::Draft { text: run.output.clone() });
        state.messages.extend(run.messages);
        state.draft = Some(run.output);
        Ok(state)
    }
}

/// 校验：[system(validator), user(draft)] → 是否通过，失败计数 +1
pub struct ValidatorNode {
    llm: Arc<dyn LlmClient>,
    prompt: String,
    event_tx: Option<EventSender>,
}

impl ValidatorNode {
    pub fn new(llm: Arc<dyn LlmClient>, prompt: impl Into<String>, event_tx: Option<EventSender>) -> Self {
        Self {
            llm,
            prompt: prompt.into(),
            event_tx,
        }
    }
}

#[async_trait]
impl Node<PipelineState> for ValidatorNode {
    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        started(&self.event_tx, VALIDATOR);
        let draft = state.draft.clone().unwrap_or_default();
        let reply = self
            .llm
            .complete(&[Message::system(self.prompt.clone()), Message::user(draft)])
            .await?;

        let valid = is_valid_verdict(&reply);
        if !valid {
            state.validation_fail_count += 1;
        }
        tracing::info!(valid, fail_count = state.validation_fail_count, "validation");

        send_event(
            &self.event_tx,
            PipelineEvent::Validation {
                valid,
                fail_count: state.validation_fail_count,
                comment: reply.clone(),
            },
        );
        state.messages.push(Message::assistant(format!("[validator] {}", reply)));
        state.validated = Some(valid);
        Ok(state)
    }
}

/// 总结：整段对话记录代入 {history}，只发送这一条 system 消息
pub struct SummarizerNode {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<Prompts>,
    event_tx: Option<EventSender>,
}

impl SummarizerNode {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<Prompts>, event_tx: Option<EventSender>) -> Self {
        Self {
            llm,
            prompts,
            event_tx,
        }
    }
}

#[async_trait]
impl Node<PipelineState> for SummarizerNode {
    async fn run(&self, mut state: PipelineState) -> Result<PipelineState, AgentError> {
        started(&self.event_tx, SUMMARIZER);
        let history = render_transcript(&state.messages);
        let system = self.prompts.render_summary(&history);
        let reply = self.llm.complete(&[Message::system(system)]).await?;

        send_event(&self.event_tx, PipelineEvent::Summary { text: reply.clone() });
        state.messages.push(Message::assistant(format!("[summary] {}", reply)));
        state.summary = Some(reply);
        Ok(state)
    }
}
