//! 工具调用智能体（ReAct 循环）
//!
//! Plan -> Act (Tool) -> Observe -> 下一轮 Plan，直到模型给出纯文本回复或达到最大步数。
//! 工具失败 / 超时 / 未注册都写成 "Error: ..." 观察结果交还模型；JSON 格式错误经 RecoveryEngine 注入重试提示；
//! 模型调用失败直接向上传播。

use std::sync::Arc;

use crate::core::{AgentError, RecoveryAction, RecoveryEngine};
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::react::events::{preview, send_event, EventSender, PipelineEvent};
use crate::react::planner::{parse_llm_output, Planner, PlannerOutput};
use crate::tools::{tool_call_schema_json, ToolExecutor};

/// 单次调用内默认最大推理步数，防止死循环
pub const DEFAULT_MAX_STEPS: usize = 8;
/// Observation 事件预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 一次调用的结果：仅包含智能体新产生的消息（工具调用、观察、最终回复）
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub messages: Vec<Message>,
    pub output: String,
}

/// 工具调用智能体：持有 Planner、共享的 ToolExecutor 与恢复引擎
pub struct ToolAgent {
    planner: Planner,
    executor: Arc<ToolExecutor>,
    recovery: RecoveryEngine,
    max_steps: usize,
    event_tx: Option<EventSender>,
}

impl ToolAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        executor: Arc<ToolExecutor>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            planner: Planner::new(llm, system_prompt),
            executor,
            recovery: RecoveryEngine::new(),
            max_steps: DEFAULT_MAX_STEPS,
            event_tx: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_event_tx(mut self, tx: EventSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.executor.tool_names()
    }

    /// 基础 prompt + 工具目录 + 调用格式
    pub fn system_prompt(&self) -> String {
        format!(
            "{}\n\n## Available tools\n{}\n\n## Tool call format\n\
             To call a tool, reply with exactly one JSON object matching this schema and nothing else:\n{}\n\
             After each call you receive an observation. When you have enough information, \
             reply with the final answer as plain text without JSON.",
            self.planner.base_system_prompt(),
            self.executor.registry().to_schema_json(),
            tool_call_schema_json()
        )
    }

    /// 以 input 为上下文运行一次智能体
    pub async fn invoke(&self, input: &[Message]) -> Result<AgentRun, AgentError> {
        let system = self.system_prompt();
        let tool_names = self.tool_names();
        let mut produced: Vec<Message> = Vec::new();
        let mut last_output = String::new();

        for step in 0..self.max_steps {
            let mut messages = input.to_vec();
            messages.extend(produced.iter().cloned());

            let output = self.planner.plan_with_system(&messages, &system).await?;
            tracing::debug!(step, chars = output.len(), "tool agent step");
            last_output = output.clone();

            match parse_llm_output(&output) {
                Ok(PlannerOutput::Response(text)) => {
                    produced.push(Message::assistant(text.clone()));
                    return Ok(AgentRun {
                        messages: produced,
                        output: text,
                    });
                }
                Ok(PlannerOutput::ToolCall(tc)) => {
                    send_event(
                        &self.event_tx,
                        PipelineEvent::ToolCall {
                            tool: tc.tool.clone(),
                            args: tc.args.clone(),
                        },
                    );
                    produced.push(Message::assistant(output.trim().to_string()));

                    let observation = match self.executor.execute(&tc.tool, tc.args).await {
                        Ok(result) => result,
                        Err(e) => {
                            tracing::warn!(tool = %tc.tool, error = %e, "tool call failed");
                            match self.recovery.handle(&e, &tool_names) {
                                RecoveryAction::RetryWithPrompt(prompt) => format!("Error: {}", prompt),
                                RecoveryAction::Abort => format!("Error: {}", e),
                            }
                        }
                    };
                    send_event(
                        &self.event_tx,
                        PipelineEvent::Observation {
                            tool: tc.tool.clone(),
                            preview: preview(&observation, OBSERVATION_PREVIEW_CHARS),
                        },
                    );
                    produced.push(Message::tool(format!(
                        "Observation from {}: {}",
                        tc.tool, observation
                    )));
                }
                Err(e) => match self.recovery.handle(&e, &tool_names) {
                    RecoveryAction::RetryWithPrompt(prompt) => {
                        tracing::warn!(error = %e, "malformed tool call, retrying with hint");
                        // 先记录模型原话，再附纠正提示
                        produced.push(Message::assistant(output.trim().to_string()));
                        produced.push(Message::user(prompt));
                    }
                    RecoveryAction::Abort => return Err(e),
                },
            }
        }

        tracing::warn!(max_steps = self.max_steps, "tool agent reached step limit");
        Ok(AgentRun {
            messages: produced,
            output: last_output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, ScriptedLlmClient};
    use crate::memory::Role;
    use crate::tools::{CalcTool, ToolRegistry};

    fn agent(llm: Arc<ScriptedLlmClient>) -> ToolAgent {
        let mut registry = ToolRegistry::new();
        registry.register(CalcTool);
        ToolAgent::new(llm, Arc::new(ToolExecutor::new(registry, 5)), "you are a helpful ai assistant.")
    }

    #[tokio::test]
    async fn test_tool_call_then_answer() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "calc", "args": {"expr": "21*2"}}"#,
            "The answer is 42.",
        ]));
        let run = agent(llm.clone())
            .invoke(&[Message::user("calculate 21*2")])
            .await
            .unwrap();

        assert_eq!(run.output, "The answer is 42.");
        assert_eq!(run.messages.len(), 3);
        assert_eq!(run.messages[1].role, Role::Tool);
        assert_eq!(run.messages[1].content, "Observation from calc: 42");

        let requests = llm.requests();
        assert!(requests[0][0].content.contains("\"calc\""));
        assert_eq!(requests[1].last().unwrap().content, "Observation from calc: 42");
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_observation() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "python", "args": {}}"#,
            "done",
        ]));
        let run = agent(llm).invoke(&[Message::user("q")]).await.unwrap();
        let observation = &run.messages[1].content;
        assert!(observation.starts_with("Observation from python: Error: Tool 'python' does not exist"));
        assert!(observation.contains("calc"));
        assert_eq!(run.output, "done");
    }

    #[tokio::test]
    async fn test_malformed_json_gets_retry_prompt() {
        let bad = r#"{"tool": "calc", "args": }"#;
        let llm = Arc::new(ScriptedLlmClient::new([bad, "ok"]));
        let run = agent(llm.clone()).invoke(&[Message::user("q")]).await.unwrap();
        assert_eq!(run.messages[0].role, Role::Assistant);
        assert_eq!(run.messages[0].content, bad);
        assert_eq!(run.messages[1].role, Role::User);
        assert!(run.messages[1].content.contains("not valid JSON"));
        assert_eq!(run.output, "ok");

        // 第二次请求里先是模型的错误输出，再是纠正提示
        let retry = &llm.requests()[1];
        assert_eq!(retry[retry.len() - 2].content, bad);
        assert!(retry[retry.len() - 1].content.contains("not valid JSON"));
    }

    #[tokio::test]
    async fn test_code_answer_is_final_output() {
        let answer = "Use this:\nfn main() { println!(\"42\"); }";
        let llm = Arc::new(ScriptedLlmClient::new([answer]));
        let run = agent(llm.clone())
            .invoke(&[Message::user("write a rust program printing 42")])
            .await
            .unwrap();
        assert_eq!(run.output, answer);
        assert_eq!(run.messages.len(), 1);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let llm = Arc::new(ScriptedLlmClient::new(Vec::<String>::new()));
        let err = agent(llm).invoke(&[Message::user("q")]).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(LlmError::Exhausted)));
    }

    #[tokio::test]
    async fn test_step_limit_returns_last_output() {
        let call = r#"{"tool": "calc", "args": {"expr": "1+1"}}"#;
        let llm = Arc::new(ScriptedLlmClient::new([call, call]));
        let run = agent(llm)
            .with_max_steps(2)
            .invoke(&[Message::user("loop")])
            .await
            .unwrap();
        assert_eq!(run.output, call);
        assert_eq!(run.messages.len(), 4);
    }
}
