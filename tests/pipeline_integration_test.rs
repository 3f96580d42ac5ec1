//! 流水线集成测试：每个节点使用 ScriptedLlmClient，不访问网络

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mas::llm::ScriptedLlmClient;
    use mas::memory::Role;
    use mas::pipeline::prompts::SUPERVISOR_PROMPT;
    use mas::pipeline::{
        build_pipeline, PipelineComponents, PipelineSettings, PipelineState, Prompts, PLANNER,
        SUMMARIZER, SUPERVISOR, VALIDATOR,
    };
    use mas::react::{EventSender, PipelineEvent, ToolAgent};
    use mas::tools::{CalcTool, ToolExecutor, ToolRegistry};
    use mas::workflow::WorkflowError;
    use tokio::sync::mpsc;

    const QUERY: &str = "calculate 21*2 and format the answer in one paragraph, use the calculator.";
    const CALC_CALL: &str = r#"{"tool": "calc", "args": {"expr": "21*2"}}"#;

    struct Llms {
        planner: Arc<ScriptedLlmClient>,
        supervisor: Arc<ScriptedLlmClient>,
        validator: Arc<ScriptedLlmClient>,
        summarizer: Arc<ScriptedLlmClient>,
    }

    impl Llms {
        fn new(supervisor: &[&str], validator: &[&str]) -> Self {
            Self {
                planner: Arc::new(ScriptedLlmClient::new(["- use calc\n- • format the answer\n\n"])),
                supervisor: Arc::new(ScriptedLlmClient::new(supervisor.iter().copied())),
                validator: Arc::new(ScriptedLlmClient::new(validator.iter().copied())),
                summarizer: Arc::new(ScriptedLlmClient::new(["21*2 is 42."])),
            }
        }

        fn components(&self, settings: PipelineSettings, event_tx: Option<EventSender>) -> PipelineComponents {
            let mut registry = ToolRegistry::new();
            registry.register(CalcTool);
            let executor = Arc::new(ToolExecutor::new(registry, 5));
            let mut agent = ToolAgent::new(self.supervisor.clone(), executor, SUPERVISOR_PROMPT);
            if let Some(tx) = event_tx.clone() {
                agent = agent.with_event_tx(tx);
            }

            PipelineComponents {
                planner_llm: self.planner.clone(),
                validator_llm: self.validator.clone(),
                summarizer_llm: self.summarizer.clone(),
                agent: Arc::new(agent),
                prompts: Prompts::default(),
                settings,
                event_tx,
            }
        }
    }

    #[tokio::test]
    async fn test_retry_stops_after_two_failures() {
        let llms = Llms::new(
            &[CALC_CALL, "The answer is 42.", "Still 42."],
            &[r#"{"valid": false, "comment": "not a paragraph"}"#, "{valid: False}"],
        );
        let graph = build_pipeline(llms.components(PipelineSettings::default(), None)).unwrap();

        let state = graph.invoke(PipelineState::new(QUERY)).await.unwrap();

        assert_eq!(state.plan, Some(vec!["use calc".to_string(), "format the answer".to_string()]));
        assert_eq!(state.validation_fail_count, 2);
        assert_eq!(state.validated, Some(false));
        assert_eq!(state.draft.as_deref(), Some("Still 42."));
        assert_eq!(state.summary.as_deref(), Some("21*2 is 42."));

        // planner + 2×(supervisor + validator) + summarizer
        assert_eq!(llms.planner.call_count(), 1);
        assert_eq!(llms.supervisor.call_count(), 3);
        assert_eq!(llms.validator.call_count(), 2);
        assert_eq!(llms.summarizer.call_count(), 1);
        assert_eq!(llms.supervisor.remaining(), 0);

        let roles: Vec<Role> = state.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::User,
                Role::Assistant, // plan
                Role::Assistant, // tool call
                Role::Tool,
                Role::Assistant, // first draft
                Role::Assistant, // [validator]
                Role::Assistant, // second draft
                Role::Assistant, // [validator]
                Role::Assistant, // [summary]
            ]
        );
        assert_eq!(state.messages[3].content, "Observation from calc: 42");
        assert!(state.messages[5].content.starts_with("[validator] "));
        assert_eq!(state.messages[8].content, "[summary] 21*2 is 42.");
    }

    #[tokio::test]
    async fn test_supervisor_sees_only_transcript_prefix() {
        let llms = Llms::new(&["first draft", "second draft"], &["false", "false"]);
        let graph = build_pipeline(llms.components(PipelineSettings::default(), None)).unwrap();
        graph.invoke(PipelineState::new(QUERY)).await.unwrap();

        let requests = llms.supervisor.requests();
        assert_eq!(requests.len(), 2);
        for request in &requests {
            // system + 用户问题 + 计划
            assert_eq!(request.len(), 3);
            assert_eq!(request[0].role, Role::System);
            assert_eq!(request[1].content, QUERY);
        }
    }

    #[tokio::test]
    async fn test_whole_transcript_when_prefix_disabled() {
        let llms = Llms::new(&["first draft", "second draft"], &["false", "true"]);
        let settings = PipelineSettings {
            supervisor_context_messages: None,
            ..PipelineSettings::default()
        };
        let graph = build_pipeline(llms.components(settings, None)).unwrap();
        graph.invoke(PipelineState::new(QUERY)).await.unwrap();

        let requests = llms.supervisor.requests();
        // 第二次运行时已有：用户问题、计划、草稿、[validator]
        assert_eq!(requests[1].len(), 5);
        assert_eq!(requests[1][4].content, "[validator] false");
    }

    #[tokio::test]
    async fn test_valid_first_draft_goes_straight_to_summary() {
        let llms = Llms::new(&["42"], &[r#"{"valid": true, "comment": "ok"}"#]);
        let graph = build_pipeline(llms.components(PipelineSettings::default(), None)).unwrap();

        let state = graph.invoke(PipelineState::new(QUERY)).await.unwrap();

        assert_eq!(state.validated, Some(true));
        assert_eq!(state.validation_fail_count, 0);
        assert_eq!(llms.supervisor.call_count(), 1);

        let validator_request = &llms.validator.requests()[0];
        assert_eq!(validator_request.len(), 2);
        assert_eq!(validator_request[0].role, Role::System);
        assert_eq!(validator_request[1].role, Role::User);
        assert_eq!(validator_request[1].content, "42");

        let summary_request = &llms.summarizer.requests()[0];
        assert_eq!(summary_request.len(), 1);
        assert_eq!(summary_request[0].role, Role::System);
        assert!(summary_request[0].content.contains("[user] calculate 21*2"));
        assert!(summary_request[0].content.contains("[assistant] [validator] "));
    }

    #[tokio::test]
    async fn test_recovers_after_one_failure() {
        let llms = Llms::new(&["draft one", "draft two"], &["False", "TRUE"]);
        let graph = build_pipeline(llms.components(PipelineSettings::default(), None)).unwrap();

        let state = graph.invoke(PipelineState::new(QUERY)).await.unwrap();

        assert_eq!(state.validated, Some(true));
        assert_eq!(state.validation_fail_count, 1);
        assert_eq!(state.draft.as_deref(), Some("draft two"));
    }

    #[tokio::test]
    async fn test_linear_variant_never_retries() {
        let llms = Llms::new(&["draft"], &["false"]);
        let settings = PipelineSettings {
            retry_on_invalid: false,
            ..PipelineSettings::default()
        };
        let graph = build_pipeline(llms.components(settings, None)).unwrap();

        let state = graph.invoke(PipelineState::new(QUERY)).await.unwrap();

        assert_eq!(state.validated, Some(false));
        assert_eq!(state.validation_fail_count, 1);
        assert_eq!(llms.supervisor.call_count(), 1);
        assert_eq!(llms.validator.remaining(), 0);
        assert!(state.summary.is_some());
        assert!(!graph.draw_mermaid().contains("retry"));
    }

    #[tokio::test]
    async fn test_model_failure_aborts_run() {
        let llms = Llms::new(&["draft"], &[]);
        let graph = build_pipeline(llms.components(PipelineSettings::default(), None)).unwrap();

        let err = graph.invoke(PipelineState::new(QUERY)).await.unwrap_err();

        assert!(matches!(err, WorkflowError::NodeFailed { ref node, .. } if node == VALIDATOR));
        assert_eq!(llms.summarizer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_events_follow_node_order() {
        let llms = Llms::new(&[CALC_CALL, "42"], &["true"]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let graph = build_pipeline(llms.components(PipelineSettings::default(), Some(tx))).unwrap();

        graph.invoke(PipelineState::new(QUERY)).await.unwrap();
        drop(graph);

        let mut events = Vec::new();
        while let Some(ev) = rx.recv().await {
            events.push(ev);
        }

        let nodes: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::NodeStarted { node } => Some(node.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(nodes, vec![PLANNER, SUPERVISOR, VALIDATOR, SUMMARIZER]);

        assert!(events.iter().any(|e| matches!(e, PipelineEvent::ToolCall { tool, .. } if tool == "calc")));
        assert!(events.iter().any(
            |e| matches!(e, PipelineEvent::Observation { preview, .. } if preview == "42")
        ));
        assert!(events.contains(&PipelineEvent::Validation {
            valid: true,
            fail_count: 0,
            comment: "true".to_string(),
        }));
    }

    #[test]
    fn test_pipeline_graph_shape() {
        let llms = Llms::new(&[], &[]);
        let graph = build_pipeline(llms.components(PipelineSettings::default(), None)).unwrap();

        assert_eq!(graph.node_names(), &[PLANNER, SUPERVISOR, VALIDATOR, SUMMARIZER]);
        assert_eq!(graph.recursion_limit(), PipelineSettings::default().recursion_limit);
        let mermaid = graph.draw_mermaid();
        assert!(mermaid.contains("\tvalidator -. &nbsp;retry&nbsp; .-> supervisor;"));
        assert!(mermaid.contains("\tvalidator -. &nbsp;accept&nbsp; .-> summarizer;"));
    }
}
