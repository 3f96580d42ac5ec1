//! 工具执行器
//!
//! 持有 ToolRegistry 与全局超时，execute(tool_name, args) 在超时内调用工具，
//! 未注册 / 超时 / 失败 / panic 时转为 AgentError；每次调用输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::{Tool, ToolRegistry};

/// 工具执行器：对每次调用施加超时，并将结果映射为 AgentError
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行指定工具：未注册返回 HallucinatedTool，超时返回 ToolTimeout，
    /// 工具返回 Err 或 panic 转为 ToolExecutionFailed；输出 JSON 审计日志
    pub async fn execute(
        &self,
        tool_name: &str,
        args: serde_json::Value,
    ) -> Result<String, AgentError> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| AgentError::HallucinatedTool(tool_name.to_string()))?;

        let start = Instant::now();
        let args_preview = args_preview(&args);
        // 独立 task 执行，工具 panic 不会拖垮调用方
        let mut handle = tokio::spawn(async move { tool.execute(args).await });
        let result = timeout(self.timeout, &mut handle).await;
        if result.is_err() {
            // 超时后取消任务，不让工具在后台继续运行
            handle.abort();
        }

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(Ok(_))) => (true, "ok"),
            Ok(Ok(Err(_))) => (false, "error"),
            Ok(Err(_)) => (false, "panic"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(Ok(content))) => Ok(content),
            Ok(Ok(Err(reason))) => Err(AgentError::ToolExecutionFailed {
                tool: tool_name.to_string(),
                reason,
            }),
            Ok(Err(join)) => Err(AgentError::ToolExecutionFailed {
                tool: tool_name.to_string(),
                reason: format!("panicked: {}", join),
            }),
            Err(_) => Err(AgentError::ToolTimeout {
                tool: tool_name.to_string(),
                secs: self.timeout.as_secs(),
            }),
        }
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.registry.get(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    struct Slow {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Tool for Slow {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "sleeps"
        }
        async fn execute(&self, _args: Value) -> Result<String, String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok("late".to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl Tool for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        async fn execute(&self, _args: Value) -> Result<String, String> {
            Err("boom".to_string())
        }
    }

    fn executor_with_flag(finished: Arc<AtomicBool>) -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(Slow { finished });
        registry.register(Failing);
        ToolExecutor::new(registry, 1)
    }

    fn executor() -> ToolExecutor {
        executor_with_flag(Arc::new(AtomicBool::new(false)))
    }

    #[tokio::test]
    async fn test_unknown_tool_is_hallucinated() {
        let err = executor().execute("missing", Value::Null).await.unwrap_err();
        assert!(matches!(err, AgentError::HallucinatedTool(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_tool_error_maps_to_execution_failed() {
        let err = executor().execute("failing", Value::Null).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolExecutionFailed { reason, .. } if reason == "boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let finished = Arc::new(AtomicBool::new(false));
        let err = executor_with_flag(finished.clone())
            .execute("slow", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolTimeout { ref tool, secs: 1 } if tool == "slow"));

        // 超时的任务已被取消，时间推进后也不会跑完
        tokio::time::sleep(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
