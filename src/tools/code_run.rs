//! run_code 工具：在临时目录中用配置的解释器执行代码片段
//!
//! 代码写入 TempDir 后执行，清空环境变量（仅保留 PATH），带超时与输出截断；
//! 子进程随 future drop 被 kill。所有失败以文本返回给模型。

use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tokio::process::Command;

use crate::tools::registry::{required_str, single_string_schema};
use crate::tools::Tool;

static CODE_FENCE_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// 去掉 Markdown 代码围栏（```python ... ```），无围栏时原样返回
pub fn strip_code_fences(code: &str) -> String {
    let fenced = CODE_FENCE_RE
        .get_or_init(|| Regex::new(r"(?s)^\s*```[\w+-]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").ok());
    match fenced.as_ref().and_then(|re| re.captures(code)) {
        Some(caps) => caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
        None => code.to_string(),
    }
}

fn script_extension(interpreter: &str) -> &'static str {
    let name = Path::new(interpreter)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(interpreter);
    if name.starts_with("python") {
        "py"
    } else if name.starts_with("node") {
        "js"
    } else if name.ends_with("sh") {
        "sh"
    } else {
        "txt"
    }
}

pub struct RunCodeTool {
    interpreter: String,
    timeout_secs: u64,
    max_output_chars: usize,
}

impl RunCodeTool {
    pub fn new(interpreter: impl Into<String>, timeout_secs: u64, max_output_chars: usize) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout_secs,
            max_output_chars,
        }
    }

    fn truncate(&self, out: String) -> String {
        if out.chars().count() > self.max_output_chars {
            out.chars().take(self.max_output_chars).collect::<String>() + "\n...[truncated]"
        } else {
            out
        }
    }

    async fn run(&self, code: &str) -> Result<String, String> {
        let dir = tempfile::tempdir().map_err(|e| format!("tempdir: {}", e))?;
        let script = dir
            .path()
            .join(format!("snippet.{}", script_extension(&self.interpreter)));
        tokio::fs::write(&script, code)
            .await
            .map_err(|e| format!("write snippet: {}", e))?;

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&script)
            .current_dir(dir.path())
            .env_clear()
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Ok(path) = std::env::var("PATH") {
            cmd.env("PATH", path);
        }

        let output = tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
            .map_err(|_| format!("execution timed out after {}s", self.timeout_secs))?
            .map_err(|e| format!("failed to start '{}': {}", self.interpreter, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

        let mut text = stdout;
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str("stderr: ");
            text.push_str(&stderr);
        }
        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            text = format!("Exit {}\n{}", code, text);
        }
        if text.is_empty() {
            text = "(no output)".to_string();
        }
        Ok(text)
    }
}

#[async_trait]
impl Tool for RunCodeTool {
    fn name(&self) -> &str {
        "run_code"
    }

    fn description(&self) -> &str {
        "Execute a Python code snippet in a sandbox and return its printed output. Use print() to show results."
    }

    fn parameters_schema(&self) -> Value {
        single_string_schema("code", "Source code to execute")
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let code = strip_code_fences(required_str(&args, "code")?);
        tracing::info!(interpreter = %self.interpreter, bytes = code.len(), "run code");
        Ok(match self.run(&code).await {
            Ok(out) => self.truncate(out),
            Err(e) => format!("execution error: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```python\nprint(1)\n```"), "print(1)");
        assert_eq!(strip_code_fences("  ```\na\nb\n```  "), "a\nb");
        assert_eq!(strip_code_fences("print(2)"), "print(2)");
    }

    #[test]
    fn test_script_extension() {
        assert_eq!(script_extension("/usr/bin/python3"), "py");
        assert_eq!(script_extension("node"), "js");
        assert_eq!(script_extension("bash"), "sh");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_shell_snippet() {
        let tool = RunCodeTool::new("sh", 10, 1000);
        let out = tool
            .execute(serde_json::json!({"code": "echo hello\necho oops >&2\nexit 3"}))
            .await
            .unwrap();
        assert_eq!(out, "Exit 3\nhello\nstderr: oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_environment_is_cleared() {
        std::env::set_var("MAS_SECRET_FOR_TEST", "leak");
        let tool = RunCodeTool::new("sh", 10, 1000);
        let out = tool
            .execute(serde_json::json!({"code": "echo \"[$MAS_SECRET_FOR_TEST]\""}))
            .await
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_snippet_times_out() {
        let tool = RunCodeTool::new("sh", 1, 1000);
        let started = std::time::Instant::now();
        let out = tool
            .execute(serde_json::json!({"code": "sleep 5\necho done"}))
            .await
            .unwrap();
        assert_eq!(out, "execution error: execution timed out after 1s");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_reported() {
        let tool = RunCodeTool::new("definitely-not-an-interpreter", 5, 1000);
        let out = tool
            .execute(serde_json::json!({"code": "1"}))
            .await
            .unwrap();
        assert!(out.starts_with("execution error: failed to start"));
    }

    #[test]
    fn test_truncate() {
        let tool = RunCodeTool::new("python3", 5, 3);
        assert_eq!(tool.truncate("abcdef".into()), "abc\n...[truncated]");
    }
}
