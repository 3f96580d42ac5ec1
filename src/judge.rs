//! LLM-as-judge：离线评估保存的运行轨迹
//!
//! 读取轨迹目录下的 `*.json`（`{"trace": {"observations": [...]}}`），逐个交给评审模型，
//! 要求按 TraceEval 的 JSON Schema 返回结论；汇总为 JudgeReport 并写出 validation.json。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::llm::{LlmClient, LlmError};
use crate::memory::Message;
use crate::react::extract_json_block;

#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid judge output: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid trace pattern: {0}")]
    Pattern(String),
}

/// 单条轨迹的评审结论
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TraceEval {
    /// True if final answer appears logically correct
    pub correct: bool,
    /// Confidence in judgment (0-1)
    pub confidence: f64,
    /// Specific problems detected
    #[serde(default)]
    pub issues: Vec<String>,
    /// Step-by-step reasoning
    #[serde(default)]
    pub explanation: String,
}

impl TraceEval {
    fn validate(self) -> Result<Self, JudgeError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(JudgeError::InvalidOutput(format!(
                "confidence {} outside 0..=1",
                self.confidence
            )));
        }
        Ok(self)
    }
}

/// validation.json 中的一项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgedTrace {
    pub file: String,
    pub eval: TraceEval,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JudgeReport {
    pub results: Vec<JudgedTrace>,
}

impl JudgeReport {
    pub fn correct(&self) -> usize {
        self.results.iter().filter(|r| r.eval.correct).count()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// 正确率（百分比）；没有结果时为 0
    pub fn percentage(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.correct() as f64 / self.total() as f64 * 100.0
        }
    }

    /// 写出结果列表（`[{file, eval}, ...]`）
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), JudgeError> {
        let json = serde_json::to_string_pretty(&self.results)
            .map_err(|e| JudgeError::InvalidOutput(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn judge_prompt(observations: &[Value]) -> String {
    let trace = serde_json::to_string_pretty(observations).unwrap_or_default();
    let schema = serde_json::to_string_pretty(&schema_for!(TraceEval)).unwrap_or_default();
    format!(
        r#"ANALYZE THIS AGENT TRACE AND JUDGE FINAL ANSWER VALIDITY:

EVALUATION CRITERIA (analyze trace only):
1. LOGICAL CORRECTNESS - Does final answer match initial task?
2. ERROR IMPACT - how many errors found? Critical vs minor?
3. COMPLEXITY - Excessively long/complex for simple task?
4. CONSISTENCY - Reasoning aligns with observations?
5. COMPLETENESS - Task fully resolved?

TRACE ({steps} steps):
{trace}

DETAILED ANALYSIS REQUIRED:
1. What was the task? (infer from first observation)
2. What is final answer? (last observation)
3. Are they logically consistent?
4. Did errors block success?
5. Signs of hallucination/confusion?

JUDGMENT:
- correct: True/False (final answer solves task)
- confidence: 0.0-1.0 (your certainty)
- issues: specific problems found
- explanation: your reasoning process

Respond with a single JSON object matching this JSON Schema:
{schema}"#,
        steps = observations.len(),
    )
}

/// 解析评审模型回复中的 TraceEval
pub fn parse_eval(reply: &str) -> Result<TraceEval, JudgeError> {
    let json = extract_json_block(reply)
        .ok_or_else(|| JudgeError::InvalidOutput(format!("no JSON object in: {}", reply)))?;
    let eval: TraceEval = serde_json::from_str(json)
        .map_err(|e| JudgeError::InvalidOutput(format!("{}: {}", e, json)))?;
    eval.validate()
}

pub struct TraceJudge {
    llm: Arc<dyn LlmClient>,
}

impl TraceJudge {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 评审一条轨迹
    pub async fn validate_trace(&self, observations: &[Value]) -> Result<TraceEval, JudgeError> {
        let prompt = judge_prompt(observations);
        let reply = self.llm.complete(&[Message::user(prompt)]).await?;
        parse_eval(&reply)
    }

    /// 评审目录下全部 `*.json` 轨迹（按文件名排序）；没有 observations 的文件跳过
    pub async fn evaluate_dir(&self, dir: impl AsRef<Path>) -> Result<JudgeReport, JudgeError> {
        let mut report = JudgeReport::default();
        for path in trace_files(dir.as_ref())? {
            let Some(observations) = read_observations(&path)? else {
                tracing::debug!(file = %path.display(), "no observations, skipped");
                continue;
            };
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let eval = self.validate_trace(&observations).await?;
            tracing::info!(file = %file, correct = eval.correct, confidence = eval.confidence, "trace judged");
            report.results.push(JudgedTrace { file, eval });
        }
        Ok(report)
    }
}

fn trace_files(dir: &Path) -> Result<Vec<PathBuf>, JudgeError> {
    let pattern = dir.join("*.json");
    let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .map_err(|e| JudgeError::Pattern(e.to_string()))?
        .filter_map(Result::ok)
        .collect();
    files.sort();
    Ok(files)
}

/// 读取 `trace.observations`；文件不是合法 JSON 时告警并视为没有 observations
fn read_observations(path: &Path) -> Result<Option<Vec<Value>>, JudgeError> {
    let data = std::fs::read_to_string(path)?;
    let value: Value = match serde_json::from_str(&data) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "invalid trace JSON");
            return Ok(None);
        }
    };
    match value.pointer("/trace/observations").and_then(Value::as_array) {
        Some(obs) if !obs.is_empty() => Ok(Some(obs.clone())),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;

    const VERDICT: &str = r#"{"correct": true, "confidence": 0.9, "issues": [], "explanation": "matches"}"#;

    #[test]
    fn test_parse_eval_fenced() {
        let eval = parse_eval(&format!("Verdict:\n```json\n{}\n```", VERDICT)).unwrap();
        assert!(eval.correct);
        assert_eq!(eval.confidence, 0.9);
    }

    #[test]
    fn test_parse_eval_rejects_confidence_out_of_range() {
        let err = parse_eval(r#"{"correct": false, "confidence": 1.5}"#).unwrap_err();
        assert!(matches!(err, JudgeError::InvalidOutput(_)));
    }

    #[test]
    fn test_parse_eval_without_json() {
        assert!(parse_eval("looks right to me").is_err());
    }

    #[test]
    fn test_prompt_contains_schema_and_step_count() {
        let prompt = judge_prompt(&[serde_json::json!("a"), serde_json::json!("b")]);
        assert!(prompt.contains("TRACE (2 steps)"));
        assert!(prompt.contains("\"confidence\""));
    }

    #[test]
    fn test_empty_report_percentage_is_zero() {
        let report = JudgeReport::default();
        assert_eq!(report.total(), 0);
        assert_eq!(report.percentage(), 0.0);
    }

    #[tokio::test]
    async fn test_evaluate_dir_skips_traces_without_observations() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"{"trace": {"observations": [{"role": "user", "content": "2+2"}, "4"]}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("a.json"), r#"{"trace": {"observations": []}}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let llm = Arc::new(ScriptedLlmClient::new([VERDICT]));
        let judge = TraceJudge::new(llm.clone());
        let report = judge.evaluate_dir(dir.path()).await.unwrap();

        assert_eq!(report.total(), 1);
        assert_eq!(report.results[0].file, "b.json");
        assert_eq!(report.correct(), 1);
        assert_eq!(report.percentage(), 100.0);
        assert_eq!(llm.call_count(), 1);

        let out = dir.path().join("validation.json");
        report.save(&out).unwrap();
        let saved: Vec<JudgedTrace> =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(saved.len(), 1);
    }
}
