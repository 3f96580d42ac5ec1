//! 各节点的 system prompt：内置默认值，可由目录下的 planner.txt / supervisor.txt / validator.txt / summary.txt 覆盖

use std::path::Path;

pub const PLANNER_PROMPT: &str =
    "you are the planner. provide a brief plan (3-6 steps) to solve the task. do not solve it.";
pub const SUPERVISOR_PROMPT: &str =
    "you are a helpful ai assistant. you must use the following tools to answer questions.";
pub const VALIDATOR_PROMPT: &str =
    "you are the validator. reply with json: {valid: bool, comment: str}.";
pub const SUMMARY_PROMPT: &str = "you are the summarizer. briefly summarize and provide the final answer. Text for summarization: {history}";

/// summary prompt 中的占位符
pub const HISTORY_PLACEHOLDER: &str = "{history}";

#[derive(Debug, Clone, PartialEq)]
pub struct Prompts {
    pub planner: String,
    pub supervisor: String,
    pub validator: String,
    pub summary: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            planner: PLANNER_PROMPT.to_string(),
            supervisor: SUPERVISOR_PROMPT.to_string(),
            validator: VALIDATOR_PROMPT.to_string(),
            summary: SUMMARY_PROMPT.to_string(),
        }
    }
}

impl Prompts {
    /// 从目录加载覆盖文件；目录或文件不存在时保留默认值
    pub fn load(dir: Option<&Path>) -> Self {
        let mut prompts = Self::default();
        let Some(dir) = dir else {
            return prompts;
        };
        let slots: [(&str, &mut String); 4] = [
            ("planner.txt", &mut prompts.planner),
            ("supervisor.txt", &mut prompts.supervisor),
            ("validator.txt", &mut prompts.validator),
            ("summary.txt", &mut prompts.summary),
        ];
        for (file, slot) in slots {
            let path = dir.join(file);
            match std::fs::read_to_string(&path) {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::debug!(path = %path.display(), "prompt override loaded");
                    *slot = text.trim().to_string();
                }
                _ => {}
            }
        }
        if !prompts.summary.contains(HISTORY_PLACEHOLDER) {
            tracing::warn!("summary prompt has no {{history}} placeholder, transcript will be appended");
        }
        prompts
    }

    /// 用对话记录替换 {history}；没有占位符时追加到末尾
    pub fn render_summary(&self, history: &str) -> String {
        if self.summary.contains(HISTORY_PLACEHOLDER) {
            self.summary.replace(HISTORY_PLACEHOLDER, history)
        } else {
            format!("{}\n\n{}", self.summary, history)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_summary() {
        let prompts = Prompts::default();
        let text = prompts.render_summary("[user] hi");
        assert!(text.ends_with("Text for summarization: [user] hi"));
    }

    #[test]
    fn test_override_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("validator.txt"), "  judge it  \n").unwrap();
        std::fs::write(dir.path().join("summary.txt"), "sum up").unwrap();

        let prompts = Prompts::load(Some(dir.path()));
        assert_eq!(prompts.validator, "judge it");
        assert_eq!(prompts.planner, PLANNER_PROMPT);
        assert_eq!(prompts.render_summary("H"), "sum up\n\nH");
    }

    #[test]
    fn test_missing_dir_keeps_defaults() {
        let prompts = Prompts::load(Some(Path::new("/definitely/not/here")));
        assert_eq!(prompts, Prompts::default());
    }
}
