//! 流水线状态与纯函数：计划解析、校验结论判定、路由判定

use serde::{Deserialize, Serialize};

use crate::memory::Message;

/// 默认最多保留的计划步数
pub const MAX_PLAN_STEPS: usize = 8;
/// 默认校验失败上限，达到后强制进入总结
pub const MAX_VALIDATION_FAILURES: u32 = 2;

/// 在节点间传递的整份状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// 不断增长的对话记录
    pub messages: Vec<Message>,
    pub plan: Option<Vec<String>>,
    pub draft: Option<String>,
    pub validated: Option<bool>,
    pub summary: Option<String>,
    #[serde(default)]
    pub validation_fail_count: u32,
}

impl PipelineState {
    /// 以单条用户消息开始
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(query)],
            ..Self::default()
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.messages.first().map(|m| m.content.as_str())
    }
}

/// 把规划回复拆成步骤：逐行去掉首尾的 `-`、空格与 `•`，丢弃空行，最多保留 max_steps 条
pub fn parse_plan(text: &str, max_steps: usize) -> Option<Vec<String>> {
    let steps: Vec<String> = text
        .lines()
        .map(|line| {
            line.trim()
                .trim_matches(|c| c == '-' || c == ' ' || c == '•')
                .trim()
        })
        .filter(|line| !line.is_empty())
        .take(max_steps)
        .map(String::from)
        .collect();
    if steps.is_empty() {
        None
    } else {
        Some(steps)
    }
}

/// 校验回复中（不区分大小写）含有 "true" 即视为通过
pub fn is_valid_verdict(reply: &str) -> bool {
    reply.to_lowercase().contains("true")
}

/// true → 进入总结；false → 回到监督者重试
pub fn validation_routing(state: &PipelineState, max_failures: u32) -> bool {
    state.validated.unwrap_or(false) || state.validation_fail_count >= max_failures
}
