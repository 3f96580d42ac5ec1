//! 流水线过程事件：节点开始、计划、工具调用、观察、草稿、校验结论与总结
//!
//! 通过可选的 mpsc 通道推送给前端（命令行按节点打印分段）。

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// 单步过程事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// 节点开始执行
    NodeStarted { node: String },
    /// 规划结果（None 表示没有可用步骤）
    Plan { steps: Option<Vec<String>> },
    /// 调用工具
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览，避免过长）
    Observation { tool: String, preview: String },
    /// 监督者给出的草稿
    Draft { text: String },
    /// 校验结论
    Validation {
        valid: bool,
        fail_count: u32,
        comment: String,
    },
    /// 最终总结
    Summary { text: String },
}

pub type EventSender = UnboundedSender<PipelineEvent>;

/// 发送事件；未配置通道或接收端已关闭时忽略
pub fn send_event(tx: &Option<EventSender>, ev: PipelineEvent) {
    if let Some(t) = tx {
        let _ = t.send(ev);
    }
}

/// 截断到 max_chars 个字符，超出时追加 "..."
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_value(PipelineEvent::Validation {
            valid: false,
            fail_count: 1,
            comment: "missing units".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "validation");
        assert_eq!(json["fail_count"], 1);
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("abc", 3), "abc");
    }
}
