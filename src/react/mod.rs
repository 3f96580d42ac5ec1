//! 认知层：Tool Call 解析、工具调用智能体（ReAct 循环）与过程事件

pub mod events;
pub mod loop_;
pub mod planner;

pub use events::{EventSender, PipelineEvent};
pub use loop_::{AgentRun, ToolAgent};
pub use planner::{extract_json_block, parse_llm_output, Planner, PlannerOutput, ToolCall};
