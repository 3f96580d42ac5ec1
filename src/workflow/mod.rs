//! 状态图：具名节点 + 直连 / 条件边，从 START 运行到 END

pub mod builder;
pub mod graph;
pub mod types;

pub use builder::{GraphBuilder, DEFAULT_RECURSION_LIMIT};
pub use graph::CompiledGraph;
pub use types::{Edge, Node, Router, WorkflowError, END, START};
