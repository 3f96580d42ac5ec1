//! 状态图类型定义
//!
//! 节点（Node）、边（直连 / 条件路由）、哨兵节点 START / END 与图错误类型。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::AgentError;

/// 入口哨兵：`add_edge(START, "planner")` 指定第一个节点
pub const START: &str = "__start__";
/// 出口哨兵：到达即结束
pub const END: &str = "__end__";

/// 图节点：消费并返回整份状态
#[async_trait]
pub trait Node<S>: Send + Sync {
    async fn run(&self, state: S) -> Result<S, AgentError>;
}

/// 条件路由：读取状态返回分支键
pub type Router<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// 出边
pub enum Edge<S> {
    /// 无条件跳转
    Direct(String),
    /// 按 router 返回的键在 branches 中查找下一节点
    Conditional {
        router: Router<S>,
        branches: BTreeMap<String, String>,
    },
}

impl<S> Clone for Edge<S> {
    fn clone(&self) -> Self {
        match self {
            Edge::Direct(to) => Edge::Direct(to.clone()),
            Edge::Conditional { router, branches } => Edge::Conditional {
                router: router.clone(),
                branches: branches.clone(),
            },
        }
    }
}

impl<S> Edge<S> {
    /// 所有可能的目标节点
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Edge::Direct(to) => vec![to.as_str()],
            Edge::Conditional { branches, .. } => branches.values().map(String::as_str).collect(),
        }
    }
}

/// 图构建与执行错误
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    #[error("Node '{0}' already has an outgoing edge")]
    DuplicateEdge(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Reserved node name: {0}")]
    ReservedName(String),

    #[error("Graph has no entry edge from __start__")]
    MissingEntry,

    #[error("Node '{0}' has no outgoing edge")]
    MissingEdge(String),

    #[error("Router of node '{node}' returned unknown branch '{route}'")]
    UnknownRoute { node: String, route: String },

    #[error("Recursion limit of {0} node executions reached")]
    RecursionLimit(usize),

    #[error("Node '{node}' failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: AgentError,
    },
}
