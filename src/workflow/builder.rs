//! 状态图构建器
//!
//! 流畅 API：add_node / add_edge / add_conditional_edges 累积定义，compile 时统一校验。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::workflow::graph::CompiledGraph;
use crate::workflow::types::*;

/// 默认最多执行的节点次数
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// 状态图构建器
pub struct GraphBuilder<S> {
    name: String,
    nodes: Vec<(String, Arc<dyn Node<S>>)>,
    edges: Vec<(String, Edge<S>)>,
    recursion_limit: usize,
}

impl<S: Send + 'static> GraphBuilder<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// 添加节点
    pub fn add_node(mut self, name: impl Into<String>, node: impl Node<S> + 'static) -> Self {
        self.nodes.push((name.into(), Arc::new(node)));
        self
    }

    /// 添加无条件边（from 可为 START，to 可为 END）
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), Edge::Direct(to.into())));
        self
    }

    /// 添加条件边：router 返回分支键，branches 把键映射到节点名或 END
    pub fn add_conditional_edges<F, K, V>(
        mut self,
        from: impl Into<String>,
        router: F,
        branches: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        F: Fn(&S) -> String + Send + Sync + 'static,
        K: Into<String>,
        V: Into<String>,
    {
        let branches: BTreeMap<String, String> = branches
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.edges.push((
            from.into(),
            Edge::Conditional {
                router: Arc::new(router),
                branches,
            },
        ));
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// 校验并编译
    pub fn compile(self) -> Result<CompiledGraph<S>, WorkflowError> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut nodes: HashMap<String, Arc<dyn Node<S>>> = HashMap::new();
        for (name, node) in self.nodes {
            if name == START || name == END {
                return Err(WorkflowError::ReservedName(name));
            }
            if nodes.insert(name.clone(), node).is_some() {
                return Err(WorkflowError::DuplicateNode(name));
            }
            order.push(name);
        }

        let mut edges: HashMap<String, Edge<S>> = HashMap::new();
        for (from, edge) in self.edges {
            if from == END {
                return Err(WorkflowError::ReservedName(from));
            }
            if from != START && !nodes.contains_key(&from) {
                return Err(WorkflowError::UnknownNode(from));
            }
            for target in edge.targets() {
                if target != END && !nodes.contains_key(target) {
                    return Err(WorkflowError::UnknownNode(target.to_string()));
                }
            }
            if edges.contains_key(&from) {
                return Err(WorkflowError::DuplicateEdge(from));
            }
            edges.insert(from, edge);
        }

        if !edges.contains_key(START) {
            return Err(WorkflowError::MissingEntry);
        }
        if let Some(name) = order.iter().find(|n| !edges.contains_key(n.as_str())) {
            return Err(WorkflowError::MissingEdge(name.clone()));
        }

        Ok(CompiledGraph::new(
            self.name,
            order,
            nodes,
            edges,
            self.recursion_limit,
        ))
    }
}
