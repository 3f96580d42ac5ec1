//! 编译后的状态图
//!
//! 从 START 出发逐个执行节点，按出边（直连或条件路由）跳转，到 END 结束；
//! 执行节点数超过 recursion_limit 时报错，防止回边死循环。

use std::collections::HashMap;
use std::sync::Arc;

use crate::workflow::types::*;

pub struct CompiledGraph<S> {
    name: String,
    order: Vec<String>,
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: HashMap<String, Edge<S>>,
    recursion_limit: usize,
}

impl<S: Send + 'static> CompiledGraph<S> {
    pub(crate) fn new(
        name: String,
        order: Vec<String>,
        nodes: HashMap<String, Arc<dyn Node<S>>>,
        edges: HashMap<String, Edge<S>>,
        recursion_limit: usize,
    ) -> Self {
        Self {
            name,
            order,
            nodes,
            edges,
            recursion_limit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 节点名（按添加顺序）
    pub fn node_names(&self) -> &[String] {
        &self.order
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    /// 计算 from 之后的下一个节点
    fn next(&self, from: &str, state: &S) -> Result<String, WorkflowError> {
        match self.edges.get(from) {
            Some(Edge::Direct(to)) => Ok(to.clone()),
            Some(Edge::Conditional { router, branches }) => {
                let route = router(state);
                branches
                    .get(&route)
                    .cloned()
                    .ok_or_else(|| WorkflowError::UnknownRoute {
                        node: from.to_string(),
                        route,
                    })
            }
            None => Err(WorkflowError::MissingEdge(from.to_string())),
        }
    }

    /// 运行整张图，返回最终状态
    pub async fn invoke(&self, mut state: S) -> Result<S, WorkflowError> {
        let mut current = self.next(START, &state)?;
        let mut steps = 0usize;

        while current != END {
            if steps >= self.recursion_limit {
                tracing::error!(graph = %self.name, limit = self.recursion_limit, "recursion limit reached");
                return Err(WorkflowError::RecursionLimit(self.recursion_limit));
            }
            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| WorkflowError::UnknownNode(current.clone()))?;

            tracing::info!(graph = %self.name, node = %current, step = steps, "node start");
            state = node
                .run(state)
                .await
                .map_err(|source| WorkflowError::NodeFailed {
                    node: current.clone(),
                    source,
                })?;
            steps += 1;

            let next = self.next(&current, &state)?;
            tracing::debug!(graph = %self.name, from = %current, to = %next, "transition");
            current = next;
        }

        tracing::info!(graph = %self.name, steps, "graph finished");
        Ok(state)
    }

    /// Mermaid 流程图文本（条件边用虚线并标注分支键）
    pub fn draw_mermaid(&self) -> String {
        let mut lines = vec![
            "---".to_string(),
            format!("title: {}", self.name),
            "---".to_string(),
            "graph TD;".to_string(),
            format!("\t{START}([<p>{START}</p>]):::first"),
        ];
        for name in &self.order {
            lines.push(format!("\t{}({})", name, name));
        }
        lines.push(format!("\t{END}([<p>{END}</p>]):::last"));

        let mut sources = vec![START.to_string()];
        sources.extend(self.order.iter().cloned());
        for from in &sources {
            match self.edges.get(from) {
                Some(Edge::Direct(to)) => lines.push(format!("\t{} --> {};", from, to)),
                Some(Edge::Conditional { branches, .. }) => {
                    for (key, to) in branches {
                        lines.push(format!("\t{} -. &nbsp;{}&nbsp; .-> {};", from, key, to));
                    }
                }
                None => {}
            }
        }

        lines.push("\tclassDef default fill:#f2f0ff,line-height:1.2".to_string());
        lines.push("\tclassDef first fill-opacity:0".to_string());
        lines.push("\tclassDef last fill:#bfb6fc".to_string());
        lines.join("\n") + "\n"
    }
}
