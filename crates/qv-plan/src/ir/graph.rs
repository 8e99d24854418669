//! Materialized view of a relational DAG

use super::rel::Rel;
use crate::error::{PlanError, PlanResult};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use qv_core::NodeId;
use std::collections::HashMap;

/// Deduplicated relational DAG with edges from input to consumer
pub struct PlanGraph {
    graph: DiGraph<Rel, ()>,
    index: HashMap<NodeId, NodeIndex>,
    root: Rel,
}

impl PlanGraph {
    /// Collect every node reachable from `root`, one graph node per structural id
    pub fn from_root(root: &Rel) -> Self {
        let mut graph = DiGraph::new();
        let mut index: HashMap<NodeId, NodeIndex> = HashMap::new();
        let root_idx = graph.add_node(root.clone());
        index.insert(root.id(), root_idx);

        let mut stack = vec![root.clone()];
        while let Some(rel) = stack.pop() {
            let Some(&consumer) = index.get(&rel.id()) else {
                continue;
            };
            for input in rel.inputs() {
                let input_idx = match index.get(&input.id()) {
                    Some(idx) => *idx,
                    None => {
                        let idx = graph.add_node(input.clone());
                        index.insert(input.id(), idx);
                        stack.push(input.clone());
                        idx
                    }
                };
                graph.add_edge(input_idx, consumer, ());
            }
        }

        Self {
            graph,
            index,
            root: root.clone(),
        }
    }

    /// The plan root
    pub fn root(&self) -> &Rel {
        &self.root
    }

    /// Number of distinct relational nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether a node with this id is part of the plan
    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Nodes with every input before its consumers
    pub fn topological_order(&self) -> PlanResult<Vec<Rel>> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().map(|i| self.graph[i].clone()).collect()),
            Err(cycle) => Err(PlanError::shape(
                "plan graph",
                format!("cycle through {}", self.graph[cycle.node_id()].label()),
            )),
        }
    }

    /// Number of edges from a node to its consumers
    pub fn consumer_count(&self, id: &NodeId) -> usize {
        self.index
            .get(id)
            .map(|idx| {
                self.graph
                    .neighbors_directed(*idx, Direction::Outgoing)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Nodes consumed more than once
    pub fn shared_nodes(&self) -> Vec<Rel> {
        self.graph
            .node_indices()
            .filter(|idx| {
                self.graph
                    .neighbors_directed(*idx, Direction::Outgoing)
                    .count()
                    > 1
            })
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    /// Node counts per operator kind, sorted by kind name
    pub fn kind_counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts: HashMap<&'static str, usize> = HashMap::new();
        for rel in self.graph.node_weights() {
            *counts.entry(rel.kind_name()).or_insert(0) += 1;
        }
        let mut out: Vec<_> = counts.into_iter().collect();
        out.sort();
        out
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
