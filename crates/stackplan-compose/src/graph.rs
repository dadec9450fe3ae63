//! Dependency graph management using `petgraph`.
//!
//! Builds a directed graph from service references and resolves a stable
//! topological ordering for startup.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use petgraph::Direction;
use petgraph::graph::NodeIndex;
use stackplan_common::error::{StackplanError, Result};

/// A dependency graph of services.
///
/// Node indices follow insertion order, which the ordering relies on for
/// its tie-break.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: petgraph::Graph<String, ()>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service node to the graph.
    pub fn add_service(&mut self, name: impl Into<String>) -> NodeIndex {
        self.graph.add_node(name.into())
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The graph edge points from `dependency` to `dependent` so that
    /// dependencies come first. Repeated edges are collapsed.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.update_edge(dependency, dependent, ());
    }

    /// Number of services in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns `(dependency, dependent)` name pairs in edge insertion order.
    #[must_use]
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| {
                (
                    self.graph[e.source()].as_str(),
                    self.graph[e.target()].as_str(),
                )
            })
            .collect()
    }

    /// Renders the graph in Graphviz DOT format.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let labelled = self.graph.map(|_, name| name.as_str(), |_, ()| "");
        petgraph::dot::Dot::with_config(&labelled, &[petgraph::dot::Config::EdgeNoLabel])
            .to_string()
    }

    /// Returns a startup ordering of services.
    ///
    /// Dependencies appear before the services that depend on them. Among
    /// services that are ready at the same time, the one inserted first
    /// comes first, so unconstrained services keep declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`StackplanError::CyclicDependency`] if the graph contains a cycle.
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(i)) = ready.pop() {
            let node = NodeIndex::new(i);
            order.push(self.graph[node].clone());
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                let degree = &mut in_degree[next.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(next.index()));
                }
            }
        }

        if order.len() < self.graph.node_count() {
            return Err(StackplanError::CyclicDependency {
                cycle: self.find_cycle(),
            });
        }
        Ok(order)
    }

    /// Names of the services in the earliest-declared cycle.
    fn find_cycle(&self) -> Vec<String> {
        let mut cycles: Vec<Vec<NodeIndex>> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| match scc.as_slice() {
                [single] => self.graph.contains_edge(*single, *single),
                _ => true,
            })
            .collect();
        for scc in &mut cycles {
            scc.sort_unstable();
        }
        cycles.sort_unstable_by_key(|scc| scc.first().copied());
        cycles
            .first()
            .map(|scc| scc.iter().map(|&n| self.graph[n].clone()).collect())
            .unwrap_or_default()
    }
}
