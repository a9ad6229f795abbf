//! Document Dependency Graph
//!
//! Directed graph over document ids built from cross-document references,
//! using petgraph. Handles cycles correctly (SCCs) and provides the build
//! ordering used by the project orchestrator.
//!
//! The graph is rebuilt from scratch whenever the registry changes; rebuilds
//! are cheap relative to parsing and remove staleness bugs.

use std::collections::HashMap;

use petgraph::algo::{has_path_connecting, tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, Result};

/// Derived counts for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub has_cycles: bool,
    pub cycle_count: usize,
}

/// Dependency graph over document ids.
///
/// Edges point from a referencing document to the document it references.
/// Self-edges are legal and represent a document referencing itself through
/// an external-form reference.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    indices: HashMap<String, NodeIndex>,
    /// Recorded cycle components: SCCs with more than one member, plus
    /// single nodes carrying a self-edge
    cycles: Vec<Vec<String>>,
    /// Node id -> index into `cycles`
    cycle_of: HashMap<String, usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index. Idempotent.
    pub fn add_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.indices.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.indices.insert(id.to_string(), idx);
        idx
    }

    /// Add an edge, auto-adding missing endpoints. Duplicate edges are
    /// no-ops.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        if self.graph.find_edge(from_idx, to_idx).is_none() {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.indices.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All node ids, in insertion order
    pub fn nodes(&self) -> Vec<&str> {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx).map(String::as_str))
            .collect()
    }

    /// Direct dependencies of a document (outgoing edges)
    pub fn edges_from(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.indices.get(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors(idx)
            .filter_map(|n| self.graph.node_weight(n).map(String::as_str))
            .collect()
    }

    /// Iterative reachability; `from == to` is trivially true
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        let (Some(&from_idx), Some(&to_idx)) = (self.indices.get(from), self.indices.get(to)) else {
            return false;
        };
        has_path_connecting(&self.graph, from_idx, to_idx, None)
    }

    /// Detect and record cycle components.
    ///
    /// A component is a cycle iff it has more than one member, or it is a
    /// single node with a self-edge. Membership is independent of traversal
    /// order; this never fails.
    pub fn detect_cycles(&mut self) -> &[Vec<String>] {
        self.cycles.clear();
        self.cycle_of.clear();

        for scc in tarjan_scc(&self.graph) {
            let is_cycle = scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some();
            if !is_cycle {
                continue;
            }

            let members: Vec<String> = scc
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect();

            let cycle_idx = self.cycles.len();
            for member in &members {
                self.cycle_of.insert(member.clone(), cycle_idx);
            }
            self.cycles.push(members);
        }

        &self.cycles
    }

    /// Cycle components recorded by the last `detect_cycles` call
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    /// Whether two documents sit in the same recorded cycle component
    pub fn in_same_cycle(&self, a: &str, b: &str) -> bool {
        match (self.cycle_of.get(a), self.cycle_of.get(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Topological order with dependencies first.
    ///
    /// Raises `CycleDetected` (carrying an offending node) when no such
    /// order exists. Deterministic for a fixed node-insertion order.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        match toposort(&self.graph, None) {
            Ok(order) => {
                let mut ids: Vec<String> = order
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect();
                // petgraph orders sources (dependents) first; builds want
                // dependencies first
                ids.reverse();
                Ok(ids)
            }
            Err(cycle) => {
                let id = self
                    .graph
                    .node_weight(cycle.node_id())
                    .cloned()
                    .unwrap_or_default();
                Err(GeneratorError::CycleDetected(id))
            }
        }
    }

    /// Reverse of `topological_sort` (dependents first)
    pub fn reverse_topological_sort(&self) -> Result<Vec<String>> {
        let mut order = self.topological_sort()?;
        order.reverse();
        Ok(order)
    }

    pub fn is_acyclic(&self) -> bool {
        toposort(&self.graph, None).is_ok()
    }

    /// Transitive dependencies of a document, excluding the document itself
    /// even when it sits in a cycle containing itself
    pub fn dependencies_of(&self, id: &str) -> Vec<String> {
        let Some(&start) = self.indices.get(id) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            if idx == start {
                continue;
            }
            if let Some(node_id) = self.graph.node_weight(idx) {
                result.push(node_id.clone());
            }
        }
        result
    }

    /// Transitive dependents of a document, excluding the document itself
    pub fn dependents_of(&self, id: &str) -> Vec<String> {
        let Some(&start) = self.indices.get(id) else {
            return Vec::new();
        };

        let reversed = Reversed(&self.graph);
        let mut result = Vec::new();
        let mut dfs = Dfs::new(reversed, start);
        while let Some(idx) = dfs.next(reversed) {
            if idx == start {
                continue;
            }
            if let Some(node_id) = self.graph.node_weight(idx) {
                result.push(node_id.clone());
            }
        }
        result
    }

    /// Derived counts; no side effects
    pub fn summary(&self) -> GraphSummary {
        let cycle_count = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some())
            .count();

        GraphSummary {
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            has_cycles: cycle_count > 0,
            cycle_count,
        }
    }

    /// Export the graph to GraphViz DOT format, highlighting cycle members
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph DependencyGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push('\n');

        for idx in self.graph.node_indices() {
            let Some(id) = self.graph.node_weight(idx) else {
                continue;
            };
            let color = if self.cycle_of.contains_key(id) {
                "#FFCDD2"
            } else {
                "#E0E0E0"
            };
            output.push_str(&format!(
                "  \"{}\" [fillcolor=\"{}\"];\n",
                dot_escape(id),
                color
            ));
        }

        output.push('\n');

        for edge in self.graph.edge_indices() {
            if let Some((source, target)) = self.graph.edge_endpoints(edge) {
                if let (Some(from), Some(to)) = (
                    self.graph.node_weight(source),
                    self.graph.node_weight(target),
                ) {
                    output.push_str(&format!(
                        "  \"{}\" -> \"{}\";\n",
                        dot_escape(from),
                        dot_escape(to)
                    ));
                }
            }
        }

        output.push_str("}\n");
        output
    }
}

fn dot_escape(id: &str) -> String {
    id.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn graph_with_edges(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (from, to) in edges {
            graph.add_edge(from, to);
        }
        graph
    }

    #[test]
    fn test_edge_auto_adds_nodes_and_dedupes() {
        let mut graph = graph_with_edges(&[("post", "user"), ("post", "user")]);
        graph.add_edge("post", "user");

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges_from("post"), vec!["user"]);
    }

    #[test]
    fn test_dependency_orders_before_dependent() {
        // post references user: user must be built first
        let graph = graph_with_edges(&[("post", "user")]);
        let order = graph.topological_sort().unwrap();
        assert_eq!(order, vec!["user", "post"]);
    }

    #[test]
    fn test_toposort_respects_all_edges() {
        let graph = graph_with_edges(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        let order = graph.topological_sort().unwrap();
        let pos = |id: &str| order.iter().position(|o| o == id).unwrap();

        for (from, to) in [("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")] {
            assert!(pos(to) < pos(from), "{to} must precede {from}");
        }
    }

    #[test]
    fn test_reverse_toposort_is_reverse() {
        let graph = graph_with_edges(&[("post", "user")]);
        let forward = graph.topological_sort().unwrap();
        let mut reversed = graph.reverse_topological_sort().unwrap();
        reversed.reverse();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_toposort_deterministic() {
        let graph = graph_with_edges(&[("a", "b"), ("c", "d"), ("e", "b")]);
        assert_eq!(graph.topological_sort().unwrap(), graph.topological_sort().unwrap());
    }

    #[test]
    fn test_toposort_raises_on_cycle() {
        let graph = graph_with_edges(&[("user", "profile"), ("profile", "settings"), ("settings", "user")]);
        let result = graph.topological_sort();
        assert!(matches!(result, Err(GeneratorError::CycleDetected(_))));
        assert!(!graph.is_acyclic());
    }

    #[test]
    fn test_detect_cycles_three_node_scc() {
        let mut graph =
            graph_with_edges(&[("user", "profile"), ("profile", "settings"), ("settings", "user")]);
        let cycles = graph.detect_cycles();

        assert_eq!(cycles.len(), 1);
        let members: HashSet<&str> = cycles[0].iter().map(String::as_str).collect();
        assert_eq!(members, HashSet::from(["user", "profile", "settings"]));
    }

    #[test]
    fn test_detect_cycles_ignores_acyclic_nodes() {
        let mut graph = graph_with_edges(&[("a", "b"), ("b", "a"), ("c", "a")]);
        graph.detect_cycles();

        assert_eq!(graph.cycles().len(), 1);
        assert!(graph.in_same_cycle("a", "b"));
        assert!(!graph.in_same_cycle("c", "a"));
    }

    #[test]
    fn test_self_edge_is_a_cycle() {
        let mut graph = graph_with_edges(&[("a", "a"), ("b", "a")]);
        let cycles = graph.detect_cycles();

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec!["a"]);
        assert!(graph.in_same_cycle("a", "a"));
    }

    #[test]
    fn test_cycle_membership_independent_of_insertion() {
        let mut forward = graph_with_edges(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let mut backward = graph_with_edges(&[("c", "a"), ("b", "c"), ("a", "b")]);

        let members = |g: &mut DependencyGraph| -> HashSet<String> {
            g.detect_cycles().iter().flatten().cloned().collect()
        };
        assert_eq!(members(&mut forward), members(&mut backward));
    }

    #[test]
    fn test_has_path() {
        let graph = graph_with_edges(&[("a", "b"), ("b", "c")]);
        assert!(graph.has_path("a", "c"));
        assert!(!graph.has_path("c", "a"));
        assert!(graph.has_path("b", "b"));
        assert!(!graph.has_path("a", "missing"));
    }

    #[test]
    fn test_transitive_dependencies_exclude_self() {
        let graph = graph_with_edges(&[("a", "b"), ("b", "c"), ("c", "a")]);

        let deps: HashSet<String> = graph.dependencies_of("a").into_iter().collect();
        assert_eq!(deps, HashSet::from(["b".to_string(), "c".to_string()]));

        let dependents: HashSet<String> = graph.dependents_of("c").into_iter().collect();
        assert_eq!(dependents, HashSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_summary() {
        let graph = graph_with_edges(&[("a", "b"), ("b", "a"), ("c", "b")]);
        let summary = graph.summary();

        assert_eq!(summary.node_count, 3);
        assert_eq!(summary.edge_count, 3);
        assert!(summary.has_cycles);
        assert_eq!(summary.cycle_count, 1);
    }

    #[test]
    fn test_disconnected_components_all_ordered() {
        let graph = graph_with_edges(&[("a", "b"), ("x", "y")]);
        let order = graph.topological_sort().unwrap();
        assert_eq!(order.len(), 4);
        let pos = |id: &str| order.iter().position(|o| o == id).unwrap();
        assert!(pos("b") < pos("a"));
        assert!(pos("y") < pos("x"));
    }

    #[test]
    fn test_to_dot_contains_nodes_and_edges() {
        let mut graph = graph_with_edges(&[("post", "user")]);
        graph.detect_cycles();
        let dot = graph.to_dot();
        assert!(dot.contains("\"post\" -> \"user\""));
        assert!(dot.starts_with("digraph"));
    }
}
