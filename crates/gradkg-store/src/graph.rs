//! In-memory view of the SUBSTITUTES edges using petgraph.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use gradkg_core::Substitutes;

/// A subject node in the substitution graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectNode {
    pub id: String,
    pub name: String,
}

/// One neighbour of a subject, with the note on the connecting edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionLink {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Directed graph: an edge `a -> b` means `b` may be counted for `a`.
pub struct SubstitutionGraph {
    graph: DiGraph<SubjectNode, Option<String>>,
    node_index: HashMap<String, NodeIndex>,
}

impl SubstitutionGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_index: HashMap::new(),
        }
    }

    pub fn from_edges(edges: &[Substitutes]) -> Self {
        let mut g = Self::new();
        for edge in edges {
            g.add_edge(edge);
        }
        g
    }

    fn node(&mut self, id: &str, name: Option<&str>) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(SubjectNode {
            id: id.to_string(),
            name: name.unwrap_or(id).to_string(),
        });
        self.node_index.insert(id.to_string(), idx);
        idx
    }

    pub fn add_edge(&mut self, edge: &Substitutes) {
        if edge.source_id == edge.target_id {
            return;
        }
        let a = self.node(&edge.source_id, edge.source_name.as_deref());
        let b = self.node(&edge.target_id, edge.target_name.as_deref());
        if self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, edge.note.clone());
        }
    }

    fn links(&self, id: &str, dir: Direction) -> Vec<SubstitutionLink> {
        let Some(&idx) = self.node_index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<SubstitutionLink> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| {
                let other = match dir {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                let node = &self.graph[other];
                SubstitutionLink {
                    id: node.id.clone(),
                    name: node.name.clone(),
                    note: e.weight().clone(),
                }
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Subjects that may be counted in place of `id`.
    pub fn accepted_for(&self, id: &str) -> Vec<SubstitutionLink> {
        self.links(id, Direction::Outgoing)
    }

    /// Subjects for which `id` may be counted.
    pub fn counts_toward(&self, id: &str) -> Vec<SubstitutionLink> {
        self.links(id, Direction::Incoming)
    }

    /// Every subject reachable through chained substitutions, excluding `id`.
    pub fn chain(&self, id: &str) -> Vec<String> {
        let Some(&start) = self.node_index.get(id) else {
            return Vec::new();
        };
        let mut bfs = Bfs::new(&self.graph, start);
        let mut out = Vec::new();
        while let Some(idx) = bfs.next(&self.graph) {
            if idx != start {
                out.push(self.graph[idx].id.clone());
            }
        }
        out
    }

    /// Get graph statistics.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
        }
    }
}

impl Default for SubstitutionGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
}
