//! Entity graph for hover highlighting.

use crate::model::DiagramData;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Entities and relationships currently emphasised by hover.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Highlight {
    pub entities: BTreeSet<String>,
    /// Indices into `DiagramData::relationships`.
    pub relationships: BTreeSet<usize>,
}

impl Highlight {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

/// Directed graph with one node per entity and one edge per resolvable
/// relationship, weighted by the relationship's index.
#[derive(Debug, Default)]
pub struct SchemaGraph {
    graph: DiGraph<String, usize>,
    by_name: HashMap<String, NodeIndex>,
    endpoints: HashMap<usize, (NodeIndex, NodeIndex)>,
}

impl SchemaGraph {
    pub fn build(data: &DiagramData) -> Self {
        let mut g = SchemaGraph::default();
        for entity in &data.entities {
            let idx = g.graph.add_node(entity.name.clone());
            g.by_name.insert(entity.name.clone(), idx);
        }
        for (i, rel) in data.relationships.iter().enumerate() {
            if let (Some(&from), Some(&to)) = (g.by_name.get(&rel.from), g.by_name.get(&rel.to)) {
                g.graph.add_edge(from, to, i);
                g.endpoints.insert(i, (from, to));
            }
        }
        g
    }

    pub fn entity_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relationship_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The entity, its relationships in both directions and their far ends.
    pub fn entity_neighbourhood(&self, name: &str) -> Highlight {
        let mut h = Highlight::default();
        let Some(&idx) = self.by_name.get(name) else {
            return h;
        };
        h.entities.insert(name.to_string());
        for dir in [Direction::Outgoing, Direction::Incoming] {
            for edge in self.graph.edges_directed(idx, dir) {
                h.relationships.insert(*edge.weight());
                let other = if dir == Direction::Outgoing {
                    edge.target()
                } else {
                    edge.source()
                };
                h.entities.insert(self.graph[other].clone());
            }
        }
        h
    }

    /// The relationship and both of its endpoints.
    pub fn relationship_neighbourhood(&self, index: usize) -> Highlight {
        let mut h = Highlight::default();
        if let Some(&(from, to)) = self.endpoints.get(&index) {
            h.relationships.insert(index);
            h.entities.insert(self.graph[from].clone());
            h.entities.insert(self.graph[to].clone());
        }
        h
    }
}
