use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use log::debug;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};
use crate::rows;

/// How a repeated `source,target` pair (in either orientation) is folded into the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateEdgePolicy {
    /// The last row's weight replaces earlier ones.
    #[default]
    Overwrite,
    Sum,
}

/// One parsed line of the edge list, kept verbatim for the edge projection.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRow {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// Undirected co-viewership graph keyed by channel id.
#[derive(Debug, Default)]
pub struct ChannelGraph {
    graph: UnGraph<String, f64>,
    index: HashMap<String, NodeIndex>,
    rows: Vec<EdgeRow>,
}

impl ChannelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_csv(path: &Path, policy: DuplicateEdgePolicy) -> Result<Self> {
        let reader = rows::open(path)?;
        Self::from_reader(reader, path, policy)
    }

    /// Parses `source,target,weight` rows. `source` only labels errors.
    pub fn from_reader<R: Read>(reader: R, source: &Path, policy: DuplicateEdgePolicy) -> Result<Self> {
        let mut graph = ChannelGraph::new();
        rows::for_each_row(reader, source, ["source", "target", "weight"], |line, [from, to, weight]| {
            if from.is_empty() || to.is_empty() {
                return Err(AtlasError::malformed(source, line, "empty node id"));
            }
            let weight: f64 = weight
                .parse()
                .map_err(|_| AtlasError::malformed(source, line, format!("weight '{weight}' is not a number")))?;
            if !weight.is_finite() || weight <= 0.0 {
                return Err(AtlasError::malformed(
                    source,
                    line,
                    format!("weight {weight} must be positive and finite"),
                ));
            }
            graph.add_edge(from, to, weight, policy);
            Ok(())
        })?;

        debug!(
            "loaded {} edge rows into {} nodes and {} edges from {}",
            graph.rows.len(),
            graph.node_count(),
            graph.edge_count(),
            source.display()
        );
        Ok(graph)
    }

    /// Adds one row. The caller guarantees `weight > 0`.
    pub fn add_edge(&mut self, source: &str, target: &str, weight: f64, policy: DuplicateEdgePolicy) {
        let a = self.node(source);
        let b = self.node(target);

        match self.graph.find_edge(a, b) {
            Some(edge) => match policy {
                DuplicateEdgePolicy::Overwrite => self.graph[edge] = weight,
                DuplicateEdgePolicy::Sum => self.graph[edge] += weight,
            },
            None => {
                self.graph.add_edge(a, b, weight);
            }
        }

        self.rows.push(EdgeRow {
            source: source.to_string(),
            target: target.to_string(),
            weight,
        });
    }

    fn node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.index.insert(id.to_string(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    /// Current weight of the undirected edge between two ids.
    pub fn weight(&self, a: &str, b: &str) -> Option<f64> {
        let edge = self.graph.find_edge(self.node_index(a)?, self.node_index(b)?)?;
        Some(self.graph[edge])
    }

    /// Raw edge rows in file order, duplicates included.
    pub fn rows(&self) -> &[EdgeRow] {
        &self.rows
    }

    pub fn inner(&self) -> &UnGraph<String, f64> {
        &self.graph
    }
}
