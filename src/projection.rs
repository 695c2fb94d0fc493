use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::color::community_color;
use crate::community::Partition;
use crate::error::Result;
use crate::graph::EdgeRow;
use crate::nodes::NodeRecord;
use crate::size::{DEFAULT_MAX_SIZE, DEFAULT_MIN_SIZE, DegenerateRangePolicy, PopularityRange, SizeScale};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputNode {
    pub id: String,
    pub name: String,
    pub color: String,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEdge {
    pub source: String,
    pub target: String,
}

/// The `{nodes, edges}` document consumed by the atlas front end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtlasDocument {
    pub nodes: Vec<OutputNode>,
    pub edges: Vec<OutputEdge>,
}

#[derive(Debug, Clone, Copy)]
pub struct ProjectionOptions {
    pub size_range: (f64, f64),
    pub degenerate_range: DegenerateRangePolicy,
    /// Drop edges whose endpoints are not both in the node list.
    /// Off by default: every edge row is emitted.
    pub drop_dangling_edges: bool,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        ProjectionOptions {
            size_range: (DEFAULT_MIN_SIZE, DEFAULT_MAX_SIZE),
            degenerate_range: DegenerateRangePolicy::default(),
            drop_dangling_edges: false,
        }
    }
}

/// Joins node metadata with community labels.
///
/// A record is emitted only when its id has a community; the popularity range
/// is still taken over every record.
pub fn project(
    records: &[NodeRecord],
    rows: &[EdgeRow],
    partition: &Partition,
    options: &ProjectionOptions,
) -> Result<AtlasDocument> {
    let nodes = match PopularityRange::scan(records) {
        Some(range) => {
            let scale = SizeScale::new(range, options.size_range, options.degenerate_range)?;
            project_nodes(records, partition, &scale)
        }
        None => Vec::new(),
    };

    let edges = if options.drop_dangling_edges {
        let kept: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        rows.iter()
            .filter(|row| kept.contains(row.source.as_str()) && kept.contains(row.target.as_str()))
            .map(output_edge)
            .collect()
    } else {
        rows.iter().map(output_edge).collect()
    };

    Ok(AtlasDocument { nodes, edges })
}

fn project_nodes(records: &[NodeRecord], partition: &Partition, scale: &SizeScale) -> Vec<OutputNode> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();
    for record in records {
        let Some(label) = partition.get(&record.id) else {
            continue;
        };
        if !seen.insert(record.id.as_str()) {
            warn!("duplicate node record '{}' ignored", record.id);
            continue;
        }
        nodes.push(OutputNode {
            id: record.id.clone(),
            name: record.name.clone(),
            color: community_color(label),
            size: scale.size(record.popularity),
        });
    }
    nodes
}

fn output_edge(row: &EdgeRow) -> OutputEdge {
    OutputEdge {
        source: row.source.clone(),
        target: row.target.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::AtlasError;

    fn row(source: &str, target: &str) -> EdgeRow {
        EdgeRow {
            source: source.to_string(),
            target: target.to_string(),
            weight: 1.0,
        }
    }

    fn partition(entries: &[(&str, usize)]) -> Partition {
        let labels: HashMap<String, usize> = entries.iter().map(|&(id, l)| (id.to_string(), l)).collect();
        Partition::from_labels(labels)
    }

    #[test]
    fn drops_unpartitioned_nodes_keeps_all_edges() {
        let records = vec![
            NodeRecord::new("a", "A", 100),
            NodeRecord::new("lonely", "Lonely", 60),
            NodeRecord::new("b", "B", 10),
        ];
        let rows = vec![row("a", "b"), row("b", "ghost")];
        let doc = project(&records, &rows, &partition(&[("a", 0), ("b", 1), ("ghost", 1)]), &ProjectionOptions::default())
            .unwrap();

        let ids: Vec<&str> = doc.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(doc.edges.len(), 2);
        assert_eq!(doc.edges[1], OutputEdge { source: "b".into(), target: "ghost".into() });
        assert_eq!(doc.nodes[0].size, 200.0);
        assert_eq!(doc.nodes[1].size, 10.0);
    }

    #[test]
    fn same_community_same_color() {
        let records = vec![
            NodeRecord::new("a", "A", 3),
            NodeRecord::new("b", "B", 2),
            NodeRecord::new("c", "C", 1),
        ];
        let doc = project(&records, &[], &partition(&[("a", 4), ("b", 4), ("c", 9)]), &ProjectionOptions::default())
            .unwrap();
        assert_eq!(doc.nodes[0].color, doc.nodes[1].color);
        assert_eq!(doc.nodes[2].color, community_color(9));
    }

    #[test]
    fn duplicate_records_keep_first() {
        let records = vec![
            NodeRecord::new("a", "First", 10),
            NodeRecord::new("b", "B", 1),
            NodeRecord::new("a", "Second", 5),
        ];
        let doc = project(&records, &[], &partition(&[("a", 0), ("b", 0)]), &ProjectionOptions::default()).unwrap();
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.nodes[0].name, "First");
    }

    #[test]
    fn drop_dangling_edges_when_asked() {
        let records = vec![NodeRecord::new("a", "A", 2), NodeRecord::new("b", "B", 1)];
        let rows = vec![row("a", "b"), row("b", "ghost")];
        let options = ProjectionOptions {
            drop_dangling_edges: true,
            ..ProjectionOptions::default()
        };
        let doc = project(&records, &rows, &partition(&[("a", 0), ("b", 0), ("ghost", 0)]), &options).unwrap();
        assert_eq!(doc.edges, vec![OutputEdge { source: "a".into(), target: "b".into() }]);
    }

    #[test]
    fn degenerate_range_surfaces() {
        let records = vec![NodeRecord::new("a", "A", 7), NodeRecord::new("b", "B", 7)];
        let err = project(&records, &[], &partition(&[("a", 0)]), &ProjectionOptions::default()).unwrap_err();
        assert!(matches!(err, AtlasError::DegenerateRange { count: 7 }));
    }

    #[test]
    fn empty_node_file_gives_empty_nodes() {
        let doc = project(&[], &[row("a", "b")], &partition(&[("a", 0), ("b", 0)]), &ProjectionOptions::default())
            .unwrap();
        assert!(doc.nodes.is_empty());
        assert_eq!(doc.edges.len(), 1);
    }
}
