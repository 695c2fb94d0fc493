//! Builds the channel atlas: a community-colored co-viewership graph ready for
//! a force-directed front end.
//!
//! `edges.csv` → [`ChannelGraph`] → [`CommunityDetector`] → [`project`] → JSON.

pub mod color;
pub mod community;
pub mod config;
pub mod error;
pub mod graph;
pub mod nodes;
pub mod output;
pub mod projection;
mod rows;
pub mod sample;
pub mod size;

use std::time::Instant;

use log::{debug, info};

pub use color::community_color;
pub use community::{CommunityDetector, Louvain, Partition, modularity, newman_modularity};
pub use config::{AtlasConfig, MonthlyLayout};
pub use error::{AtlasError, Result};
pub use graph::{ChannelGraph, DuplicateEdgePolicy, EdgeRow};
pub use nodes::{NodeRecord, load_nodes};
pub use output::{to_json_string, write_document};
pub use projection::{AtlasDocument, OutputEdge, OutputNode, ProjectionOptions, project};
pub use size::{DegenerateRangePolicy, PopularityRange, SizeScale};

/// Loads both input files and produces the document, using `detector` for
/// the communities. Nothing is written.
pub fn build_document(config: &AtlasConfig, detector: &dyn CommunityDetector) -> Result<AtlasDocument> {
    config.validate()?;

    let graph = ChannelGraph::from_csv(&config.edges_path(), config.duplicate_edges)?;
    info!(
        "loaded graph with {} nodes and {} edges ({} rows)",
        graph.node_count(),
        graph.edge_count(),
        graph.rows().len()
    );

    let records = load_nodes(&config.nodes_path())?;

    let started = Instant::now();
    let partition = detector.partition(&graph)?;
    info!(
        "found {} communities in {:.2?} (newman modularity {:.4})",
        partition.community_count(),
        started.elapsed(),
        newman_modularity(&graph, &partition)
    );
    if log::log_enabled!(log::Level::Debug) {
        let mut sizes: Vec<(usize, usize)> = partition
            .communities()
            .into_iter()
            .map(|(label, members)| (label, members.len()))
            .collect();
        sizes.sort_by(|a, b| b.1.cmp(&a.1));
        for (label, size) in sizes.iter().take(10) {
            debug!("community {label}: {size} channels");
        }
    }

    let doc = project(&records, graph.rows(), &partition, &config.projection())?;
    let dropped = records.len() - doc.nodes.len();
    if dropped > 0 {
        info!("{dropped} node records have no community and were left out");
    }
    Ok(doc)
}

/// Full run with the configured Louvain detector, writing `config.output_path`.
pub fn build_atlas(config: &AtlasConfig) -> Result<AtlasDocument> {
    let doc = build_document(config, &config.louvain())?;
    write_document(&config.output_path, &doc, config.pretty)?;
    Ok(doc)
}
