use std::io::Read;
use std::path::Path;

use log::debug;

use crate::error::{AtlasError, Result};
use crate::rows;

/// One row of the node metadata file: `id,display_name,popularity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: String,
    pub name: String,
    pub popularity: u64,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, popularity: u64) -> Self {
        NodeRecord {
            id: id.into(),
            name: name.into(),
            popularity,
        }
    }
}

pub fn load_nodes(path: &Path) -> Result<Vec<NodeRecord>> {
    let reader = rows::open(path)?;
    read_nodes(reader, path)
}

/// Parses node rows in file order. The exporter's `id,label,size` header is skipped.
pub fn read_nodes<R: Read>(reader: R, source: &Path) -> Result<Vec<NodeRecord>> {
    let mut records = Vec::new();
    rows::for_each_row(reader, source, ["id", "label", "size"], |line, [id, name, popularity]| {
        if id.is_empty() {
            return Err(AtlasError::malformed(source, line, "empty node id"));
        }
        let popularity = popularity.parse().map_err(|_| {
            AtlasError::malformed(
                source,
                line,
                format!("popularity '{popularity}' is not a non-negative integer"),
            )
        })?;
        records.push(NodeRecord::new(id, name, popularity));
        Ok(())
    })?;

    debug!("loaded {} node records from {}", records.len(), source.display());
    Ok(records)
}
