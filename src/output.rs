use std::fs;
use std::io::BufWriter;
use std::path::Path;

use log::info;
use tempfile::NamedTempFile;

use crate::error::{AtlasError, Result};
use crate::projection::AtlasDocument;

pub fn to_json_string(doc: &AtlasDocument, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(doc)?
    } else {
        serde_json::to_string(doc)?
    };
    Ok(json)
}

/// Writes the document as UTF-8 JSON, creating parent directories as needed.
///
/// The JSON goes to a temporary file next to `path` that is renamed into
/// place once flushed, so a failed write never leaves a truncated document.
pub fn write_document(path: &Path, doc: &AtlasDocument, pretty: bool) -> Result<()> {
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|e| AtlasError::io(parent, e))?;
            parent
        }
        None => Path::new("."),
    };

    let file = NamedTempFile::new_in(parent).map_err(|e| AtlasError::io(parent, e))?;
    let mut writer = BufWriter::new(file);
    let written = if pretty {
        serde_json::to_writer_pretty(&mut writer, doc)
    } else {
        serde_json::to_writer(&mut writer, doc)
    };
    written.map_err(|e| json_error(path, e))?;

    let file = writer
        .into_inner()
        .map_err(|e| AtlasError::io(path, e.into_error()))?;
    file.persist(path).map_err(|e| AtlasError::io(path, e.error))?;

    info!(
        "wrote {} nodes and {} edges to {}",
        doc.nodes.len(),
        doc.edges.len(),
        path.display()
    );
    Ok(())
}

/// I/O failures inside serde_json keep the path they happened on.
fn json_error(path: &Path, err: serde_json::Error) -> AtlasError {
    if err.is_io() {
        AtlasError::io(path, err.into())
    } else {
        AtlasError::Serialize(err)
    }
}
