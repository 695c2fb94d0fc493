use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AtlasError>;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("input file '{}' does not exist", path.display())]
    MissingFile { path: PathBuf },

    #[error("malformed input in '{}' at line {line}: {reason}", path.display())]
    MalformedInput {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// Every node record carries the same popularity, so there is no range to scale from.
    #[error("popularity range is degenerate: every node has count {count}")]
    DegenerateRange { count: u64 },

    #[error("edge list contains no edges, nothing to partition")]
    EmptyGraph,

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse config '{}': {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize atlas document: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl AtlasError {
    pub(crate) fn malformed(path: &Path, line: u64, reason: impl Into<String>) -> Self {
        AtlasError::MalformedInput {
            path: path.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }

    /// Maps a failed open into `MissingFile` when the path is absent.
    pub(crate) fn open(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            AtlasError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            AtlasError::io(path, source)
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        AtlasError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Converts a csv reader error, keeping the line it happened on when known.
    pub(crate) fn csv(path: &Path, err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(source) => AtlasError::io(path, source),
            kind => AtlasError::malformed(path, line, format!("{kind:?}")),
        }
    }
}
