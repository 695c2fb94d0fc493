use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};

use crate::community::Louvain;
use crate::error::{AtlasError, Result};
use crate::graph::DuplicateEdgePolicy;
use crate::projection::ProjectionOptions;
use crate::size::{DEFAULT_MAX_SIZE, DEFAULT_MIN_SIZE, DegenerateRangePolicy};

/// Everything one atlas build needs. Paths are explicit; see [`MonthlyLayout`]
/// for the dated directory convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtlasConfig {
    pub input_dir: PathBuf,
    pub output_path: PathBuf,
    #[serde(default = "default_edges_file")]
    pub edges_file: String,
    #[serde(default = "default_nodes_file")]
    pub nodes_file: String,
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_min_size")]
    pub min_size: f64,
    #[serde(default = "default_max_size")]
    pub max_size: f64,
    #[serde(default)]
    pub duplicate_edges: DuplicateEdgePolicy,
    #[serde(default)]
    pub degenerate_range: DegenerateRangePolicy,
    #[serde(default)]
    pub drop_dangling_edges: bool,
    #[serde(default)]
    pub pretty: bool,
}

fn default_edges_file() -> String {
    "edges.csv".to_string()
}

fn default_nodes_file() -> String {
    "nodes.csv".to_string()
}

fn default_resolution() -> f64 {
    Louvain::default().resolution
}

fn default_min_size() -> f64 {
    DEFAULT_MIN_SIZE
}

fn default_max_size() -> f64 {
    DEFAULT_MAX_SIZE
}

impl AtlasConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        AtlasConfig {
            input_dir: input_dir.into(),
            output_path: output_path.into(),
            edges_file: default_edges_file(),
            nodes_file: default_nodes_file(),
            resolution: default_resolution(),
            seed: 0,
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
            duplicate_edges: DuplicateEdgePolicy::default(),
            degenerate_range: DegenerateRangePolicy::default(),
            drop_dangling_edges: false,
            pretty: false,
        }
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| AtlasError::open(path, e))?;
        Self::from_toml_str(&text, path)
    }

    pub fn from_toml_str(text: &str, source: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| AtlasError::ConfigParse {
            path: source.to_path_buf(),
            source: e,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(AtlasError::Config(format!(
                "resolution must be a positive number, got {}",
                self.resolution
            )));
        }
        if !self.min_size.is_finite() || !self.max_size.is_finite() || self.min_size >= self.max_size {
            return Err(AtlasError::Config(format!(
                "size range [{}, {}] must be finite and non-empty",
                self.min_size, self.max_size
            )));
        }
        if self.edges_file.is_empty() || self.nodes_file.is_empty() {
            return Err(AtlasError::Config("input file names must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn edges_path(&self) -> PathBuf {
        self.input_dir.join(&self.edges_file)
    }

    pub fn nodes_path(&self) -> PathBuf {
        self.input_dir.join(&self.nodes_file)
    }

    pub fn louvain(&self) -> Louvain {
        Louvain::new(self.resolution, self.seed)
    }

    pub fn projection(&self) -> ProjectionOptions {
        ProjectionOptions {
            size_range: (self.min_size, self.max_size),
            degenerate_range: self.degenerate_range,
            drop_dangling_edges: self.drop_dangling_edges,
        }
    }
}

/// Monthly data layout: `<root>/<M>-<YYYY>/` holding the inputs and
/// `<M>_<YYYY>_graph.json`. Months are not zero padded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyLayout {
    pub data_root: PathBuf,
    pub month: u32,
    pub year: i32,
}

impl MonthlyLayout {
    pub fn new(data_root: impl Into<PathBuf>, month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(AtlasError::Config(format!("month must be 1-12, got {month}")));
        }
        Ok(MonthlyLayout {
            data_root: data_root.into(),
            month,
            year,
        })
    }

    pub fn current(data_root: impl Into<PathBuf>) -> Self {
        let today = Local::now();
        MonthlyLayout {
            data_root: data_root.into(),
            month: today.month(),
            year: today.year(),
        }
    }

    pub fn input_dir(&self) -> PathBuf {
        self.data_root.join(format!("{}-{}", self.month, self.year))
    }

    pub fn output_path(&self) -> PathBuf {
        self.input_dir().join(format!("{}_{}_graph.json", self.month, self.year))
    }

    pub fn config(&self) -> AtlasConfig {
        AtlasConfig::new(self.input_dir(), self.output_path())
    }
}
