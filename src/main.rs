use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use channel_atlas::{
    AtlasConfig, DegenerateRangePolicy, DuplicateEdgePolicy, MonthlyLayout, build_atlas, sample::generate_sample,
};
use clap::{Args, Parser, Subcommand};
use log::info;

/// Community-colored co-viewership atlas builder
#[derive(Parser, Debug)]
#[command(name = "channel-atlas", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Partition the edge list and write the atlas JSON
    Build(BuildArgs),
    /// Write synthetic edges.csv and nodes.csv
    Generate {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long, default_value_t = 140)]
        channels: usize,
        #[arg(long, default_value_t = 500)]
        interactions: usize,
    },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// TOML file with an AtlasConfig; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding edges.csv and nodes.csv
    #[arg(long, requires = "output")]
    input_dir: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Root of the monthly layout, used when no input dir is given
    #[arg(long, default_value = "data")]
    data_root: PathBuf,
    #[arg(long)]
    month: Option<u32>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    resolution: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,
    /// Sum repeated edge weights instead of keeping the last one
    #[arg(long)]
    sum_duplicates: bool,
    /// Give every node the minimum size when all popularities are equal
    #[arg(long)]
    collapse_degenerate: bool,
    /// Only emit edges whose endpoints are both in the node list
    #[arg(long)]
    drop_dangling_edges: bool,
    #[arg(long)]
    pretty: bool,
}

impl BuildArgs {
    fn into_config(self) -> Result<AtlasConfig> {
        let mut config = match (&self.config, &self.input_dir) {
            (Some(path), _) => AtlasConfig::from_toml_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            (None, Some(dir)) => AtlasConfig::new(dir, self.output.clone().unwrap_or_default()),
            (None, None) => {
                let layout = match (self.month, self.year) {
                    (Some(month), Some(year)) => MonthlyLayout::new(&self.data_root, month, year)?,
                    (None, None) => MonthlyLayout::current(&self.data_root),
                    _ => bail!("--month and --year must be given together"),
                };
                layout.config()
            }
        };

        if self.config.is_some() {
            if let Some(dir) = self.input_dir {
                config.input_dir = dir;
            }
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(resolution) = self.resolution {
            config.resolution = resolution;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.sum_duplicates {
            config.duplicate_edges = DuplicateEdgePolicy::Sum;
        }
        if self.collapse_degenerate {
            config.degenerate_range = DegenerateRangePolicy::Collapse;
        }
        config.drop_dangling_edges |= self.drop_dangling_edges;
        config.pretty |= self.pretty;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Build(args) => {
            let config = args.into_config()?;
            info!(
                "building atlas from {} (resolution {}, seed {})",
                config.input_dir.display(),
                config.resolution,
                config.seed
            );
            build_atlas(&config).with_context(|| format!("building atlas from {}", config.input_dir.display()))?;
        }
        Command::Generate {
            dir,
            channels,
            interactions,
        } => {
            generate_sample(&dir, channels, interactions)
                .with_context(|| format!("generating sample data in {}", dir.display()))?;
        }
    }
    Ok(())
}
