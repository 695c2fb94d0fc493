//! Synthetic co-viewership data in the same shape as the exporter's files.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use csv::Writer;
use log::info;
use rand::seq::SliceRandom;
use rand::{Rng, thread_rng};
use rayon::prelude::*;

use crate::error::{AtlasError, Result};

pub struct ChannelNameGenerator {
    prefixes: Vec<&'static str>,
    suffixes: Vec<&'static str>,
    used_names: Arc<Mutex<HashSet<String>>>,
}

impl Default for ChannelNameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelNameGenerator {
    pub fn new() -> Self {
        ChannelNameGenerator {
            prefixes: vec![
                "dark", "shadow", "light", "blue", "red", "green", "gold", "silver",
                "phantom", "ninja", "stealth", "epic", "legend", "super", "mega",
            ],
            suffixes: vec![
                "warrior", "hunter", "mage", "slayer", "knight", "rogue", "wizard",
                "assassin", "lord", "king", "queen", "master", "pro", "noob", "gamer",
            ],
            used_names: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Parallel generation of `count` unique logins.
    pub fn generate_unique(&self, count: usize) -> Vec<String> {
        let capacity = self.prefixes.len() * self.suffixes.len() * 998;
        let count = count.min(capacity);

        let mut names = Vec::with_capacity(count);
        while names.len() < count {
            let batch: Vec<String> = (0..count - names.len())
                .into_par_iter()
                .map_init(thread_rng, |rng, _| {
                    let prefix = self.prefixes[rng.gen_range(0..self.prefixes.len())];
                    let suffix = self.suffixes[rng.gen_range(0..self.suffixes.len())];
                    let num = rng.gen_range(1..999);
                    format!("{prefix}{suffix}{num}")
                })
                .filter(|name| {
                    // the set only ever grows, so a panicked holder leaves it usable
                    let mut used = self.used_names.lock().unwrap_or_else(PoisonError::into_inner);
                    used.insert(name.clone())
                })
                .collect();
            names.extend(batch);
        }
        names
    }
}

/// "darkwarrior12" -> "DarkWarrior12", splitting on the generator's prefixes.
fn display_name(login: &str, prefixes: &[&str]) -> String {
    let prefix_len = prefixes
        .iter()
        .find(|p| login.starts_with(*p))
        .map_or(0, |p| p.len());
    let (head, tail) = login.split_at(prefix_len);
    format!("{}{}", capitalize(head), capitalize(tail))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Writes `edges.csv` and `nodes.csv` into `dir`.
///
/// Each interaction adds 1..=20 shared viewers to a random channel pair;
/// pairs are summed. Every tenth channel gets no interactions so the node
/// filter has something to drop. Nodes are written most popular first.
pub fn generate_sample(dir: &Path, channels: usize, interactions: usize) -> Result<()> {
    if channels < 3 {
        return Err(AtlasError::Config(format!("need at least 3 channels, got {channels}")));
    }
    fs::create_dir_all(dir).map_err(|e| AtlasError::io(dir, e))?;

    let generator = ChannelNameGenerator::new();
    let logins = generator.generate_unique(channels);
    let connected: Vec<&String> = logins
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 10 != 9)
        .map(|(_, login)| login)
        .collect();

    let overlap: HashMap<(String, String), u64> = (0..interactions)
        .into_par_iter()
        .map_init(thread_rng, |rng, _| {
            let mut pair: Vec<&&String> = connected.choose_multiple(rng, 2).collect();
            pair.sort();
            let key = (pair[0].to_string(), pair[1].to_string());
            (key, rng.gen_range(1..=20u64))
        })
        .fold(HashMap::new, |mut acc: HashMap<(String, String), u64>, (key, weight)| {
            *acc.entry(key).or_insert(0) += weight;
            acc
        })
        .reduce(HashMap::new, |mut a, b| {
            for (key, weight) in b {
                *a.entry(key).or_insert(0) += weight;
            }
            a
        });

    let mut edges: Vec<_> = overlap.into_iter().collect();
    edges.sort();
    let edges_path = dir.join("edges.csv");
    let mut writer = csv_writer(&edges_path)?;
    for ((source, target), weight) in &edges {
        writer
            .write_record([source.as_str(), target.as_str(), &weight.to_string()])
            .map_err(|e| AtlasError::csv(&edges_path, e))?;
    }
    writer.flush().map_err(|e| AtlasError::io(&edges_path, e))?;

    let mut rng = thread_rng();
    let mut nodes: Vec<(String, String, u64)> = logins
        .iter()
        .map(|login| {
            let popularity = rng.gen_range(100..=50_000u64);
            (login.clone(), display_name(login, &generator.prefixes), popularity)
        })
        .collect();
    nodes.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));
    let nodes_path = dir.join("nodes.csv");
    let mut writer = csv_writer(&nodes_path)?;
    for (id, name, popularity) in &nodes {
        writer
            .write_record([id.as_str(), name.as_str(), &popularity.to_string()])
            .map_err(|e| AtlasError::csv(&nodes_path, e))?;
    }
    writer.flush().map_err(|e| AtlasError::io(&nodes_path, e))?;

    info!(
        "generated {} channels and {} edges in {}",
        nodes.len(),
        edges.len(),
        dir.display()
    );
    Ok(())
}

fn csv_writer(path: &Path) -> Result<Writer<File>> {
    let file = File::create(path).map_err(|e| AtlasError::io(path, e))?;
    Ok(Writer::from_writer(file))
}
