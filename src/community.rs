//! Community detection over a [`ChannelGraph`].
//!
//! The pipeline only depends on [`CommunityDetector`]; [`Louvain`] is the
//! implementation it ships with. Louvain is seeded, so a fixed seed, resolution
//! and input file always produce the same labels. A different seed may produce
//! the same grouping under different label values, which in turn changes the
//! colors derived from them.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{AtlasError, Result};
use crate::graph::ChannelGraph;

/// Node id to community label. Labels are contiguous from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    labels: HashMap<String, usize>,
    communities: usize,
}

impl Partition {
    pub fn from_labels(labels: HashMap<String, usize>) -> Self {
        let communities = labels.values().copied().max().map_or(0, |max| max + 1);
        Partition { labels, communities }
    }

    pub fn get(&self, id: &str) -> Option<usize> {
        self.labels.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.labels.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn community_count(&self) -> usize {
        self.communities
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.labels.iter().map(|(id, &label)| (id.as_str(), label))
    }

    /// Members of each community, sorted by id.
    pub fn communities(&self) -> BTreeMap<usize, Vec<String>> {
        let mut communities: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (id, &label) in &self.labels {
            communities.entry(label).or_default().push(id.clone());
        }
        for members in communities.values_mut() {
            members.sort();
        }
        communities
    }
}

/// Assigns every node with at least one edge to a community.
pub trait CommunityDetector {
    fn partition(&self, graph: &ChannelGraph) -> Result<Partition>;
}

/// Multi-level Louvain modularity optimisation.
#[derive(Debug, Clone, Copy)]
pub struct Louvain {
    /// Lower values favour fewer, larger communities.
    pub resolution: f64,
    pub seed: u64,
    /// A pass that raises modularity by less than this ends the level.
    pub min_gain: f64,
}

impl Default for Louvain {
    fn default() -> Self {
        Louvain {
            resolution: 0.25,
            seed: 0,
            min_gain: 1e-7,
        }
    }
}

impl Louvain {
    pub fn new(resolution: f64, seed: u64) -> Self {
        Louvain {
            resolution,
            seed,
            ..Louvain::default()
        }
    }

    /// Local moving phase on one level. Returns contiguous community ids,
    /// their count, and whether any node moved.
    fn one_level(&self, level: &Level, rng: &mut StdRng) -> (Vec<usize>, usize, bool) {
        let n = level.len();
        let mut community: Vec<usize> = (0..n).collect();
        let mut totals = level.degree.clone();
        let mut neighbour_weight = vec![0.0; n];
        let mut touched: Vec<usize> = Vec::new();

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        let mut improved = false;
        let mut current = level.modularity(&community, self.resolution);
        loop {
            let mut moved = false;
            for &node in &order {
                let own = community[node];
                let degree = level.degree[node];

                for &(neighbour, weight) in &level.adj[node] {
                    if neighbour == node {
                        continue;
                    }
                    let c = community[neighbour];
                    if neighbour_weight[c] == 0.0 {
                        touched.push(c);
                    }
                    neighbour_weight[c] += weight;
                }

                totals[own] -= degree;
                let ratio = self.resolution * degree / level.total;
                let mut best = own;
                let mut best_gain = neighbour_weight[own] - totals[own] * ratio;
                for &c in &touched {
                    let gain = neighbour_weight[c] - totals[c] * ratio;
                    if gain > best_gain {
                        best = c;
                        best_gain = gain;
                    }
                }
                totals[best] += degree;
                community[node] = best;
                moved |= best != own;

                for &c in &touched {
                    neighbour_weight[c] = 0.0;
                }
                touched.clear();
            }

            if !moved {
                break;
            }
            improved = true;
            let next = level.modularity(&community, self.resolution);
            if next - current < self.min_gain {
                break;
            }
            current = next;
        }

        let count = renumber(&mut community);
        (community, count, improved)
    }
}

impl CommunityDetector for Louvain {
    fn partition(&self, graph: &ChannelGraph) -> Result<Partition> {
        if graph.is_empty() {
            return Err(AtlasError::EmptyGraph);
        }
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(AtlasError::Config(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut level = Level::from_graph(graph.inner());
        // original node index -> node of the current level
        let mut assignment: Vec<usize> = (0..level.len()).collect();

        let mut depth = 0;
        loop {
            let (community, count, improved) = self.one_level(&level, &mut rng);
            if !improved {
                break;
            }
            for node in assignment.iter_mut() {
                *node = community[*node];
            }
            depth += 1;
            debug!("louvain level {depth}: {} nodes -> {count} communities", level.len());
            if count == level.len() {
                break;
            }
            level = level.aggregate(&community, count);
        }

        let communities = renumber(&mut assignment);
        let labels = graph
            .inner()
            .node_indices()
            .map(|idx| (graph.inner()[idx].clone(), assignment[idx.index()]))
            .collect();
        debug!("louvain finished after {depth} levels with {communities} communities");
        Ok(Partition::from_labels(labels))
    }
}

/// Classic Newman modularity, i.e. [`modularity`] at resolution 1.
///
/// Comparable across runs regardless of the resolution a detector used.
pub fn newman_modularity(graph: &ChannelGraph, partition: &Partition) -> f64 {
    modularity(graph, partition, 1.0)
}

/// Newman modularity of `partition` with resolution `resolution`.
///
/// Graph nodes missing from the partition count as singleton communities.
pub fn modularity(graph: &ChannelGraph, partition: &Partition, resolution: f64) -> f64 {
    let inner = graph.inner();
    let n = inner.node_count();
    let community: Vec<usize> = inner
        .node_indices()
        .map(|idx| partition.get(&inner[idx]).unwrap_or(partition.community_count() + idx.index()))
        .collect();
    debug_assert_eq!(community.len(), n);
    Level::from_graph(inner).modularity(&community, resolution)
}

/// Weighted adjacency used while optimising one level. Self-loops appear once
/// in their node's list.
struct Level {
    adj: Vec<Vec<(usize, f64)>>,
    degree: Vec<f64>,
    /// Sum of all degrees, i.e. twice the total edge weight.
    total: f64,
}

impl Level {
    fn from_graph(graph: &UnGraph<String, f64>) -> Self {
        let mut adj = vec![Vec::new(); graph.node_count()];
        for edge in graph.edge_references() {
            let (u, v, w) = (edge.source().index(), edge.target().index(), *edge.weight());
            adj[u].push((v, w));
            if u != v {
                adj[v].push((u, w));
            }
        }
        Level::with_adjacency(adj)
    }

    fn with_adjacency(adj: Vec<Vec<(usize, f64)>>) -> Self {
        let degree: Vec<f64> = adj
            .iter()
            .enumerate()
            .map(|(u, neighbours)| {
                neighbours
                    .iter()
                    .map(|&(v, w)| if u == v { 2.0 * w } else { w })
                    .sum()
            })
            .collect();
        let total = degree.iter().sum();
        Level { adj, degree, total }
    }

    fn len(&self) -> usize {
        self.adj.len()
    }

    /// Collapses each community into a single node carrying its internal
    /// weight as a self-loop.
    fn aggregate(&self, community: &[usize], count: usize) -> Level {
        let mut merged: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];
        for (u, neighbours) in self.adj.iter().enumerate() {
            let cu = community[u];
            for &(v, w) in neighbours {
                if v < u {
                    continue;
                }
                let cv = community[v];
                *merged[cu].entry(cv).or_insert(0.0) += w;
                if cu != cv {
                    *merged[cv].entry(cu).or_insert(0.0) += w;
                }
            }
        }
        Level::with_adjacency(merged.into_iter().map(|m| m.into_iter().collect()).collect())
    }

    fn modularity(&self, community: &[usize], resolution: f64) -> f64 {
        if self.total == 0.0 {
            return 0.0;
        }
        let size = community.iter().copied().max().map_or(0, |max| max + 1);
        let mut internal = vec![0.0; size];
        let mut totals = vec![0.0; size];
        for (u, neighbours) in self.adj.iter().enumerate() {
            let c = community[u];
            totals[c] += self.degree[u];
            for &(v, w) in neighbours {
                if community[v] == c {
                    // non-loop edges are listed from both ends
                    internal[c] += if u == v { w } else { w / 2.0 };
                }
            }
        }
        internal
            .iter()
            .zip(&totals)
            .map(|(&inside, &tot)| 2.0 * inside / self.total - resolution * (tot / self.total).powi(2))
            .sum()
    }
}

/// Renumbers labels to `0..k` in first-seen order and returns `k`.
fn renumber(labels: &mut [usize]) -> usize {
    let mut map: HashMap<usize, usize> = HashMap::new();
    for label in labels.iter_mut() {
        let next = map.len();
        *label = *map.entry(*label).or_insert(next);
    }
    map.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DuplicateEdgePolicy;

    fn graph(edges: &[(&str, &str, f64)]) -> ChannelGraph {
        let mut g = ChannelGraph::new();
        for &(a, b, w) in edges {
            g.add_edge(a, b, w, DuplicateEdgePolicy::Overwrite);
        }
        g
    }

    fn two_cliques() -> ChannelGraph {
        let left = ["a1", "a2", "a3", "a4"];
        let right = ["b1", "b2", "b3", "b4"];
        let mut edges = Vec::new();
        for side in [left, right] {
            for i in 0..side.len() {
                for j in i + 1..side.len() {
                    edges.push((side[i], side[j], 10.0));
                }
            }
        }
        edges.push(("a1", "b1", 1.0));
        graph(&edges)
    }

    #[test]
    fn splits_weakly_bridged_cliques() {
        let g = two_cliques();
        let partition = Louvain::default().partition(&g).unwrap();

        assert_eq!(partition.len(), 8);
        assert_eq!(partition.community_count(), 2);
        let a = partition.get("a1").unwrap();
        let b = partition.get("b1").unwrap();
        assert_ne!(a, b);
        for id in ["a2", "a3", "a4"] {
            assert_eq!(partition.get(id), Some(a));
        }
        for id in ["b2", "b3", "b4"] {
            assert_eq!(partition.get(id), Some(b));
        }
        assert!(modularity(&g, &partition, 1.0) > 0.4);
    }

    #[test]
    fn same_seed_same_labels() {
        let g = two_cliques();
        let first = Louvain::new(0.25, 42).partition(&g).unwrap();
        let second = Louvain::new(0.25, 42).partition(&g).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn labels_are_contiguous() {
        let g = two_cliques();
        let partition = Louvain::new(1.0, 7).partition(&g).unwrap();
        let communities = partition.communities();
        let keys: Vec<usize> = communities.keys().copied().collect();
        assert_eq!(keys, (0..partition.community_count()).collect::<Vec<_>>());
    }

    #[test]
    fn covers_every_node() {
        let g = graph(&[("a", "b", 1.0), ("b", "c", 1.0), ("d", "d", 2.0)]);
        let partition = Louvain::default().partition(&g).unwrap();
        for id in ["a", "b", "c", "d"] {
            assert!(partition.contains(id), "{id}");
        }
    }

    #[test]
    fn empty_graph_is_an_error() {
        let err = Louvain::default().partition(&ChannelGraph::new()).unwrap_err();
        assert!(matches!(err, AtlasError::EmptyGraph));
    }

    /// `cliques` five-node cliques, each joined to the next by a single edge.
    fn clique_ring(cliques: usize) -> ChannelGraph {
        let mut g = ChannelGraph::new();
        let id = |c: usize, i: usize| format!("c{c}n{i}");
        for c in 0..cliques {
            for i in 0..5 {
                for j in i + 1..5 {
                    g.add_edge(&id(c, i), &id(c, j), 1.0, DuplicateEdgePolicy::Overwrite);
                }
            }
            g.add_edge(&id(c, 4), &id((c + 1) % cliques, 0), 1.0, DuplicateEdgePolicy::Overwrite);
        }
        g
    }

    #[test]
    fn lower_resolution_gives_fewer_communities() {
        let g = clique_ring(30);
        let coarse = Louvain::new(0.05, 0).partition(&g).unwrap();
        let default = Louvain::new(0.25, 0).partition(&g).unwrap();
        let fine = Louvain::new(1.0, 0).partition(&g).unwrap();

        assert_eq!(coarse.len(), 150);
        assert!(
            coarse.community_count() < fine.community_count(),
            "{} vs {}",
            coarse.community_count(),
            fine.community_count()
        );
        assert!(coarse.community_count() <= default.community_count());
        assert!(default.community_count() <= fine.community_count());
    }

    #[test]
    fn newman_modularity_ignores_detector_resolution() {
        let g = two_cliques();
        let partition = Louvain::new(0.05, 3).partition(&g).unwrap();
        // 2 * 60/121 - 2 * (121/242)^2
        let expected = 120.0 / 121.0 - 0.5;
        assert!((newman_modularity(&g, &partition) - expected).abs() < 1e-9);
        assert_eq!(newman_modularity(&g, &partition), modularity(&g, &partition, 1.0));
    }

    #[test]
    fn rejects_bad_resolution() {
        let g = graph(&[("a", "b", 1.0)]);
        let err = Louvain::new(0.0, 0).partition(&g).unwrap_err();
        assert!(matches!(err, AtlasError::Config(_)));
    }

    #[test]
    fn single_community_modularity_is_zero_at_unit_resolution() {
        let g = graph(&[("a", "b", 1.0), ("b", "c", 1.0)]);
        let labels = ["a", "b", "c"].iter().map(|id| (id.to_string(), 0)).collect();
        let q = modularity(&g, &Partition::from_labels(labels), 1.0);
        assert!(q.abs() < 1e-12);
    }
}
