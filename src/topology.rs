//! Structural summary metrics
//!
//! Efficiency-type metrics are averaged over ordered node pairs and follow
//! edge direction on directed networks.

use crate::centrality;
use crate::config::CentralityConfig;
use crate::network::{EdgeKind, Network};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Topological profile of one network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub nodes: usize,
    pub edges: usize,
    pub walk_edges: usize,
    pub mean_out_degree: f64,
    /// Relative size of the largest (weakly) connected component
    pub s0: f64,
    /// Longest finite hop distance
    pub diameter: u32,
    /// Mean hop distance over reachable ordered pairs
    pub mean_path_length: f64,
    pub efficiency: f64,
    pub geo_efficiency: f64,
    pub mean_edge_length: f64,
    pub std_edge_length: f64,
    pub gini_degree: f64,
    pub gini_betweenness: f64,
}

/// Partial sums from one source node
#[derive(Debug, Clone, Copy, Default)]
struct PairSums {
    reachable: u64,
    hops: u64,
    diameter: u32,
    inverse_hops: f64,
    detour_pairs: u64,
    detour: f64,
}

impl PairSums {
    fn add(mut self, other: PairSums) -> PairSums {
        self.reachable += other.reachable;
        self.hops += other.hops;
        self.diameter = self.diameter.max(other.diameter);
        self.inverse_hops += other.inverse_hops;
        self.detour_pairs += other.detour_pairs;
        self.detour += other.detour;
        self
    }
}

fn source_sums(net: &Network, source: usize, geo: bool) -> PairSums {
    let mut sums = PairSums::default();
    let hops = net.hop_distances(source);
    for target in net.indices().filter(|&t| t != source) {
        let d = hops[target];
        if d == u32::MAX {
            continue;
        }
        sums.reachable += 1;
        sums.hops += d as u64;
        sums.diameter = sums.diameter.max(d);
        sums.inverse_hops += 1.0 / d as f64;
    }

    if geo {
        let origin = net.data_at(source).and_then(|d| d.position);
        if let Some(origin) = origin {
            let lengths = net.path_lengths(source);
            for target in net.indices().filter(|&t| t != source) {
                let path = lengths[target];
                let Some(pos) = net.data_at(target).and_then(|d| d.position) else {
                    continue;
                };
                if path.is_finite() && path > 0.0 {
                    sums.detour_pairs += 1;
                    sums.detour += origin.haversine_m(&pos) / path;
                }
            }
        }
    }
    sums
}

// Ordered sources are reduced in a fixed order, so float sums are reproducible.
fn all_pair_sums(net: &Network, geo: bool) -> PairSums {
    let sources: Vec<usize> = net.indices().collect();
    let partials: Vec<PairSums> = sources
        .par_iter()
        .map(|&s| source_sums(net, s, geo))
        .collect();
    partials.into_iter().fold(PairSums::default(), PairSums::add)
}

/// Mean of `1 / d_hop` over all ordered pairs, unreachable pairs counting 0
pub fn global_efficiency(net: &Network) -> f64 {
    let n = net.node_count();
    if n < 2 {
        return 0.0;
    }
    all_pair_sums(net, false).inverse_hops / (n * (n - 1)) as f64
}

/// Mean ratio of straight-line distance to network path length over
/// reachable ordered pairs with coordinates; 0.0 when there are none
pub fn geospatial_efficiency(net: &Network) -> f64 {
    let sums = all_pair_sums(net, true);
    if sums.detour_pairs == 0 {
        0.0
    } else {
        sums.detour / sums.detour_pairs as f64
    }
}

/// Gini coefficient; 0.0 for empty or all-zero input
pub fn gini(values: &[f64]) -> f64 {
    let total: f64 = values.iter().sum();
    if values.is_empty() || total <= 0.0 {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len() as f64;
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| (i as f64 + 1.0) * x)
        .sum();
    2.0 * weighted / (n * total) - (n + 1.0) / n
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

impl NetworkSummary {
    pub fn compute(net: &Network, centrality_config: &CentralityConfig) -> Self {
        let n = net.node_count();
        let sums = all_pair_sums(net, true);

        let lengths: Vec<f64> = net
            .edge_indices()
            .into_iter()
            .filter_map(|(u, v)| net.edge_at(u, v).map(|e| e.length))
            .collect();
        let (mean_edge_length, std_edge_length) = mean_std(&lengths);

        let degrees: Vec<f64> = net.indices().map(|i| net.degree_at(i) as f64).collect();
        let bc = centrality::betweenness(net, centrality_config);
        let betweenness: Vec<f64> = net.indices().map(|i| bc.at(i)).collect();

        let per_node = |x: f64| if n == 0 { 0.0 } else { x / n as f64 };
        let out_degree: usize = net.indices().map(|i| net.out_degree_at(i)).sum();

        Self {
            nodes: n,
            edges: net.edge_count(),
            walk_edges: net.edge_count_of_kind(EdgeKind::Walk),
            mean_out_degree: per_node(out_degree as f64),
            s0: per_node(net.largest_component_size() as f64),
            diameter: sums.diameter,
            mean_path_length: if sums.reachable == 0 {
                0.0
            } else {
                sums.hops as f64 / sums.reachable as f64
            },
            efficiency: if n < 2 {
                0.0
            } else {
                sums.inverse_hops / (n * (n - 1)) as f64
            },
            geo_efficiency: if sums.detour_pairs == 0 {
                0.0
            } else {
                sums.detour / sums.detour_pairs as f64
            },
            mean_edge_length,
            std_edge_length,
            gini_degree: gini(&degrees),
            gini_betweenness: gini(&betweenness),
        }
    }
}
