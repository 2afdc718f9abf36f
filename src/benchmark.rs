//! Null-model benchmark graphs
//!
//! A benchmark is a uniform random graph with the same node count, edge
//! count and directedness as a real network. Positions, modes and names of
//! real stops are reassigned to benchmark nodes (sampled without
//! replacement) so geospatial metrics stay computable.

use crate::aggregate::{self, ResilienceTable};
use crate::attack::{self, AttackStrategy};
use crate::config::{BenchmarkConfig, CentralityConfig, PercolationConfig};
use crate::error::{ResilienceError, Result};
use crate::network::{EdgeKind, Network, NodeData, NodeId};
use crate::percolation;
use crate::progress::Progress;
use crate::topology;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

fn max_edges(n: usize, directed: bool) -> usize {
    let pairs = n.saturating_mul(n.saturating_sub(1));
    if directed {
        pairs
    } else {
        pairs / 2
    }
}

/// `m` distinct node pairs drawn uniformly from the `n`-node pair space
fn random_edges(n: usize, m: usize, directed: bool, rng: &mut StdRng) -> Vec<(usize, usize)> {
    let capacity = max_edges(n, directed);

    // Dense targets: enumerate the pair space and draw without replacement
    if m.saturating_mul(2) >= capacity {
        let mut all: Vec<(usize, usize)> = (0..n)
            .flat_map(|u| (0..n).map(move |v| (u, v)))
            .filter(|&(u, v)| u != v && (directed || u < v))
            .collect();
        let keep = m.min(all.len());
        let (chosen, _) = all.partial_shuffle(rng, keep);
        return chosen.to_vec();
    }

    let mut seen = HashSet::with_capacity(m);
    let mut edges = Vec::with_capacity(m);
    while edges.len() < m {
        let u = rng.gen_range(0..n);
        let v = rng.gen_range(0..n);
        if u == v {
            continue;
        }
        let key = if directed || u < v { (u, v) } else { (v, u) };
        if seen.insert(key) {
            edges.push(key);
        }
    }
    edges
}

/// G(n, m) benchmark for `real`. Fewer than two nodes or no edges returns a
/// copy of `real`.
pub fn generate_benchmark_graph(real: &Network, seed: u64) -> Network {
    let n = real.node_count();
    let m = real.edge_count();
    if n < 2 || m == 0 {
        return real.clone();
    }

    let mut graph_rng = StdRng::seed_from_u64(seed);
    let pairs = random_edges(n, m, real.is_directed(), &mut graph_rng);

    let positioned: Vec<&NodeData> = real.nodes().filter(|d| d.position.is_some()).collect();
    let mut attr_rng = StdRng::seed_from_u64(seed);
    let donors: Vec<&NodeData> = positioned
        .choose_multiple(&mut attr_rng, positioned.len().min(n))
        .copied()
        .collect();

    let mut bench = Network::new(real.is_directed());
    let ids: Vec<NodeId> = (0..n).map(|i| NodeId::new(format!("b{}", i))).collect();
    for (i, id) in ids.iter().enumerate() {
        let mut data = NodeData::new(id.0.clone());
        if let Some(donor) = donors.get(i) {
            data.mode = donor.mode.clone();
            data.name = donor.name.clone();
            data.position = donor.position;
        }
        bench.add_node(data);
    }

    // Slots follow insertion order and the pairs are distinct
    let mut added = 0;
    for (u, v) in pairs {
        if bench.connect_at(u, v, EdgeKind::Line) {
            added += 1;
        }
    }
    if added != m {
        warn!(expected = m, added, "benchmark edge count differs from the real network");
    }
    bench
}

/// Efficiency baselines over benchmark replicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkStats {
    pub replicates: usize,
    pub efficiency_mean: f64,
    pub efficiency_std: f64,
    pub geo_efficiency_mean: f64,
    pub geo_efficiency_std: f64,
}

impl BenchmarkStats {
    pub fn efficiency_z(&self, value: f64) -> f64 {
        z_score(value, self.efficiency_mean, self.efficiency_std)
    }

    pub fn geo_efficiency_z(&self, value: f64) -> f64 {
        z_score(value, self.geo_efficiency_mean, self.geo_efficiency_std)
    }
}

/// `(value - mean) / std`; 0.0 when `std` is zero or not finite
pub fn z_score(value: f64, mean: f64, std: f64) -> f64 {
    if std == 0.0 || !std.is_finite() || !value.is_finite() || !mean.is_finite() {
        return 0.0;
    }
    (value - mean) / std
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

/// Largest (weakly) connected component as its own network
pub fn largest_component(net: &Network) -> Network {
    match net.components().into_iter().next() {
        Some(nodes) => net.subgraph(&nodes),
        None => net.clone(),
    }
}

/// Global and geospatial efficiency of each replicate's largest component
pub fn benchmark_stats(real: &Network, config: &BenchmarkConfig, progress: &Progress) -> BenchmarkStats {
    let done = AtomicUsize::new(0);
    let samples: Vec<(f64, f64)> = (0..config.replicates as u64)
        .into_par_iter()
        .filter_map(|i| {
            let bench = generate_benchmark_graph(real, config.base_seed.wrapping_add(i));
            progress.report("benchmark", done.fetch_add(1, Ordering::Relaxed) + 1, config.replicates);
            if bench.node_count() < 2 {
                return None;
            }
            let lcc = largest_component(&bench);
            Some((
                topology::global_efficiency(&lcc),
                topology::geospatial_efficiency(&lcc),
            ))
        })
        .collect();

    let efficiency: Vec<f64> = samples.iter().map(|s| s.0).collect();
    let geo: Vec<f64> = samples.iter().map(|s| s.1).collect();
    let (efficiency_mean, efficiency_std) = mean_std(&efficiency);
    let (geo_efficiency_mean, geo_efficiency_std) = mean_std(&geo);

    info!(
        replicates = samples.len(),
        efficiency_mean, geo_efficiency_mean, "benchmark baselines ready"
    );

    BenchmarkStats {
        replicates: samples.len(),
        efficiency_mean,
        efficiency_std,
        geo_efficiency_mean,
        geo_efficiency_std,
    }
}

/// Resilience curve of every benchmark replicate under `strategy`, in
/// replicate order. Replicates run in parallel; each one simulates its own
/// trials sequentially. Replicates without signal are dropped.
pub fn benchmark_resilience(
    real: &Network,
    strategy: AttackStrategy,
    benchmark: &BenchmarkConfig,
    percolation_config: &PercolationConfig,
    centrality: &CentralityConfig,
    progress: &Progress,
) -> Result<Vec<ResilienceTable>> {
    let done = AtomicUsize::new(0);
    let tables: Vec<Option<ResilienceTable>> = (0..benchmark.replicates as u64)
        .into_par_iter()
        .map(|i| {
            let bench = generate_benchmark_graph(real, benchmark.base_seed.wrapping_add(i));
            let orders = match strategy {
                AttackStrategy::Random { seed } => {
                    attack::random_orders(&bench, percolation_config.random_trials, seed)
                }
                other => vec![attack::removal_order(&bench, other, centrality)],
            };
            let trajectories: Vec<_> = orders
                .iter()
                .map(|order| percolation::simulate_attack(&bench, order, percolation_config.removal_steps))
                .collect();
            progress.report("benchmark_resilience", done.fetch_add(1, Ordering::Relaxed) + 1, benchmark.replicates);
            let table = aggregate::aggregate(&trajectories, percolation_config.removal_steps);
            if table.is_none() {
                warn!(replicate = i, "benchmark replicate produced no signal");
            }
            table
        })
        .collect();

    let tables: Vec<ResilienceTable> = tables.into_iter().flatten().collect();
    if tables.is_empty() {
        return Err(ResilienceError::NoData);
    }
    Ok(tables)
}
