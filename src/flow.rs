//! OD-flow load estimation and edge capacities
//!
//! Load is the number of sampled origin-destination shortest paths that
//! traverse an edge. Edges are keyed by slot-index pairs, so a load or
//! capacity map estimated on a network stays valid for every working copy
//! cloned from it. Undirected edges use the (smaller, larger) slot pair.

use crate::network::{Network, NodeId, PathFinder};
use crate::progress::Progress;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// OD pairs routed per parallel work unit
const PAIR_CHUNK: usize = 256;

/// Slot-index edge key
pub type EdgeKey = (usize, usize);

/// Canonical key of the edge u→v in `net`
pub fn edge_key(net: &Network, u: usize, v: usize) -> EdgeKey {
    if net.is_directed() || u < v {
        (u, v)
    } else {
        (v, u)
    }
}

/// Per-edge traversal counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadMap {
    loads: BTreeMap<EdgeKey, u64>,
}

impl LoadMap {
    pub fn get(&self, key: EdgeKey) -> u64 {
        self.loads.get(&key).copied().unwrap_or(0)
    }

    /// Loaded edges in key order
    pub fn iter(&self) -> impl Iterator<Item = (EdgeKey, u64)> + '_ {
        self.loads.iter().map(|(&k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.loads.values().sum()
    }

    /// Capacities `(1 + beta) · load`
    pub fn capacity(&self, beta: f64) -> CapacityMap {
        CapacityMap {
            capacities: self
                .loads
                .iter()
                .map(|(&k, &load)| (k, (1.0 + beta) * load as f64))
                .collect(),
            beta,
        }
    }

    /// Loads resolved to node ids, for reporting
    pub fn named(&self, net: &Network) -> Vec<EdgeLoad> {
        self.iter()
            .filter_map(|((u, v), load)| {
                Some(EdgeLoad {
                    source: net.id_at(u)?.clone(),
                    target: net.id_at(v)?.clone(),
                    load,
                })
            })
            .collect()
    }

    fn merge(&mut self, other: LoadMap) {
        for (k, v) in other.loads {
            *self.loads.entry(k).or_insert(0) += v;
        }
    }
}

/// Load of one edge, addressed by node ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeLoad {
    pub source: NodeId,
    pub target: NodeId,
    pub load: u64,
}

/// Edge capacities derived from a base load
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityMap {
    capacities: BTreeMap<EdgeKey, f64>,
    pub beta: f64,
}

impl CapacityMap {
    /// Capacity of an edge; edges that carried no base load have capacity 0
    pub fn get(&self, key: EdgeKey) -> f64 {
        self.capacities.get(&key).copied().unwrap_or(0.0)
    }

    pub fn is_overloaded(&self, key: EdgeKey, load: u64) -> bool {
        load as f64 > self.get(key)
    }

    pub fn len(&self) -> usize {
        self.capacities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capacities.is_empty()
    }
}

/// `samples` OD pairs of distinct live nodes, drawn uniformly with `seed`
pub fn sample_od_pairs(net: &Network, samples: usize, seed: u64) -> Vec<(usize, usize)> {
    let nodes: Vec<usize> = net.indices().collect();
    if nodes.len() < 2 {
        return Vec::new();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    (0..samples)
        .map(|_| {
            let pick = rand::seq::index::sample(&mut rng, nodes.len(), 2);
            (nodes[pick.index(0)], nodes[pick.index(1)])
        })
        .collect()
}

/// Route `samples` seeded OD pairs along length-weighted shortest paths and
/// count edge traversals. Pairs without a path are skipped.
pub fn estimate_load(net: &Network, samples: usize, seed: u64, progress: &Progress) -> LoadMap {
    let pairs = sample_od_pairs(net, samples, seed);
    if pairs.is_empty() {
        return LoadMap::default();
    }

    let chunks = pairs.len().div_ceil(PAIR_CHUNK);
    let done = AtomicUsize::new(0);

    let partials: Vec<(LoadMap, usize)> = pairs
        .par_chunks(PAIR_CHUNK)
        .map(|chunk| {
            let mut local = LoadMap::default();
            let mut finder = PathFinder::new(net.slot_bound());
            let mut unroutable = 0;
            for &(s, t) in chunk {
                match finder.shortest_path(net, s, t) {
                    Some(path) => {
                        for hop in path.windows(2) {
                            *local.loads.entry(edge_key(net, hop[0], hop[1])).or_insert(0) += 1;
                        }
                    }
                    None => unroutable += 1,
                }
            }
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            progress.report("load", finished, chunks);
            (local, unroutable)
        })
        .collect();

    let mut load = LoadMap::default();
    let mut unroutable = 0;
    for (partial, skipped) in partials {
        load.merge(partial);
        unroutable += skipped;
    }

    debug!(
        pairs = pairs.len(),
        unroutable,
        loaded_edges = load.len(),
        "estimated OD load"
    );
    load
}
