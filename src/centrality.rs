//! Betweenness centrality
//!
//! Brandes' algorithm over unweighted (hop-count) shortest paths, following
//! edge direction on directed networks.
//!
//! On networks above `CentralityConfig::approx_threshold` nodes the scores
//! are an APPROXIMATION: only a seeded random sample of
//! `sample_fraction · |V|` source nodes is expanded and the result is scaled
//! by `|V| / k`. The ranking this produces is reproducible for a fixed seed
//! but is not the exact centrality ordering.

use crate::config::CentralityConfig;
use crate::network::{Network, NodeId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::collections::VecDeque;
use tracing::debug;

/// Sources expanded per parallel work unit
const SOURCE_CHUNK: usize = 32;

/// Centrality scores addressed by slot index
#[derive(Debug, Clone)]
pub struct CentralityScores {
    values: Vec<f64>,
    /// Number of source nodes expanded
    pub sources: usize,
    /// True when sources were sampled
    pub approximate: bool,
}

impl CentralityScores {
    pub fn at(&self, idx: usize) -> f64 {
        self.values.get(idx).copied().unwrap_or(0.0)
    }

    pub fn get(&self, net: &Network, id: &NodeId) -> f64 {
        net.index_of(id).map(|idx| self.at(idx)).unwrap_or(0.0)
    }

    /// Node ids sorted by descending score; ties keep insertion order
    pub fn ranking(&self, net: &Network) -> Vec<NodeId> {
        let mut order: Vec<usize> = net.indices().collect();
        order.sort_by(|&a, &b| {
            self.at(b)
                .partial_cmp(&self.at(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order
            .into_iter()
            .filter_map(|idx| net.id_at(idx).cloned())
            .collect()
    }
}

/// Normalized betweenness, sampled according to `config` on large networks
pub fn betweenness(net: &Network, config: &CentralityConfig) -> CentralityScores {
    let n = net.node_count();
    let sample = if n > config.approx_threshold {
        let k = ((config.sample_fraction * n as f64) as usize).clamp(1, n);
        Some(k)
    } else {
        None
    };
    betweenness_centrality(net, sample, config.seed, true)
}

/// Betweenness centrality with an optional number of sampled sources.
///
/// Normalization matches the common convention: `1 / ((n-1)(n-2))` when
/// `normalized`, halving for undirected networks otherwise, and a further
/// `n / k` factor when `k` sources were sampled.
pub fn betweenness_centrality(
    net: &Network,
    sample: Option<usize>,
    seed: u64,
    normalized: bool,
) -> CentralityScores {
    let nodes: Vec<usize> = net.indices().collect();
    let n = nodes.len();
    let bound = net.slot_bound();

    let sources: Vec<usize> = match sample {
        Some(k) if k < n => {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut picked: Vec<usize> = rand::seq::index::sample(&mut rng, n, k)
                .into_iter()
                .map(|i| nodes[i])
                .collect();
            picked.sort_unstable();
            picked
        }
        _ => nodes.clone(),
    };
    let approximate = sources.len() < n;

    debug!(
        nodes = n,
        sources = sources.len(),
        approximate,
        "computing betweenness"
    );

    // Chunk partials are collected in order and summed sequentially so the
    // floating-point reduction does not depend on thread scheduling.
    let partials: Vec<Vec<f64>> = sources
        .par_chunks(SOURCE_CHUNK)
        .map(|chunk| {
            let mut acc = vec![0.0; bound];
            let mut scratch = BrandesScratch::new(bound);
            for &s in chunk {
                scratch.accumulate(net, s, &mut acc);
            }
            acc
        })
        .collect();

    let mut values = vec![0.0; bound];
    for partial in &partials {
        for (v, p) in values.iter_mut().zip(partial) {
            *v += p;
        }
    }

    let scale = if normalized {
        if n <= 2 {
            None
        } else {
            Some(1.0 / ((n - 1) as f64 * (n - 2) as f64))
        }
    } else if !net.is_directed() {
        Some(0.5)
    } else {
        None
    };

    if let Some(mut scale) = scale {
        if approximate && !sources.is_empty() {
            scale *= n as f64 / sources.len() as f64;
        }
        for v in values.iter_mut() {
            *v *= scale;
        }
    }

    CentralityScores {
        values,
        sources: sources.len(),
        approximate,
    }
}

struct BrandesScratch {
    stack: Vec<usize>,
    pred: Vec<Vec<usize>>,
    sigma: Vec<f64>,
    dist: Vec<i64>,
    delta: Vec<f64>,
    queue: VecDeque<usize>,
}

impl BrandesScratch {
    fn new(bound: usize) -> Self {
        Self {
            stack: Vec::with_capacity(bound),
            pred: vec![Vec::new(); bound],
            sigma: vec![0.0; bound],
            dist: vec![-1; bound],
            delta: vec![0.0; bound],
            queue: VecDeque::with_capacity(bound),
        }
    }

    fn accumulate(&mut self, net: &Network, source: usize, acc: &mut [f64]) {
        // Only slots touched by the previous source need resetting
        for &v in &self.stack {
            self.pred[v].clear();
            self.sigma[v] = 0.0;
            self.dist[v] = -1;
            self.delta[v] = 0.0;
        }
        self.stack.clear();
        self.queue.clear();

        self.sigma[source] = 1.0;
        self.dist[source] = 0;
        self.queue.push_back(source);

        while let Some(v) = self.queue.pop_front() {
            self.stack.push(v);
            let next = self.dist[v] + 1;
            for (w, _) in net.successors(v) {
                if self.dist[w] < 0 {
                    self.dist[w] = next;
                    self.queue.push_back(w);
                }
                if self.dist[w] == next {
                    self.sigma[w] += self.sigma[v];
                    self.pred[w].push(v);
                }
            }
        }

        for i in (0..self.stack.len()).rev() {
            let w = self.stack[i];
            let coeff = (1.0 + self.delta[w]) / self.sigma[w];
            for j in 0..self.pred[w].len() {
                let v = self.pred[w][j];
                self.delta[v] += self.sigma[v] * coeff;
            }
            if w != source {
                acc[w] += self.delta[w];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{EdgeData, EdgeKind, NodeData};

    fn star(leaves: usize) -> Network {
        let mut net = Network::undirected();
        net.add_node(NodeData::new("hub"));
        for i in 0..leaves {
            let leaf = format!("l{}", i);
            net.add_node(NodeData::new(leaf.clone()));
            net.add_edge(
                &NodeId::new("hub"),
                &NodeId::new(leaf),
                EdgeData::new(EdgeKind::Line, 1.0),
            )
            .unwrap();
        }
        net
    }

    fn path(n: usize) -> Network {
        let mut net = Network::undirected();
        for i in 0..n {
            net.add_node(NodeData::new(format!("p{}", i)));
        }
        for i in 1..n {
            net.add_edge(
                &NodeId::new(format!("p{}", i - 1)),
                &NodeId::new(format!("p{}", i)),
                EdgeData::new(EdgeKind::Line, 1.0),
            )
            .unwrap();
        }
        net
    }

    #[test]
    fn test_star_hub_is_maximal() {
        let net = star(5);
        let scores = betweenness_centrality(&net, None, 42, true);
        // Every leaf pair routes through the hub: normalized value is 1
        assert!((scores.get(&net, &NodeId::new("hub")) - 1.0).abs() < 1e-12);
        assert_eq!(scores.get(&net, &NodeId::new("l0")), 0.0);
        assert_eq!(scores.ranking(&net)[0], NodeId::new("hub"));
    }

    #[test]
    fn test_path_unnormalized() {
        let net = path(3);
        let scores = betweenness_centrality(&net, None, 42, false);
        // Middle node lies on the single pair (p0, p2)
        assert!((scores.get(&net, &NodeId::new("p1")) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_directed_path() {
        let mut net = Network::directed();
        for n in ["a", "b", "c"] {
            net.add_node(NodeData::new(n));
        }
        let e = EdgeData::new(EdgeKind::Line, 1.0);
        net.add_edge(&NodeId::new("a"), &NodeId::new("b"), e).unwrap();
        net.add_edge(&NodeId::new("b"), &NodeId::new("c"), e).unwrap();
        let scores = betweenness_centrality(&net, None, 42, false);
        assert!((scores.get(&net, &NodeId::new("b")) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sampling_is_reproducible() {
        let net = path(40);
        let config = CentralityConfig {
            approx_threshold: 10,
            sample_fraction: 0.25,
            seed: 7,
        };
        let a = betweenness(&net, &config);
        let b = betweenness(&net, &config);
        assert!(a.approximate);
        assert_eq!(a.sources, 10);
        assert_eq!(a.ranking(&net), b.ranking(&net));
    }

    #[test]
    fn test_exact_below_threshold() {
        let net = path(10);
        let scores = betweenness(&net, &CentralityConfig::default());
        assert!(!scores.approximate);
        assert_eq!(scores.sources, 10);
    }
}
