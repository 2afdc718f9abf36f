//! Functional recoverability and the per-node metrics table

use crate::cascade;
use crate::centrality;
use crate::config::{CascadeConfig, CentralityConfig};
use crate::error::{ResilienceError, Result};
use crate::flow::CapacityMap;
use crate::motif::MotifScores;
use crate::network::{Network, NodeId};
use crate::progress::Progress;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// `1 - failed_edges / |E|` after the cascade triggered by removing `node`.
/// A network without edges is fully recoverable (1.0).
pub fn recoverability(
    net: &Network,
    capacity: &CapacityMap,
    node: &NodeId,
    config: &CascadeConfig,
) -> Result<f64> {
    if !net.contains(node) {
        return Err(ResilienceError::UnknownNode(node.clone()));
    }
    let edges = net.edge_count();
    if edges == 0 {
        return Ok(1.0);
    }
    let outcome = cascade::simulate_cascade(net, capacity, std::slice::from_ref(node), config)?;
    Ok(1.0 - outcome.failed_edges as f64 / edges as f64)
}

/// One row of the node metrics table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetricsRow {
    pub node: NodeId,
    pub degree: usize,
    pub betweenness: f64,
    pub motif_score: u64,
    pub recoverability: f64,
    pub beta: f64,
}

/// Nodes to evaluate: all of them, or a seeded sample of `sample` nodes in
/// insertion order
pub fn sample_nodes(net: &Network, sample: Option<usize>, seed: u64) -> Vec<NodeId> {
    let ids = net.node_ids();
    match sample {
        Some(k) if k < ids.len() => {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut picked = rand::seq::index::sample(&mut rng, ids.len(), k).into_vec();
            picked.sort_unstable();
            picked.into_iter().map(|i| ids[i].clone()).collect()
        }
        _ => ids,
    }
}

/// Degree, betweenness, motif score and recoverability for every node (or a
/// seeded sample of nodes)
pub fn node_metrics(
    net: &Network,
    sample: Option<usize>,
    capacity: &CapacityMap,
    cascade_config: &CascadeConfig,
    centrality_config: &CentralityConfig,
    progress: &Progress,
) -> Result<Vec<NodeMetricsRow>> {
    let nodes = sample_nodes(net, sample, cascade_config.seed);
    info!(
        nodes = nodes.len(),
        beta = capacity.beta,
        "computing node metrics"
    );

    let betweenness = centrality::betweenness(net, centrality_config);
    let motif = MotifScores::compute(net);
    let done = AtomicUsize::new(0);

    nodes
        .par_iter()
        .map(|node| {
            let rec = recoverability(net, capacity, node, cascade_config)?;
            progress.report("recoverability", done.fetch_add(1, Ordering::Relaxed) + 1, nodes.len());
            Ok(NodeMetricsRow {
                node: node.clone(),
                degree: net.degree(node),
                betweenness: betweenness.get(net, node),
                motif_score: motif.get(net, node),
                recoverability: rec,
                beta: capacity.beta,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{self, LoadMap};
    use crate::network::{EdgeData, EdgeKind, NodeData};

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
    fn test_no_edges_is_fully_recoverable() {
        let mut net = Network::undirected();
        net.add_node(NodeData::new("a"));
        let capacity = LoadMap::default().capacity(0.1);
        let r = recoverability(&net, &capacity, &NodeId::new("a"), &CascadeConfig::default()).unwrap();
        assert_eq!(r, 1.0);
    }

    #[test]
    fn test_generous_capacity_is_fully_recoverable() {
        let net = path(5);
        let config = CascadeConfig {
            flow_samples: 1000,
            iteration_flow_divisor: 1,
            ..CascadeConfig::default()
        };
        let capacity = flow::estimate_load(&net, config.flow_samples, config.seed, &Progress::Silent)
            .capacity(10.0);
        let r = recoverability(&net, &capacity, &NodeId::new("p0"), &config).unwrap();
        assert_eq!(r, 1.0);
    }

    #[test]
    fn test_unknown_node() {
        let net = path(3);
        let capacity = LoadMap::default().capacity(0.1);
        assert!(recoverability(&net, &capacity, &NodeId::new("x"), &CascadeConfig::default()).is_err());
    }

    #[test]
    fn test_sample_nodes_is_seeded_subset() {
        let net = path(20);
        let a = sample_nodes(&net, Some(5), 42);
        assert_eq!(a.len(), 5);
        assert_eq!(a, sample_nodes(&net, Some(5), 42));
        assert_eq!(sample_nodes(&net, Some(50), 42).len(), 20);
        assert_eq!(sample_nodes(&net, None, 42), net.node_ids());
    }

    #[test]
    fn test_node_metrics_rows() {
        let net = path(4);
        let config = CascadeConfig {
            flow_samples: 200,
            ..CascadeConfig::default()
        };
        let capacity = flow::estimate_load(&net, 200, 42, &Progress::Silent).capacity(config.beta);
        let rows = node_metrics(
            &net,
            None,
            &capacity,
            &config,
            &CentralityConfig::default(),
            &Progress::Silent,
        )
        .unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].node, NodeId::new("p0"));
        assert_eq!(rows[1].degree, 2);
        assert!(rows[1].betweenness > rows[0].betweenness);
        assert!(rows.iter().all(|r| (0.0..=1.0).contains(&r.recoverability)));
    }
}
