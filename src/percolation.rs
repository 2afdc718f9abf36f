//! Percolation simulator
//!
//! Nodes are removed in attack order, `max(1, |V| / R)` at a time, and the
//! size of the largest (weakly) connected component is tracked relative to
//! its initial size.
//!
//! Ensembles run on a bounded rayon pool. Each trial is shipped to its
//! worker as an encoded payload and decoded into a private network copy, so
//! workers share no mutable state. Results stream back over a channel to the
//! calling thread, which drives the progress hook and restores trial order
//! before aggregation.

use crate::aggregate::{self, ResilienceTable};
use crate::attack::{self, AttackStrategy};
use crate::config::{CentralityConfig, PercolationConfig};
use crate::error::{ResilienceError, Result};
use crate::network::{Network, NodeId};
use crate::progress::Progress;
use crossbeam::channel;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use tracing::{info, warn};

/// One (removed fraction, relative LCC size) sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub q: f64,
    pub s: f64,
}

/// Per-trial message sent to a worker
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrialTask {
    order: Vec<NodeId>,
    removal_steps: usize,
}

/// Simulate one attack on a private copy of `net`.
///
/// The first sample is always `(0, 1)`. A network without nodes or edges
/// yields an empty trajectory, which callers treat as "no signal".
pub fn simulate_attack(net: &Network, order: &[NodeId], removal_steps: usize) -> Vec<CurvePoint> {
    if net.node_count() == 0 || net.edge_count() == 0 {
        return Vec::new();
    }

    let mut work = net.clone();
    let initial = work.node_count();
    let s0 = work.largest_component_size().max(1) as f64;
    let step = (initial / removal_steps.max(1)).max(1);

    let mut curve = vec![CurvePoint { q: 0.0, s: 1.0 }];
    let mut start = 0;
    while start < initial {
        let end = (start + step).min(order.len());
        if start < end {
            work.remove_nodes(&order[start..end]);
        }
        start += step;

        let q = (initial - work.node_count()) as f64 / initial as f64;
        if work.is_empty() {
            if curve.last().map(|p| p.q < 1.0).unwrap_or(true) {
                curve.push(CurvePoint { q: 1.0, s: 0.0 });
            }
            break;
        }

        let s = work.largest_component_size() as f64 / s0;
        curve.push(CurvePoint { q, s });
    }

    curve
}

/// Worker count: bounded by cores, tasks and the configured cap
fn worker_count(tasks: usize, max_workers: Option<usize>) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cores
        .min(tasks)
        .min(max_workers.unwrap_or(usize::MAX))
        .max(1)
}

fn run_trial(snapshot: &[u8], payload: &[u8], trial: usize) -> Result<Vec<CurvePoint>> {
    let undecodable =
        |e: bincode::Error| ResilienceError::TrialFailed(trial, ResilienceError::from(e).to_string());
    let network: Network = bincode::deserialize(snapshot).map_err(undecodable)?;
    let task: TrialTask = bincode::deserialize(payload).map_err(undecodable)?;
    panic::catch_unwind(AssertUnwindSafe(|| {
        simulate_attack(&network, &task.order, task.removal_steps)
    }))
    .map_err(|cause| {
        let reason = cause
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| cause.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic".to_string());
        ResilienceError::TrialFailed(trial, reason)
    })
}

/// Simulate every attack order in parallel.
///
/// Returns the successful trajectories in trial order. Failed trials are
/// logged and dropped; if every trial fails the result is `NoData`.
pub fn run_ensemble(
    net: &Network,
    orders: &[Vec<NodeId>],
    config: &PercolationConfig,
    progress: &Progress,
) -> Result<Vec<Vec<CurvePoint>>> {
    if orders.is_empty() {
        return Err(ResilienceError::NoData);
    }

    let snapshot = bincode::serialize(net)?;
    let payloads = orders
        .iter()
        .map(|order| {
            bincode::serialize(&TrialTask {
                order: order.clone(),
                removal_steps: config.removal_steps,
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let total = payloads.len();
    let workers = worker_count(total, config.max_workers);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| ResilienceError::InvalidConfig(format!("worker pool: {}", e)))?;

    info!(
        trials = total,
        workers,
        nodes = net.node_count(),
        "launching percolation ensemble"
    );

    let (tx, rx) = channel::unbounded::<(usize, Result<Vec<CurvePoint>>)>();

    let outcomes = std::thread::scope(|scope| {
        let snapshot = &snapshot;
        let payloads = &payloads;
        scope.spawn(move || {
            pool.install(|| {
                payloads
                    .par_iter()
                    .enumerate()
                    .for_each_with(tx, |tx, (trial, payload)| {
                        let _ = tx.send((trial, run_trial(snapshot, payload, trial)));
                    });
            });
        });

        let mut received = Vec::with_capacity(total);
        for message in rx.iter() {
            received.push(message);
            progress.report("percolation", received.len(), total);
        }
        received
    });

    collect_trajectories(outcomes)
}

/// Restore trial order and drop failed trials
fn collect_trajectories(
    mut outcomes: Vec<(usize, Result<Vec<CurvePoint>>)>,
) -> Result<Vec<Vec<CurvePoint>>> {
    outcomes.sort_by_key(|(trial, _)| *trial);

    let mut trajectories = Vec::with_capacity(outcomes.len());
    for (trial, outcome) in outcomes {
        match outcome {
            Ok(curve) => trajectories.push(curve),
            Err(e) => warn!(trial, error = %e, "percolation trial excluded"),
        }
    }

    if trajectories.is_empty() {
        return Err(ResilienceError::NoData);
    }
    Ok(trajectories)
}

/// Run an ensemble over pre-ordered attack lists and aggregate it onto the
/// canonical grid.
pub fn run_resilience_analysis(
    net: &Network,
    orders: &[Vec<NodeId>],
    config: &PercolationConfig,
    progress: &Progress,
) -> Result<ResilienceTable> {
    let trajectories = run_ensemble(net, orders, config, progress)?;
    aggregate::aggregate(&trajectories, config.removal_steps).ok_or(ResilienceError::NoData)
}

/// Rank the network by `strategy` and run the full resilience analysis.
///
/// The random strategy expands to `random_trials` independently seeded
/// orders; deterministic strategies run a single trial.
pub fn analyse_strategy(
    net: &Network,
    strategy: AttackStrategy,
    config: &PercolationConfig,
    centrality: &CentralityConfig,
    progress: &Progress,
) -> Result<ResilienceTable> {
    let orders = match strategy {
        AttackStrategy::Random { seed } => attack::random_orders(net, config.random_trials, seed),
        other => vec![attack::removal_order(net, other, centrality)],
    };
    run_resilience_analysis(net, &orders, config, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{EdgeData, EdgeKind, NodeData};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ring(n: usize) -> Network {
        let mut net = Network::undirected();
        for i in 0..n {
            net.add_node(NodeData::new(format!("n{}", i)));
        }
        for i in 0..n {
            net.add_edge(
                &NodeId::new(format!("n{}", i)),
                &NodeId::new(format!("n{}", (i + 1) % n)),
                EdgeData::new(EdgeKind::Line, 1.0),
            )
            .unwrap();
        }
        net
    }

    fn ids(names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|s| NodeId::new(*s)).collect()
    }

    #[test]
    fn test_ring_insertion_order() {
        let net = ring(10);
        let order = net.node_ids();
        let curve = simulate_attack(&net, &order, 5);
        let expected = [(0.0, 1.0), (0.2, 0.8), (0.4, 0.6), (0.6, 0.4), (0.8, 0.2), (1.0, 0.0)];
        assert_eq!(curve.len(), expected.len());
        for (point, (q, s)) in curve.iter().zip(expected) {
            assert!((point.q - q).abs() < 1e-12);
            assert!((point.s - s).abs() < 1e-12);
        }
    }

    #[test]
    fn test_ring_split_is_nonlinear() {
        let net = ring(10);
        let order = ids(&["n0", "n5", "n1", "n2", "n3", "n4", "n6", "n7", "n8", "n9"]);
        let curve = simulate_attack(&net, &order, 5);
        // Two opposite cuts leave two paths of four nodes each
        assert!((curve[1].q - 0.2).abs() < 1e-12);
        assert!((curve[1].s - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_single_cut_keeps_ring_connected() {
        let net = ring(10);
        let curve = simulate_attack(&net, &net.node_ids(), 10);
        assert!((curve[1].q - 0.1).abs() < 1e-12);
        assert!((curve[1].s - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_empty_network_has_no_signal() {
        let mut net = Network::undirected();
        assert!(simulate_attack(&net, &[], 5).is_empty());
        net.add_node(NodeData::new("lonely"));
        assert!(simulate_attack(&net, &ids(&["lonely"]), 5).is_empty());
    }

    #[test]
    fn test_short_order_is_tolerated() {
        let net = ring(6);
        let curve = simulate_attack(&net, &ids(&["n0", "ghost"]), 3);
        assert_eq!(curve[0], CurvePoint { q: 0.0, s: 1.0 });
        assert!(curve.windows(2).all(|w| w[0].q <= w[1].q));
        assert!((curve.last().unwrap().q - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_canonical_network_untouched() {
        let net = ring(8);
        let _ = simulate_attack(&net, &net.node_ids(), 4);
        assert_eq!(net.node_count(), 8);
        assert_eq!(net.edge_count(), 8);
    }

    #[test]
    fn test_ensemble_matches_sequential() {
        let net = ring(12);
        let orders = attack::random_orders(&net, 6, 1);
        let config = PercolationConfig {
            removal_steps: 4,
            random_trials: 6,
            max_workers: Some(3),
        };
        let parallel = run_ensemble(&net, &orders, &config, &Progress::Silent).unwrap();
        let sequential: Vec<_> = orders.iter().map(|o| simulate_attack(&net, o, 4)).collect();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_ensemble_reports_progress() {
        let net = ring(10);
        let orders = attack::random_orders(&net, 5, 7);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let progress = Progress::callback(move |event| {
            assert_eq!(event.total, 5);
            counter.fetch_add(1, Ordering::Relaxed);
        });
        run_ensemble(&net, &orders, &PercolationConfig::default(), &progress).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_analysis_grid_length() {
        let net = ring(10);
        let config = PercolationConfig {
            removal_steps: 5,
            random_trials: 4,
            max_workers: None,
        };
        let table = analyse_strategy(
            &net,
            AttackStrategy::Random { seed: 0 },
            &config,
            &CentralityConfig::default(),
            &Progress::Silent,
        )
        .unwrap();
        assert_eq!(table.len(), 7);
        assert_eq!(table.trials, 4);
        let rb = table.robustness();
        assert!((0.0..=1.0).contains(&rb));
    }

    #[test]
    fn test_no_orders_is_no_data() {
        let net = ring(4);
        let err = run_ensemble(&net, &[], &PercolationConfig::default(), &Progress::Silent);
        assert!(matches!(err, Err(ResilienceError::NoData)));
    }

    #[test]
    fn test_corrupt_payload_fails_the_trial() {
        let net = ring(4);
        let snapshot = bincode::serialize(&net).unwrap();
        let payload = bincode::serialize(&TrialTask {
            order: net.node_ids(),
            removal_steps: 2,
        })
        .unwrap();
        assert_eq!(run_trial(&snapshot, &payload, 0).unwrap().len(), 3);

        let err = run_trial(&snapshot, &[1, 2, 3], 4).unwrap_err();
        assert!(matches!(err, ResilienceError::TrialFailed(4, ref reason) if reason.contains("codec")));
        let err = run_trial(&[0xff], &payload, 5).unwrap_err();
        assert!(matches!(err, ResilienceError::TrialFailed(5, _)));
    }

    #[test]
    fn test_failed_trials_are_dropped_in_order() {
        let curve = |s: f64| vec![CurvePoint { q: 0.0, s: 1.0 }, CurvePoint { q: 1.0, s }];
        let outcomes = vec![
            (2, Ok(curve(0.2))),
            (1, Err(ResilienceError::TrialFailed(1, "panic".into()))),
            (0, Ok(curve(0.0))),
            (3, Err(ResilienceError::Codec("truncated".into()))),
        ];
        let trajectories = collect_trajectories(outcomes).unwrap();
        assert_eq!(trajectories, vec![curve(0.0), curve(0.2)]);
    }

    #[test]
    fn test_all_failed_trials_is_no_data() {
        let outcomes = vec![
            (0, Err(ResilienceError::TrialFailed(0, "panic".into()))),
            (1, Err(ResilienceError::TrialFailed(1, "panic".into()))),
        ];
        assert!(matches!(collect_trajectories(outcomes), Err(ResilienceError::NoData)));
        assert!(matches!(collect_trajectories(Vec::new()), Err(ResilienceError::NoData)));
    }
}
