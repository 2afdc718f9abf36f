//! Load-driven cascading failure
//!
//! A trigger set of nodes is removed from a private working copy. Load is
//! then re-estimated on the damaged copy round after round; every edge whose
//! new load exceeds its base capacity fails and is removed, until no edge
//! fails, the copy runs out of edges, or the round cap is reached.
//!
//! The node-load variant treats sampled betweenness as the load of a stop.
//! Each stop's capacity is `(1 + α)` times its load on the intact network;
//! after the trigger fails, every stop whose recomputed load exceeds its
//! capacity fails in the next wave.

use crate::centrality::{self, CentralityScores};
use crate::config::CascadeConfig;
use crate::error::{ResilienceError, Result};
use crate::flow::{self, CapacityMap, EdgeKey, LoadMap};
use crate::network::{Network, NodeId};
use crate::progress::Progress;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Damage caused by one cascade run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeOutcome {
    /// Trigger nodes actually removed
    pub failed_nodes: usize,
    /// Edges failed by overload over all rounds
    pub failed_edges: usize,
    /// Edges failed in the first propagation round
    pub first_wave_edges: usize,
    /// Propagation rounds that produced failures
    pub rounds: usize,
    /// LCC loss after the trigger removal and the first round
    pub first_wave_loss: f64,
    /// LCC loss at the fixed point
    pub total_loss: f64,
}

impl CascadeOutcome {
    /// Failed nodes plus failed edges
    pub fn total_damage(&self) -> usize {
        self.failed_nodes + self.failed_edges
    }

    pub fn first_wave_damage(&self) -> usize {
        self.failed_nodes + self.first_wave_edges
    }
}

/// Per-trigger cascade damage record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeDamageRecord {
    pub trigger: Vec<NodeId>,
    pub failed_nodes: usize,
    pub failed_edges: usize,
    pub first_wave_loss: f64,
    pub total_loss: f64,
    pub beta: f64,
    pub total_damage: usize,
}

impl CascadeDamageRecord {
    pub fn new(trigger: Vec<NodeId>, outcome: &CascadeOutcome, beta: f64) -> Self {
        Self {
            trigger,
            failed_nodes: outcome.failed_nodes,
            failed_edges: outcome.failed_edges,
            first_wave_loss: outcome.first_wave_loss,
            total_loss: outcome.total_loss,
            beta,
            total_damage: outcome.total_damage(),
        }
    }
}

/// Cascade size for one tolerance value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaSweepRow {
    pub beta: f64,
    pub cascade_size: usize,
}

/// Cascade size for a top-k trigger set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KAttackRow {
    pub k: usize,
    pub beta: f64,
    pub cascade_size: usize,
}

/// Relative loss of the largest component: `1 - LCC(damaged) / LCC(original)`.
/// 1.0 when either network is empty.
pub fn lcc_loss(original: &Network, damaged: &Network) -> f64 {
    let before = original.largest_component_size();
    if before == 0 || damaged.is_empty() {
        return 1.0;
    }
    1.0 - damaged.largest_component_size() as f64 / before as f64
}

/// Run one cascade triggered by removing `trigger` from a copy of `net`.
///
/// `capacity` must have been derived from a load estimated on `net` (or on
/// the network `net` was cloned from), since edges are matched by slot.
pub fn simulate_cascade(
    net: &Network,
    capacity: &CapacityMap,
    trigger: &[NodeId],
    config: &CascadeConfig,
) -> Result<CascadeOutcome> {
    let mut work = net.clone();
    let mut removed: HashSet<&NodeId> = HashSet::new();
    for id in trigger {
        if !net.contains(id) {
            return Err(ResilienceError::UnknownNode(id.clone()));
        }
        if removed.insert(id) {
            work.remove_node(id);
        }
    }

    let samples = config.iteration_samples();
    let mut failed: BTreeSet<EdgeKey> = BTreeSet::new();
    let mut first_wave: Option<(usize, f64)> = None;
    let mut rounds = 0;

    for round in 0..config.max_rounds {
        if work.node_count() < 2 || work.edge_count() == 0 {
            break;
        }

        let load = flow::estimate_load(&work, samples, config.seed, &Progress::Silent);
        let newly = overloaded_edges(&load, capacity, &failed);
        if newly.is_empty() {
            break;
        }

        for &(u, v) in &newly {
            work.remove_edge_at(u, v);
        }
        failed.extend(newly.iter().copied());
        rounds += 1;

        debug!(round, new_failures = newly.len(), total = failed.len(), "cascade round");

        if round == 0 {
            first_wave = Some((failed.len(), lcc_loss(net, &work)));
        }
    }

    let total_loss = lcc_loss(net, &work);
    let (first_wave_edges, first_wave_loss) = first_wave.unwrap_or((failed.len(), total_loss));

    Ok(CascadeOutcome {
        failed_nodes: removed.len(),
        failed_edges: failed.len(),
        first_wave_edges,
        rounds,
        first_wave_loss,
        total_loss,
    })
}

fn overloaded_edges(load: &LoadMap, capacity: &CapacityMap, failed: &BTreeSet<EdgeKey>) -> Vec<EdgeKey> {
    load.iter()
        .filter(|(key, l)| !failed.contains(key) && capacity.is_overloaded(*key, *l))
        .map(|(key, _)| key)
        .collect()
}

/// Single-node cascades for each trigger, run in parallel
pub fn single_node_cascades(
    net: &Network,
    capacity: &CapacityMap,
    triggers: &[NodeId],
    config: &CascadeConfig,
    progress: &Progress,
) -> Result<Vec<CascadeDamageRecord>> {
    info!(triggers = triggers.len(), beta = capacity.beta, "running single-node cascades");
    let done = AtomicUsize::new(0);
    triggers
        .par_iter()
        .map(|node| {
            let trigger = vec![node.clone()];
            let outcome = simulate_cascade(net, capacity, &trigger, config);
            progress.report("cascade", done.fetch_add(1, Ordering::Relaxed) + 1, triggers.len());
            outcome.map(|o| CascadeDamageRecord::new(trigger, &o, capacity.beta))
        })
        .collect()
}

/// Cascade size triggered by `trigger` for each tolerance in `betas`
pub fn beta_sweep(
    net: &Network,
    base_load: &LoadMap,
    betas: &[f64],
    trigger: &[NodeId],
    config: &CascadeConfig,
    progress: &Progress,
) -> Result<Vec<BetaSweepRow>> {
    info!(steps = betas.len(), "running beta sweep");
    let done = AtomicUsize::new(0);
    betas
        .par_iter()
        .map(|&beta| {
            let capacity = base_load.capacity(beta);
            let outcome = simulate_cascade(net, &capacity, trigger, config)?;
            progress.report("beta_sweep", done.fetch_add(1, Ordering::Relaxed) + 1, betas.len());
            Ok(BetaSweepRow {
                beta,
                cascade_size: outcome.total_damage(),
            })
        })
        .collect()
}

/// Cascade size when the top `k` nodes of `ranked` fail together, for each `k`
pub fn k_attack(
    net: &Network,
    base_load: &LoadMap,
    beta: f64,
    ranked: &[NodeId],
    ks: &[usize],
    config: &CascadeConfig,
    progress: &Progress,
) -> Result<Vec<KAttackRow>> {
    info!(steps = ks.len(), beta, "running k-node attack");
    let capacity = base_load.capacity(beta);
    let done = AtomicUsize::new(0);
    ks.par_iter()
        .map(|&k| {
            let trigger = &ranked[..k.min(ranked.len())];
            let outcome = simulate_cascade(net, &capacity, trigger, config)?;
            progress.report("k_attack", done.fetch_add(1, Ordering::Relaxed) + 1, ks.len());
            Ok(KAttackRow {
                k,
                beta,
                cascade_size: outcome.total_damage(),
            })
        })
        .collect()
}

/// Damage caused by one node-load cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLoadOutcome {
    pub trigger: NodeId,
    pub alpha: f64,
    /// Stops failed by overload in the first wave
    pub first_wave_nodes: usize,
    /// Stops failed by overload over all waves, trigger excluded
    pub failed_nodes: usize,
    /// Waves that produced failures
    pub waves: usize,
    /// LCC loss after the trigger and the first wave
    pub first_wave_loss: f64,
    /// LCC loss once no stop is overloaded
    pub total_loss: f64,
}

/// Role of a node-load cascade trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeLoadTarget {
    /// Highest betweenness
    GlobalHub,
    /// Highest degree
    LocalCore,
    /// Median betweenness
    AverageNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLoadRecord {
    pub target: NodeLoadTarget,
    #[serde(flatten)]
    pub outcome: NodeLoadOutcome,
}

/// Sampled normalized betweenness used as stop load
fn node_load(net: &Network, config: &CascadeConfig) -> CentralityScores {
    let n = net.node_count();
    let k = ((config.node_sample_fraction * n as f64) as usize).max(1);
    centrality::betweenness_centrality(net, Some(k), config.seed, true)
}

/// Run one node-load cascade triggered by the failure of `trigger`.
///
/// Waves continue until no stop is overloaded or fewer than two stops
/// remain, and never exceed the node count of `net`.
pub fn simulate_node_load_cascade(
    net: &Network,
    trigger: &NodeId,
    config: &CascadeConfig,
) -> Result<NodeLoadOutcome> {
    let alpha = config.node_alpha;
    if !(alpha >= 0.0 && alpha.is_finite()) {
        return Err(ResilienceError::InvalidConfig(format!(
            "node capacity tolerance {} must be finite and >= 0",
            alpha
        )));
    }
    let start = net
        .index_of(trigger)
        .ok_or_else(|| ResilienceError::UnknownNode(trigger.clone()))?;

    let base = node_load(net, config);
    let mut work = net.clone();
    work.remove_index(start);

    let mut first_wave: Option<(usize, f64)> = None;
    let mut failed = 0;
    let mut waves = 0;

    for wave in 0..net.node_count() {
        if work.node_count() < 2 {
            break;
        }
        let load = node_load(&work, config);
        let newly: Vec<usize> = work
            .indices()
            .filter(|&idx| load.at(idx) > (1.0 + alpha) * base.at(idx))
            .collect();
        if newly.is_empty() {
            break;
        }

        for &idx in &newly {
            work.remove_index(idx);
        }
        failed += newly.len();
        waves += 1;

        debug!(wave, new_failures = newly.len(), total = failed, "node-load wave");

        if wave == 0 {
            first_wave = Some((newly.len(), lcc_loss(net, &work)));
        }
    }

    let total_loss = lcc_loss(net, &work);
    let (first_wave_nodes, first_wave_loss) = first_wave.unwrap_or((0, total_loss));

    Ok(NodeLoadOutcome {
        trigger: trigger.clone(),
        alpha,
        first_wave_nodes,
        failed_nodes: failed,
        waves,
        first_wave_loss,
        total_loss,
    })
}

/// First index holding the largest value
fn first_max(values: impl Iterator<Item = (usize, f64)>) -> Option<usize> {
    values
        .fold(None, |best: Option<(usize, f64)>, (idx, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
}

/// Highest-betweenness, highest-degree and median-betweenness stops
pub fn node_load_targets(net: &Network, config: &CascadeConfig) -> Vec<(NodeLoadTarget, NodeId)> {
    let load = node_load(net, config);
    let hub = first_max(net.indices().map(|idx| (idx, load.at(idx))));
    let core = first_max(net.indices().map(|idx| (idx, net.degree_at(idx) as f64)));

    let mut by_load: Vec<usize> = net.indices().collect();
    by_load.sort_by(|&a, &b| {
        load.at(a)
            .partial_cmp(&load.at(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let median = by_load.get(by_load.len() / 2).copied();

    [
        (NodeLoadTarget::GlobalHub, hub),
        (NodeLoadTarget::LocalCore, core),
        (NodeLoadTarget::AverageNode, median),
    ]
    .into_iter()
    .filter_map(|(target, idx)| Some((target, net.id_at(idx?)?.clone())))
    .collect()
}

/// Node-load cascades from the hub, core and median stops, run in parallel
pub fn node_load_cascades(
    net: &Network,
    config: &CascadeConfig,
    progress: &Progress,
) -> Result<Vec<NodeLoadRecord>> {
    let targets = node_load_targets(net, config);
    if targets.is_empty() {
        warn!("network has no stops, skipping node-load cascades");
        return Ok(Vec::new());
    }
    info!(alpha = config.node_alpha, targets = targets.len(), "running node-load cascades");
    let done = AtomicUsize::new(0);
    targets
        .par_iter()
        .map(|(target, node)| {
            let outcome = simulate_node_load_cascade(net, node, config)?;
            progress.report("node_load", done.fetch_add(1, Ordering::Relaxed) + 1, targets.len());
            Ok(NodeLoadRecord {
                target: *target,
                outcome,
            })
        })
        .collect()
}

/// Evenly spaced tolerance values from `start` to `end` inclusive
pub fn beta_range(start: f64, end: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..steps)
            .map(|i| start + (end - start) * i as f64 / (steps - 1) as f64)
            .collect(),
    }
}
