//! Incremental subsystem evolution
//!
//! Subsystems are layered onto the network one at a time in the given mode
//! order. Step `i` is the subgraph induced by the stops of the first `i + 1`
//! modes, evaluated twice: isolated (walking transfers dropped) and
//! interconnected (walking transfers kept).

use crate::attack::AttackStrategy;
use crate::benchmark::{self, BenchmarkStats};
use crate::config::ResilienceConfig;
use crate::error::{ResilienceError, Result};
use crate::network::{EdgeKind, Network, NodeId, TransitMode};
use crate::percolation;
use crate::progress::Progress;
use crate::relocation::{self, NetworkState};
use crate::report::StrategyCurve;
use crate::topology::NetworkSummary;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

/// Relocation rate for one distance budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelocationAt {
    pub d_max: f64,
    pub rate: f64,
}

/// Profile of one step in one network state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncrementalRow {
    /// 1-based step number
    pub step: usize,
    pub modes: Vec<TransitMode>,
    pub state: NetworkState,
    /// Walking transfer edges present in this state
    pub transfer_edges: usize,
    pub summary: NetworkSummary,
    pub benchmark: BenchmarkStats,
    pub efficiency_z: f64,
    pub geo_efficiency_z: f64,
    pub relocation: Vec<RelocationAt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub curves: Vec<StrategyCurve>,
}

/// Stops whose mode is one of `modes`, in insertion order
fn step_members(net: &Network, modes: &[TransitMode]) -> Vec<NodeId> {
    let wanted: HashSet<&TransitMode> = modes.iter().collect();
    net.nodes()
        .filter(|n| n.mode.as_ref().map(|m| wanted.contains(m)).unwrap_or(false))
        .map(|n| n.id.clone())
        .collect()
}

fn profile(
    graph: &Network,
    step: usize,
    modes: &[TransitMode],
    state: NetworkState,
    strategies: &[AttackStrategy],
    config: &ResilienceConfig,
    progress: &Progress,
) -> Result<IncrementalRow> {
    let summary = NetworkSummary::compute(graph, &config.centrality);
    let stats = benchmark::benchmark_stats(graph, &config.benchmark, progress);

    let everyone = graph.node_ids();
    let rates = relocation::relocation_rates(
        graph,
        &everyone,
        &config.relocation.d_max_list,
        &config.relocation,
        progress,
    );
    let relocation = config
        .relocation
        .d_max_list
        .iter()
        .zip(rates)
        .map(|(&d_max, rate)| RelocationAt { d_max, rate })
        .collect();

    let mut curves = Vec::with_capacity(strategies.len());
    if graph.node_count() >= 2 {
        for &strategy in strategies {
            match percolation::analyse_strategy(
                graph,
                strategy,
                &config.percolation,
                &config.centrality,
                progress,
            ) {
                Ok(table) => curves.push(StrategyCurve::new(strategy.to_string(), table)),
                Err(ResilienceError::NoData) => {
                    warn!(step, strategy = %strategy, "step produced no percolation signal")
                }
                Err(e) => return Err(e),
            }
        }
    }

    info!(
        step,
        state = ?state,
        nodes = summary.nodes,
        efficiency = summary.efficiency,
        "incremental step profiled"
    );

    Ok(IncrementalRow {
        step,
        modes: modes.to_vec(),
        state,
        transfer_edges: summary.walk_edges,
        efficiency_z: stats.efficiency_z(summary.efficiency),
        geo_efficiency_z: stats.geo_efficiency_z(summary.geo_efficiency),
        summary,
        benchmark: stats,
        relocation,
        curves,
    })
}

/// Isolated and interconnected profiles for every step of the layering.
///
/// Rows come in step order, the isolated state first. Steps whose modes
/// match no stop still produce rows over an empty network.
pub fn incremental(
    net: &Network,
    modes: &[TransitMode],
    strategies: &[AttackStrategy],
    config: &ResilienceConfig,
    progress: &Progress,
) -> Result<Vec<IncrementalRow>> {
    let mut rows = Vec::with_capacity(modes.len() * 2);
    for i in 0..modes.len() {
        let layered = &modes[..=i];
        let interconnected = net.subgraph(&step_members(net, layered));
        let isolated = interconnected.without_edge_kind(EdgeKind::Walk);

        info!(
            step = i + 1,
            mode = %modes[i],
            nodes = interconnected.node_count(),
            "layering subsystem"
        );

        let states = [
            (NetworkState::Isolated, &isolated),
            (NetworkState::Interconnected, &interconnected),
        ];
        for (state, graph) in states {
            rows.push(profile(graph, i + 1, layered, state, strategies, config, progress)?);
        }
    }
    Ok(rows)
}
