//! Asymmetric relocation rate
//!
//! When stop `v` fails, a passenger can still reach a destination `n` by
//! walking from `v` to one of its surviving out-neighbours `u` (a hub) that
//! reaches `n`. The walk is weighted by a modal transfer penalty that
//! depends on the direction of the transfer (metro to bus differs from bus
//! to metro). Within a distance budget `d_max` each recovered destination
//! scores `1 - d / d_max`.
//!
//! A hub recovers only what it still reaches once `v` is gone, not itself,
//! so an end stop whose only neighbour is a dead end recovers nothing.
//! Hubs without coordinates, and failing stops without coordinates, recover
//! nothing either.

use crate::config::RelocationConfig;
use crate::network::{Network, NodeId, TransitMode};
use crate::progress::Progress;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Which network a subsystem's rate was evaluated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkState {
    /// The subsystem's induced subgraph
    Isolated,
    /// The whole multi-modal network
    Interconnected,
}

/// One row of the relocation-rate table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelocationRow {
    pub subsystem: TransitMode,
    pub d_max: f64,
    pub state: NetworkState,
    pub rate: f64,
}

/// Weighted relocation distance to every destination reachable from `v`.
/// `None` marks destinations no hub recovers.
fn relocation_distances(net: &Network, v: usize, config: &RelocationConfig) -> Vec<Option<f64>> {
    let reach = net.descendant_indices(v);
    if reach.is_empty() {
        return Vec::new();
    }

    let origin = net.data_at(v);
    let origin_pos = origin.and_then(|d| d.position);
    let origin_mode = origin.and_then(|d| d.mode.as_ref());

    let mut disrupted = net.clone();
    disrupted.remove_index(v);

    // Hubs ordered by weighted distance so the first hub reaching a
    // destination gives its minimum
    let mut hubs: Vec<(f64, Vec<bool>)> = net
        .successors(v)
        .filter_map(|(u, _)| {
            let data = net.data_at(u)?;
            let distance = origin_pos?.haversine_m(&data.position?);
            let weighted = distance * config.factor(origin_mode, data.mode.as_ref());
            let mut reached = vec![false; net.slot_bound()];
            for w in disrupted.descendant_indices(u) {
                reached[w] = true;
            }
            Some((weighted, reached))
        })
        .collect();
    hubs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    reach
        .into_iter()
        .map(|n| hubs.iter().find(|(_, reached)| reached[n]).map(|(d, _)| *d))
        .collect()
}

fn decay_score(distances: &[Option<f64>], d_max: f64) -> f64 {
    if distances.is_empty() {
        return 0.0;
    }
    let decay: f64 = distances
        .iter()
        .flatten()
        .filter(|&&d| d <= d_max)
        .map(|d| 1.0 - d / d_max)
        .sum();
    decay / distances.len() as f64
}

/// Relocation rate of `nodes` on `net` for every budget in `d_max_list`.
///
/// Nodes absent from `net` are ignored; a present node with no reachable
/// destination contributes 0 to the average. Networks with fewer than two
/// nodes, or no evaluable nodes, rate 0.
pub fn relocation_rates(
    net: &Network,
    nodes: &[NodeId],
    d_max_list: &[f64],
    config: &RelocationConfig,
    progress: &Progress,
) -> Vec<f64> {
    let present: Vec<usize> = nodes.iter().filter_map(|id| net.index_of(id)).collect();
    if net.node_count() < 2 || present.is_empty() {
        return vec![0.0; d_max_list.len()];
    }

    let done = AtomicUsize::new(0);
    let per_node: Vec<Vec<f64>> = present
        .par_iter()
        .map(|&v| {
            let distances = relocation_distances(net, v, config);
            progress.report("relocation", done.fetch_add(1, Ordering::Relaxed) + 1, present.len());
            d_max_list.iter().map(|&d| decay_score(&distances, d)).collect()
        })
        .collect();

    let count = present.len() as f64;
    (0..d_max_list.len())
        .map(|i| per_node.iter().map(|scores| scores[i]).sum::<f64>() / count)
        .collect()
}

/// Relocation rate of `nodes` for a single budget
pub fn relocation_rate(net: &Network, nodes: &[NodeId], d_max: f64, config: &RelocationConfig) -> f64 {
    relocation_rates(net, nodes, &[d_max], config, &Progress::Silent)
        .first()
        .copied()
        .unwrap_or(0.0)
}

/// Isolated and interconnected rates for every subsystem and budget
pub fn relocation_table(
    net: &Network,
    modes: &[TransitMode],
    config: &RelocationConfig,
    progress: &Progress,
) -> Vec<RelocationRow> {
    let mut rows = Vec::new();
    for mode in modes {
        let members = net.nodes_with_mode(mode);
        if members.is_empty() {
            debug!(mode = %mode, "subsystem has no nodes, skipping");
            continue;
        }

        let isolated = net.subgraph(&members);
        let states = [
            (NetworkState::Isolated, &isolated),
            (NetworkState::Interconnected, net),
        ];
        for (state, graph) in states {
            let rates = relocation_rates(graph, &members, &config.d_max_list, config, progress);
            for (&d_max, rate) in config.d_max_list.iter().zip(rates) {
                rows.push(RelocationRow {
                    subsystem: mode.clone(),
                    d_max,
                    state,
                    rate,
                });
            }
        }
    }
    rows
}

/// Distinct modes in order of first appearance
pub fn modes_of(net: &Network) -> Vec<TransitMode> {
    let mut seen = HashSet::new();
    net.nodes()
        .filter_map(|n| n.mode.clone())
        .filter(|m| seen.insert(m.clone()))
        .collect()
}
