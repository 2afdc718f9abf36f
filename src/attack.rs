//! Attack-order generation
//!
//! An attack order is a permutation of the network's node ids; the first
//! element is removed first.

use crate::centrality;
use crate::config::CentralityConfig;
use crate::error::{ResilienceError, Result};
use crate::motif::MotifScores;
use crate::network::{Network, NodeId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Node ranking strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "strategy")]
pub enum AttackStrategy {
    /// Uniform shuffle. Ensembles use `seed + trial` for each trial.
    Random { seed: u64 },
    /// Total degree, highest first
    Degree,
    /// Betweenness centrality, highest first (sampled on large networks)
    Betweenness,
    /// Feed-forward-loop participation, highest first
    Motif,
}

impl AttackStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            AttackStrategy::Random { .. } => "random",
            AttackStrategy::Degree => "degree",
            AttackStrategy::Betweenness => "betweenness",
            AttackStrategy::Motif => "motif",
        }
    }

    /// Whether the strategy needs an ensemble of independent orders
    pub fn is_stochastic(&self) -> bool {
        matches!(self, AttackStrategy::Random { .. })
    }
}

impl fmt::Display for AttackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackStrategy::Random { seed } => write!(f, "random:{}", seed),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl FromStr for AttackStrategy {
    type Err = ResilienceError;

    /// Accepts `random`, `random:<seed>`, `degree`, `betweenness` and `motif`
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "random" => Ok(AttackStrategy::Random { seed: 42 }),
            "degree" => Ok(AttackStrategy::Degree),
            "betweenness" => Ok(AttackStrategy::Betweenness),
            "motif" => Ok(AttackStrategy::Motif),
            other => match other.strip_prefix("random:").map(str::parse::<u64>) {
                Some(Ok(seed)) => Ok(AttackStrategy::Random { seed }),
                _ => Err(ResilienceError::UnknownStrategy(s.to_string())),
            },
        }
    }
}

/// Removal order for a single strategy
pub fn removal_order(
    net: &Network,
    strategy: AttackStrategy,
    centrality_config: &CentralityConfig,
) -> Vec<NodeId> {
    debug!(strategy = %strategy, nodes = net.node_count(), "ranking nodes");

    match strategy {
        AttackStrategy::Random { seed } => shuffled(net, seed),
        AttackStrategy::Degree => degree_order(net),
        AttackStrategy::Betweenness => {
            centrality::betweenness(net, centrality_config).ranking(net)
        }
        AttackStrategy::Motif => MotifScores::compute(net).ranking(net),
    }
}

/// Parse `name` and produce its removal order
pub fn removal_order_by_name(
    net: &Network,
    name: &str,
    centrality_config: &CentralityConfig,
) -> Result<Vec<NodeId>> {
    let strategy: AttackStrategy = name.parse()?;
    Ok(removal_order(net, strategy, centrality_config))
}

/// Independent shuffles for an ensemble; trial `i` uses `base_seed + i`
pub fn random_orders(net: &Network, trials: usize, base_seed: u64) -> Vec<Vec<NodeId>> {
    (0..trials as u64)
        .map(|i| shuffled(net, base_seed.wrapping_add(i)))
        .collect()
}

fn shuffled(net: &Network, seed: u64) -> Vec<NodeId> {
    let mut nodes = net.node_ids();
    let mut rng = StdRng::seed_from_u64(seed);
    nodes.shuffle(&mut rng);
    nodes
}

fn degree_order(net: &Network) -> Vec<NodeId> {
    let mut order: Vec<usize> = net.indices().collect();
    // sort_by_key is stable: equal degrees keep insertion order
    order.sort_by_key(|&idx| std::cmp::Reverse(net.degree_at(idx)));
    order
        .into_iter()
        .filter_map(|idx| net.id_at(idx).cloned())
        .collect()
}
