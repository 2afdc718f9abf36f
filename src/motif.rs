//! Feed-forward-loop motif participation
//!
//! A feed-forward loop is a triad a→b, b→c, a→c over three distinct nodes.
//! Every arc of every loop gains one unit of weight; a node's score is the
//! weight of all arcs incident to it. Undirected networks are read as their
//! directed expansion, so each undirected edge contributes two arcs.

use crate::network::{Network, NodeId};
use std::collections::BTreeMap;

/// Arc-level feed-forward-loop counts
#[derive(Debug, Clone, Default)]
pub struct MotifWeights {
    arcs: BTreeMap<(usize, usize), u64>,
}

impl MotifWeights {
    /// Count feed-forward loops over every arc of `net`
    pub fn compute(net: &Network) -> Self {
        let mut arcs: BTreeMap<(usize, usize), u64> = BTreeMap::new();

        for a in net.indices() {
            let out: Vec<usize> = net.successors(a).map(|(w, _)| w).collect();
            for &c in &out {
                for &b in &out {
                    if b == c || net.edge_at(b, c).is_none() {
                        continue;
                    }
                    *arcs.entry((a, b)).or_insert(0) += 1;
                    *arcs.entry((b, c)).or_insert(0) += 1;
                    *arcs.entry((a, c)).or_insert(0) += 1;
                }
            }
        }

        Self { arcs }
    }

    pub fn weight_at(&self, u: usize, v: usize) -> u64 {
        self.arcs.get(&(u, v)).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.arcs.values().sum()
    }

    /// Heaviest arcs, ties broken by slot order
    pub fn strongest_links(&self, net: &Network, k: usize) -> Vec<(NodeId, NodeId, u64)> {
        let mut ranked: Vec<(&(usize, usize), &u64)> = self.arcs.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1));
        ranked
            .into_iter()
            .take(k)
            .filter_map(|(&(u, v), &w)| Some((net.id_at(u)?.clone(), net.id_at(v)?.clone(), w)))
            .collect()
    }

    /// Fold arc weights onto both endpoints in a single ordered pass
    pub fn node_scores(&self, net: &Network) -> MotifScores {
        let mut values = vec![0u64; net.slot_bound()];
        for (&(u, v), &w) in &self.arcs {
            values[u] += w;
            values[v] += w;
        }
        MotifScores { values }
    }
}

/// Node-level motif scores addressed by slot index
#[derive(Debug, Clone)]
pub struct MotifScores {
    values: Vec<u64>,
}

impl MotifScores {
    pub fn compute(net: &Network) -> Self {
        MotifWeights::compute(net).node_scores(net)
    }

    pub fn at(&self, idx: usize) -> u64 {
        self.values.get(idx).copied().unwrap_or(0)
    }

    pub fn get(&self, net: &Network, id: &NodeId) -> u64 {
        net.index_of(id).map(|idx| self.at(idx)).unwrap_or(0)
    }

    /// All node ids by descending score; ties and zero scores keep insertion order
    pub fn ranking(&self, net: &Network) -> Vec<NodeId> {
        let mut order: Vec<usize> = net.indices().collect();
        order.sort_by(|&a, &b| self.at(b).cmp(&self.at(a)));
        order
            .into_iter()
            .filter_map(|idx| net.id_at(idx).cloned())
            .collect()
    }
}
