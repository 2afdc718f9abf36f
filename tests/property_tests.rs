//! Property-based tests for the attack and percolation engines
//!
//! Random graphs are generated from an edge list over a fixed node set so
//! the strategies stay small enough for many cases per property.

use mptn_resilience::aggregate;
use mptn_resilience::attack::{self, AttackStrategy};
use mptn_resilience::config::CentralityConfig;
use mptn_resilience::network::{EdgeData, NodeData};
use mptn_resilience::percolation;
use mptn_resilience::{EdgeKind, Network, NodeId};
use proptest::prelude::*;
use std::collections::HashSet;

// ============================================================================
// Strategies
// ============================================================================

/// Undirected network with 2..30 nodes and a random edge list
fn network_strategy() -> impl Strategy<Value = Network> {
    (2usize..30)
        .prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 1..80)))
        .prop_map(|(n, pairs)| {
            let mut net = Network::undirected();
            for i in 0..n {
                net.add_node(NodeData::new(format!("v{}", i)));
            }
            for (u, v) in pairs {
                if u != v {
                    net.add_edge(
                        &NodeId::new(format!("v{}", u)),
                        &NodeId::new(format!("v{}", v)),
                        EdgeData::new(EdgeKind::Line, 1.0),
                    )
                    .expect("endpoints exist");
                }
            }
            net
        })
}

fn is_permutation(net: &Network, order: &[NodeId]) -> bool {
    let unique: HashSet<&NodeId> = order.iter().collect();
    order.len() == net.node_count()
        && unique.len() == order.len()
        && order.iter().all(|id| net.contains(id))
}

// ============================================================================
// Attack orders
// ============================================================================

proptest! {
    #[test]
    fn prop_random_order_is_reproducible_permutation(net in network_strategy(), seed in any::<u64>()) {
        let strategy = AttackStrategy::Random { seed };
        let cfg = CentralityConfig::default();
        let a = attack::removal_order(&net, strategy, &cfg);
        let b = attack::removal_order(&net, strategy, &cfg);
        prop_assert!(is_permutation(&net, &a));
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_degree_order_is_non_increasing(net in network_strategy()) {
        let order = attack::removal_order(&net, AttackStrategy::Degree, &CentralityConfig::default());
        prop_assert!(is_permutation(&net, &order));
        let degrees: Vec<usize> = order.iter().map(|id| net.degree(id)).collect();
        prop_assert!(degrees.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn prop_targeted_orders_cover_every_node(net in network_strategy()) {
        let cfg = CentralityConfig::default();
        for strategy in [AttackStrategy::Betweenness, AttackStrategy::Motif] {
            let order = attack::removal_order(&net, strategy, &cfg);
            prop_assert!(is_permutation(&net, &order));
        }
    }
}

// ============================================================================
// Percolation trajectories
// ============================================================================

proptest! {
    #[test]
    fn prop_trajectory_starts_at_origin(net in network_strategy(), steps in 1usize..20, seed in 0u64..1000) {
        prop_assume!(net.edge_count() > 0);
        let order = attack::removal_order(&net, AttackStrategy::Random { seed }, &CentralityConfig::default());
        let curve = percolation::simulate_attack(&net, &order, steps);
        prop_assert_eq!((curve[0].q, curve[0].s), (0.0, 1.0));
        prop_assert!(curve.windows(2).all(|w| w[1].q > w[0].q));
        prop_assert!(curve.iter().all(|p| (0.0..=1.0).contains(&p.q) && (0.0..=1.0).contains(&p.s)));
        let last = curve[curve.len() - 1];
        prop_assert_eq!((last.q, last.s), (1.0, 0.0));
    }

    #[test]
    fn prop_robustness_is_bounded(net in network_strategy(), steps in 1usize..20, seed in 0u64..1000) {
        prop_assume!(net.edge_count() > 0);
        let orders = attack::random_orders(&net, 3, seed);
        let trajectories: Vec<_> = orders
            .iter()
            .map(|order| percolation::simulate_attack(&net, order, steps))
            .collect();
        let table = aggregate::aggregate(&trajectories, steps).expect("non-empty trajectories");
        prop_assert_eq!(table.len(), steps + 2);
        let r = table.robustness();
        prop_assert!((0.0..=1.0).contains(&r), "R_b = {}", r);
    }
}
