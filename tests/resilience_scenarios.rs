//! End-to-end resilience scenarios
//!
//! Small hand-built networks with known answers, exercised through the
//! public API the sweep drivers use.

use mptn_resilience::aggregate;
use mptn_resilience::attack::{self, AttackStrategy};
use mptn_resilience::benchmark;
use mptn_resilience::cascade;
use mptn_resilience::config::{CascadeConfig, CentralityConfig, PercolationConfig};
use mptn_resilience::flow;
use mptn_resilience::network::{EdgeData, NodeData};
use mptn_resilience::percolation;
use mptn_resilience::progress::Progress;
use mptn_resilience::recovery;
use mptn_resilience::{EdgeKind, GeoPoint, Network, NodeId};

fn id(s: &str) -> NodeId {
    NodeId::new(s)
}

fn line(net: &mut Network, u: &str, v: &str) {
    net.add_edge(&id(u), &id(v), EdgeData::new(EdgeKind::Line, 1.0))
        .expect("endpoints exist");
}

/// Hub `h` with `leaves` spokes
fn star(leaves: usize) -> Network {
    let mut net = Network::undirected();
    net.add_node(NodeData::new("h"));
    for i in 0..leaves {
        let leaf = format!("l{}", i);
        net.add_node(NodeData::new(leaf.clone()));
        line(&mut net, "h", &leaf);
    }
    net
}

fn path(n: usize) -> Network {
    let mut net = Network::undirected();
    for i in 0..n {
        net.add_node(NodeData::new(format!("p{}", i)));
    }
    for i in 1..n {
        line(&mut net, &format!("p{}", i - 1), &format!("p{}", i));
    }
    net
}

fn ring(n: usize) -> Network {
    let mut net = path(n);
    line(&mut net, &format!("p{}", n - 1), "p0");
    net
}

fn directed_mesh(n: usize, m: usize) -> Network {
    let mut net = Network::directed();
    for i in 0..n {
        let pos = GeoPoint::new(114.2 + 0.005 * i as f64, 30.55).unwrap();
        net.add_node(NodeData::new(format!("s{}", i)).with_mode("metro").with_position(pos));
    }
    let mut added = 0;
    'outer: for step in 1..n {
        for u in 0..n {
            if added == m {
                break 'outer;
            }
            let (a, b) = (format!("s{}", u), format!("s{}", (u + step) % n));
            if net.connect(&id(&a), &id(&b), EdgeKind::Line).unwrap() {
                added += 1;
            }
        }
    }
    net
}

#[test]
fn test_degree_attack_on_star_collapses_immediately() {
    let net = star(9);
    let order = attack::removal_order(&net, AttackStrategy::Degree, &CentralityConfig::default());
    assert_eq!(order[0], id("h"));

    // 10 nodes, R = 5: two removals per step
    let curve = percolation::simulate_attack(&net, &order, 5);
    assert_eq!((curve[0].q, curve[0].s), (0.0, 1.0));
    assert!((curve[1].q - 0.2).abs() < 1e-12);
    assert!((curve[1].s - 0.1).abs() < 1e-12);

    let table = aggregate::aggregate(&[curve], 5).unwrap();
    assert!(table.robustness() < 0.25);
}

#[test]
fn test_ring_collapse_depends_on_where_cuts_land() {
    let net = ring(10);
    let centrality = CentralityConfig::default();

    // Equal degrees: the degree attack walks the ring in insertion order and
    // only ever shortens one path
    let order = attack::removal_order(&net, AttackStrategy::Degree, &centrality);
    assert_eq!(order, net.node_ids());
    let curve = percolation::simulate_attack(&net, &order, 5);
    assert_eq!(curve.len(), 6);
    assert!((curve[1].s - 0.8).abs() < 1e-12);

    // Opposite cuts split the ring into two halves at once
    let spread: Vec<NodeId> = [0, 5, 2, 7, 1, 6, 3, 8, 4, 9]
        .iter()
        .map(|i| id(&format!("p{}", i)))
        .collect();
    let curve = percolation::simulate_attack(&net, &spread, 5);
    assert!((curve[1].q - 0.2).abs() < 1e-12);
    assert!((curve[1].s - 0.4).abs() < 1e-12);
    assert!((curve[2].s - 0.2).abs() < 1e-12);
}

#[test]
fn test_random_ensemble_table_shape() {
    let net = ring(12);
    let config = PercolationConfig {
        removal_steps: 6,
        random_trials: 8,
        max_workers: Some(2),
    };
    let table = percolation::analyse_strategy(
        &net,
        AttackStrategy::Random { seed: 7 },
        &config,
        &CentralityConfig::default(),
        &Progress::Silent,
    )
    .unwrap();

    assert_eq!(table.len(), 8);
    assert_eq!(table.trials, 8);
    assert_eq!(table.rows[0].mean, 1.0);
    assert_eq!(table.rows[0].std, 0.0);
    let r = table.robustness();
    assert!((0.0..=1.0).contains(&r));
    for pair in table.rows.windows(2) {
        assert!(pair[1].removed_fraction > pair[0].removed_fraction);
    }
}

#[test]
fn test_targeted_attacks_beat_random_on_star() {
    let net = star(19);
    let config = PercolationConfig {
        removal_steps: 10,
        random_trials: 10,
        max_workers: None,
    };
    let centrality = CentralityConfig::default();
    let random = percolation::analyse_strategy(
        &net,
        AttackStrategy::Random { seed: 1 },
        &config,
        &centrality,
        &Progress::Silent,
    )
    .unwrap();
    let targeted = percolation::analyse_strategy(
        &net,
        AttackStrategy::Betweenness,
        &config,
        &centrality,
        &Progress::Silent,
    )
    .unwrap();
    assert!(targeted.robustness() < random.robustness());
    assert_eq!(targeted.trials, 1);
}

#[test]
fn test_benchmark_matches_size_and_direction() {
    let real = directed_mesh(50, 120);
    assert_eq!(real.edge_count(), 120);
    let bench = benchmark::generate_benchmark_graph(&real, 11);
    assert!(bench.is_directed());
    assert_eq!(bench.node_count(), 50);
    assert_eq!(bench.edge_count(), 120);
}

#[test]
fn test_cascade_is_repeatable_and_leaves_input_untouched() {
    let net = ring(8);
    let config = CascadeConfig {
        flow_samples: 300,
        ..CascadeConfig::default()
    };
    let load = flow::estimate_load(&net, config.flow_samples, config.seed, &Progress::Silent);
    let capacity = load.capacity(0.0);

    let first = cascade::simulate_cascade(&net, &capacity, &[id("p0")], &config).unwrap();
    let second = cascade::simulate_cascade(&net, &capacity, &[id("p0")], &config).unwrap();
    assert_eq!(first, second);
    assert_eq!(net.node_count(), 8);
    assert_eq!(net.edge_count(), 8);
    assert!(first.total_damage() >= 1);
}

#[test]
fn test_recoverability_grows_with_tolerance() {
    let net = path(5);
    let config = CascadeConfig {
        flow_samples: 1500,
        iteration_flow_divisor: 1,
        ..CascadeConfig::default()
    };
    let load = flow::estimate_load(&net, config.flow_samples, config.seed, &Progress::Silent);

    let values: Vec<f64> = [0.0, 0.5, 10.0]
        .iter()
        .map(|&beta| {
            let capacity = load.capacity(beta);
            recovery::recoverability(&net, &capacity, &id("p0"), &config).unwrap()
        })
        .collect();

    // Losing an end stop shifts more traffic onto the far edges than a
    // zero-tolerance capacity allows
    assert!(values[0] < 1.0);
    assert!(values.windows(2).all(|w| w[0] <= w[1]), "{:?}", values);
    assert_eq!(values[2], 1.0);
}

#[test]
fn test_beta_sweep_and_k_attack_rows() {
    let net = ring(10);
    let config = CascadeConfig {
        flow_samples: 200,
        ..CascadeConfig::default()
    };
    let load = flow::estimate_load(&net, config.flow_samples, config.seed, &Progress::Silent);
    let betas = cascade::beta_range(0.0, 1.0, 5);
    let sweep =
        cascade::beta_sweep(&net, &load, &betas, &[id("p0")], &config, &Progress::Silent).unwrap();
    assert_eq!(sweep.len(), 5);
    assert_eq!(sweep[0].beta, 0.0);
    assert!(sweep.iter().all(|row| row.cascade_size >= 1));

    let ranked = net.node_ids();
    let rows =
        cascade::k_attack(&net, &load, 0.15, &ranked, &[1, 3, 20], &config, &Progress::Silent)
            .unwrap();
    assert_eq!(rows.iter().map(|r| r.k).collect::<Vec<_>>(), vec![1, 3, 20]);
    // k beyond the ranking removes every node
    assert_eq!(rows[2].cascade_size, 10);
}

#[test]
fn test_unknown_trigger_is_rejected() {
    let net = path(3);
    let config = CascadeConfig::default();
    let capacity = flow::LoadMap::default().capacity(0.1);
    let err = cascade::simulate_cascade(&net, &capacity, &[id("nope")], &config).unwrap_err();
    assert!(err.to_string().contains("nope"));
}
