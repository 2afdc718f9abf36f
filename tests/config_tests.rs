//! File-based loading of engine configuration, network documents and
//! result reports

use mptn_resilience::config::ResilienceConfig;
use mptn_resilience::network::NetworkDocument;
use mptn_resilience::report::ResilienceReport;
use mptn_resilience::{EdgeKind, Network, NodeId, ResilienceError, TransitMode};
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

const WUHAN_FRAGMENT: &str = r#"{
    "directed": false,
    "nodes": [
        {"id": "m1", "mode": "metro", "name": "Jianghan Road", "lon": 114.2870, "lat": 30.5830},
        {"id": "m2", "mode": "metro", "lon": 114.2950, "lat": 30.5900},
        {"id": "b1", "mode": "bus", "lon": 114.2875, "lat": 30.5835},
        {"id": "f1", "mode": "ferry"}
    ],
    "edges": [
        {"source": "m1", "target": "m2"},
        {"source": "m1", "target": "b1", "kind": "walk"},
        {"source": "b1", "target": "f1", "length": 850.0}
    ]
}"#;

#[test]
fn test_config_file_with_partial_sections() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "config.json",
        r#"{"percolation": {"removal_steps": 20, "random_trials": 5}, "benchmark": {"replicates": 3}}"#,
    );
    let config = ResilienceConfig::from_json_file(&path).unwrap();
    assert_eq!(config.percolation.removal_steps, 20);
    assert_eq!(config.percolation.random_trials, 5);
    assert_eq!(config.benchmark.replicates, 3);
    assert_eq!(config.cascade, ResilienceConfig::default().cascade);
}

#[test]
fn test_config_file_is_validated() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "bad.json", r#"{"cascade": {"flow_samples": 0}}"#);
    let err = ResilienceConfig::from_json_file(&path).unwrap_err();
    assert!(matches!(err, ResilienceError::InvalidConfig(_)));

    let path = write(&dir, "garbled.json", "{ not json");
    assert!(matches!(
        ResilienceConfig::from_json_file(&path),
        Err(ResilienceError::Json(_))
    ));

    let missing = dir.path().join("missing.json");
    assert!(matches!(
        ResilienceConfig::from_json_file(&missing),
        Err(ResilienceError::Io(_))
    ));
}

#[test]
fn test_network_document_loading() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "network.json", WUHAN_FRAGMENT);
    let net = Network::from_json_file(&path).unwrap();

    assert!(!net.is_directed());
    assert_eq!(net.node_count(), 4);
    assert_eq!(net.edge_count(), 3);
    assert_eq!(net.edge_count_of_kind(EdgeKind::Walk), 1);
    assert_eq!(net.nodes_with_mode(&TransitMode::new("metro")).len(), 2);

    let m1 = net.node(&NodeId::new("m1")).unwrap();
    assert_eq!(m1.name.as_deref(), Some("Jianghan Road"));
    assert!(net.node(&NodeId::new("f1")).unwrap().position.is_none());

    // Missing lengths come from the haversine distance of the endpoints
    let (m1i, m2i) = (
        net.index_of(&NodeId::new("m1")).unwrap(),
        net.index_of(&NodeId::new("m2")).unwrap(),
    );
    let length = net.edge_at(m1i, m2i).unwrap().length;
    assert!(length > 1000.0 && length < 1200.0, "length {}", length);

    let (b1i, f1i) = (
        net.index_of(&NodeId::new("b1")).unwrap(),
        net.index_of(&NodeId::new("f1")).unwrap(),
    );
    assert_eq!(net.edge_at(b1i, f1i).unwrap().length, 850.0);
}

#[test]
fn test_network_document_rejects_bad_input() {
    let dir = TempDir::new().unwrap();

    let dup = write(
        &dir,
        "dup.json",
        r#"{"nodes": [{"id": "a"}, {"id": "a"}], "edges": []}"#,
    );
    assert!(matches!(
        Network::from_json_file(&dup),
        Err(ResilienceError::InvalidConfig(_))
    ));

    let dangling = write(
        &dir,
        "dangling.json",
        r#"{"nodes": [{"id": "a"}], "edges": [{"source": "a", "target": "z"}]}"#,
    );
    assert!(matches!(
        Network::from_json_file(&dangling),
        Err(ResilienceError::UnknownNode(id)) if id == NodeId::new("z")
    ));

    let coords = write(
        &dir,
        "coords.json",
        r#"{"nodes": [{"id": "a", "lon": 200.0, "lat": 0.0}], "edges": []}"#,
    );
    assert!(Network::from_json_file(&coords).is_err());
}

#[test]
fn test_document_round_trip_through_json() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "network.json", WUHAN_FRAGMENT);
    let net = Network::from_json_file(&path).unwrap();

    let doc = NetworkDocument::from(net.clone());
    let out = write(&dir, "copy.json", &serde_json::to_string(&doc).unwrap());
    let back = Network::from_json_file(&out).unwrap();
    assert_eq!(back.node_ids(), net.node_ids());
    assert_eq!(back.edges(), net.edges());
}

#[test]
fn test_report_lands_in_nested_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("results").join("run").join("report.json");
    let report = ResilienceReport::new(ResilienceConfig::default());
    report.write_json(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("generated_at"));
    // Empty sections are omitted
    assert!(!text.contains("\"cascades\""));
    let back = ResilienceReport::from_json_file(&path).unwrap();
    assert_eq!(back.config, report.config);
}

#[test]
fn test_node_load_records_survive_the_report() {
    use mptn_resilience::cascade;

    let dir = TempDir::new().unwrap();
    let path = write(&dir, "network.json", WUHAN_FRAGMENT);
    let net = Network::from_json_file(&path).unwrap();

    let mut report = ResilienceReport::new(ResilienceConfig::default());
    report.node_load = cascade::node_load_cascades(
        &net,
        &report.config.cascade,
        &mptn_resilience::progress::Progress::Silent,
    )
    .unwrap();
    assert_eq!(report.node_load.len(), 3);

    let out = dir.path().join("report.json");
    report.write_json(&out).unwrap();
    let text = fs::read_to_string(&out).unwrap();
    assert!(text.contains("\"GlobalHub\""));
    assert!(text.contains("\"first_wave_loss\""));
    let back = ResilienceReport::from_json_file(&out).unwrap();
    for (a, b) in back.node_load.iter().zip(&report.node_load) {
        assert_eq!(a.target, b.target);
        assert_eq!(a.outcome.trigger, b.outcome.trigger);
        assert_eq!(a.outcome.waves, b.outcome.waves);
        assert!((a.outcome.total_loss - b.outcome.total_loss).abs() < 1e-12);
    }
}
