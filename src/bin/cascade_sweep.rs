//! Cascade Sweep
//!
//! Load-driven cascading failure experiments on a network document:
//! single-node cascades on the most central stops (first wave vs. full
//! cascade), a tolerance sweep, a top-k attack, and optionally the node
//! metrics table with recoverability and the betweenness-load cascade.

use mptn_resilience::cascade;
use mptn_resilience::centrality;
use mptn_resilience::config::ResilienceConfig;
use mptn_resilience::flow;
use mptn_resilience::progress::Progress;
use mptn_resilience::recovery;
use mptn_resilience::report::ResilienceReport;
use mptn_resilience::telemetry::{self, LogConfig};
use mptn_resilience::{Network, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

struct Options {
    network: Option<PathBuf>,
    config: Option<PathBuf>,
    top: usize,
    beta: Option<f64>,
    beta_range: (f64, f64, usize),
    ks: Vec<usize>,
    k_beta: f64,
    metrics_sample: Option<usize>,
    node_load: bool,
    alpha: Option<f64>,
    output: String,
    log_dir: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        let mut ks: Vec<usize> = (1..=10).collect();
        ks.extend((12..=20).step_by(2));
        Self {
            network: None,
            config: None,
            top: 20,
            beta: None,
            beta_range: (0.05, 0.5, 30),
            ks,
            k_beta: 0.15,
            metrics_sample: None,
            node_load: false,
            alpha: None,
            output: "results/cascade_sweep.json".to_string(),
            log_dir: None,
        }
    }
}

fn parse_usize_list(input: &str) -> Vec<usize> {
    input
        .split(',')
        .filter_map(|s| s.trim().parse::<usize>().ok())
        .collect()
}

fn parse_range(input: &str) -> Option<(f64, f64, usize)> {
    let parts: Vec<&str> = input.split(',').map(|s| s.trim()).collect();
    match parts.as_slice() {
        [start, end, steps] => Some((start.parse().ok()?, end.parse().ok()?, steps.parse().ok()?)),
        _ => None,
    }
}

fn print_help() {
    println!("Usage: cascade_sweep --network FILE [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -i, --network FILE      Network document (JSON edge list)");
    println!("  -c, --config FILE       Engine configuration (JSON)");
    println!("  -n, --top NUM           Single-node cascades on the top NUM stops (default: 20)");
    println!("  --beta NUM              Capacity tolerance (default: from config)");
    println!("  --betas START,END,N     Tolerance sweep (default: 0.05,0.5,30)");
    println!("  --ks LIST               Top-k attack sizes (default: 1..10,12..20 step 2)");
    println!("  --k-beta NUM            Tolerance used by the top-k attack (default: 0.15)");
    println!("  --metrics NUM           Node metrics for NUM sampled stops (0 = all)");
    println!("  --node-load             Betweenness-load cascades from hub, core and median stops");
    println!("  --alpha NUM             Node capacity tolerance (default: from config)");
    println!("  -o, --output FILE       Output JSON file");
    println!("  --log-dir DIR           Also write JSON logs to DIR");
    println!("  -h, --help              Show this help");
}

/// None when help was requested
fn parse_args() -> Option<Options> {
    let args: Vec<String> = std::env::args().collect();
    let mut opts = Options::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--network" | "-i" => {
                if i + 1 < args.len() {
                    opts.network = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    opts.config = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--top" | "-n" => {
                if i + 1 < args.len() {
                    opts.top = args[i + 1].parse().unwrap_or(opts.top);
                    i += 1;
                }
            }
            "--beta" => {
                if i + 1 < args.len() {
                    opts.beta = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--betas" => {
                if i + 1 < args.len() {
                    if let Some(range) = parse_range(&args[i + 1]) {
                        opts.beta_range = range;
                    }
                    i += 1;
                }
            }
            "--ks" => {
                if i + 1 < args.len() {
                    let parsed = parse_usize_list(&args[i + 1]);
                    if !parsed.is_empty() {
                        opts.ks = parsed;
                    }
                    i += 1;
                }
            }
            "--k-beta" => {
                if i + 1 < args.len() {
                    opts.k_beta = args[i + 1].parse().unwrap_or(opts.k_beta);
                    i += 1;
                }
            }
            "--metrics" => {
                if i + 1 < args.len() {
                    opts.metrics_sample = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--node-load" => opts.node_load = true,
            "--alpha" => {
                if i + 1 < args.len() {
                    opts.alpha = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--output" | "-o" => {
                if i + 1 < args.len() {
                    opts.output = args[i + 1].clone();
                    i += 1;
                }
            }
            "--log-dir" => {
                if i + 1 < args.len() {
                    opts.log_dir = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return None;
            }
            _ => {}
        }
        i += 1;
    }
    Some(opts)
}

fn console_progress() -> Progress {
    Progress::callback(|event| {
        print!("\r  - {} {}/{}", event.stage, event.completed, event.total);
        if event.completed == event.total {
            println!();
        }
        let _ = std::io::stdout().flush();
    })
}

fn run(opts: Options) -> Result<()> {
    let mut config = match &opts.config {
        Some(path) => ResilienceConfig::from_json_file(path)?,
        None => ResilienceConfig::default(),
    };
    if let Some(beta) = opts.beta {
        config.cascade.beta = beta;
    }
    if let Some(alpha) = opts.alpha {
        config.cascade.node_alpha = alpha;
    }
    config.validate()?;

    let Some(path) = &opts.network else {
        print_help();
        return Ok(());
    };
    let net = Network::from_json_file(path)?;
    let cfg = &config.cascade;

    println!("Configuration:");
    println!("  Network:     {}", path.display());
    println!("  Nodes:       {}", net.node_count());
    println!("  Edges:       {}", net.edge_count());
    println!("  Beta:        {}", cfg.beta);
    println!("  OD samples:  {}", cfg.flow_samples);
    println!("  Triggers:    top {}", opts.top);
    println!("  Output file: {}", opts.output);
    println!();

    let progress = console_progress();
    let mut report = ResilienceReport::new(config.clone());

    println!("Estimating base load");
    let base_load = flow::estimate_load(&net, cfg.flow_samples, cfg.seed, &progress);
    let capacity = base_load.capacity(cfg.beta);
    info!(loaded_edges = base_load.len(), "base load ready");

    let ranking = centrality::betweenness(&net, &config.centrality).ranking(&net);
    let triggers: Vec<_> = ranking.iter().take(opts.top).cloned().collect();

    println!("\nSingle-node cascades");
    let records = cascade::single_node_cascades(&net, &capacity, &triggers, cfg, &progress)?;
    for record in &records {
        let trigger = record.trigger.first().map(|n| n.0.as_str()).unwrap_or("-");
        println!(
            "  {:<16} damage={:<5} first_wave={:.3} total={:.3}",
            trigger, record.total_damage, record.first_wave_loss, record.total_loss
        );
    }
    report.cascades = records;

    if let Some(first) = ranking.first() {
        println!("\nBeta sweep on {}", first);
        let (start, end, steps) = opts.beta_range;
        let betas = cascade::beta_range(start, end, steps);
        report.beta_sweep = cascade::beta_sweep(
            &net,
            &base_load,
            &betas,
            std::slice::from_ref(first),
            cfg,
            &progress,
        )?;
        for row in &report.beta_sweep {
            println!("  beta={:.3}  size={}", row.beta, row.cascade_size);
        }

        println!("\nTop-k attack (beta={})", opts.k_beta);
        report.k_attack =
            cascade::k_attack(&net, &base_load, opts.k_beta, &ranking, &opts.ks, cfg, &progress)?;
        for row in &report.k_attack {
            println!("  k={:<3}  size={}", row.k, row.cascade_size);
        }
    }

    if let Some(sample) = opts.metrics_sample {
        println!("\nNode metrics");
        let sample = if sample == 0 { None } else { Some(sample) };
        report.node_metrics = recovery::node_metrics(
            &net,
            sample,
            &capacity,
            cfg,
            &config.centrality,
            &progress,
        )?;
        println!("  {} rows", report.node_metrics.len());
    }

    if opts.node_load {
        println!("\nNode-load cascades (alpha={})", cfg.node_alpha);
        report.node_load = cascade::node_load_cascades(&net, cfg, &progress)?;
        for record in &report.node_load {
            let outcome = &record.outcome;
            println!(
                "  {:<12} {:<16} waves={:<3} first_wave={:.3} total={:.3}",
                format!("{:?}", record.target),
                outcome.trigger.0,
                outcome.waves,
                outcome.first_wave_loss,
                outcome.total_loss
            );
        }
    }

    report.write_json(&opts.output)?;
    println!("\nResults saved to {}", opts.output);
    Ok(())
}

fn main() {
    println!("MPTN Cascade Sweep");
    println!("==================\n");

    let Some(opts) = parse_args() else {
        return;
    };

    let log_config = LogConfig {
        log_dir: opts.log_dir.clone(),
        ..LogConfig::default()
    };
    let guard = match telemetry::init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = run(opts);
    // Flush the file appender before exiting
    drop(guard);
    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
