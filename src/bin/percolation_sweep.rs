//! Percolation Sweep
//!
//! Runs every attack strategy against a network document, prints the
//! robustness integral of each, and optionally compares against G(n, m)
//! null models, structural summary metrics and relocation rates. With
//! `--incremental` it also profiles the network as its subsystems are
//! layered on one mode at a time.

use mptn_resilience::attack::AttackStrategy;
use mptn_resilience::benchmark;
use mptn_resilience::config::ResilienceConfig;
use mptn_resilience::incremental;
use mptn_resilience::percolation;
use mptn_resilience::progress::Progress;
use mptn_resilience::relocation;
use mptn_resilience::report::{ResilienceReport, StrategyCurve};
use mptn_resilience::telemetry::{self, LogConfig};
use mptn_resilience::topology::NetworkSummary;
use mptn_resilience::{EdgeKind, Network, Result, TransitMode};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

struct Options {
    network: Option<PathBuf>,
    config: Option<PathBuf>,
    strategies: Vec<String>,
    steps: Option<usize>,
    trials: Option<usize>,
    workers: Option<usize>,
    replicates: usize,
    isolated: bool,
    summary: bool,
    relocation: bool,
    incremental: bool,
    modes: Vec<String>,
    output: String,
    log_dir: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            network: None,
            config: None,
            strategies: vec![
                "random".to_string(),
                "degree".to_string(),
                "betweenness".to_string(),
                "motif".to_string(),
            ],
            steps: None,
            trials: None,
            workers: None,
            replicates: 0,
            isolated: false,
            summary: false,
            relocation: false,
            incremental: false,
            modes: Vec::new(),
            output: "results/percolation_sweep.json".to_string(),
            log_dir: None,
        }
    }
}

fn parse_string_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn print_help() {
    println!("Usage: percolation_sweep --network FILE [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -i, --network FILE      Network document (JSON edge list)");
    println!("  -c, --config FILE       Engine configuration (JSON)");
    println!("  -s, --strategies LIST   random[:seed],degree,betweenness,motif (default: all)");
    println!("  -r, --steps NUM         Removal steps R (default: 50)");
    println!("  -t, --trials NUM        Random-attack ensemble size (default: 50)");
    println!("  -w, --workers NUM       Worker cap (default: all cores)");
    println!("  -b, --benchmark NUM     Null-model replicates per strategy (default: 0)");
    println!("  --isolated              Drop walking transfers before the analysis");
    println!("  --summary               Include structural summary metrics");
    println!("  --relocation            Include the relocation-rate table");
    println!("  --incremental           Profile each step of the subsystem layering");
    println!("  --modes LIST            Layering order (default: order of first appearance)");
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
            "--strategies" | "-s" => {
                if i + 1 < args.len() {
                    let parsed = parse_string_list(&args[i + 1]);
                    if !parsed.is_empty() {
                        opts.strategies = parsed;
                    }
                    i += 1;
                }
            }
            "--steps" | "-r" => {
                if i + 1 < args.len() {
                    opts.steps = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--trials" | "-t" => {
                if i + 1 < args.len() {
                    opts.trials = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--workers" | "-w" => {
                if i + 1 < args.len() {
                    opts.workers = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--benchmark" | "-b" => {
                if i + 1 < args.len() {
                    opts.replicates = args[i + 1].parse().unwrap_or(opts.replicates);
                    i += 1;
                }
            }
            "--isolated" => opts.isolated = true,
            "--summary" => opts.summary = true,
            "--relocation" => opts.relocation = true,
            "--incremental" => opts.incremental = true,
            "--modes" => {
                if i + 1 < args.len() {
                    opts.modes = parse_string_list(&args[i + 1]);
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
    if let Some(steps) = opts.steps {
        config.percolation.removal_steps = steps;
    }
    if let Some(trials) = opts.trials {
        config.percolation.random_trials = trials;
    }
    if opts.workers.is_some() {
        config.percolation.max_workers = opts.workers;
    }
    if opts.replicates > 0 {
        config.benchmark.replicates = opts.replicates;
    }
    config.validate()?;

    let strategies = opts
        .strategies
        .iter()
        .map(|s| s.parse::<AttackStrategy>())
        .collect::<Result<Vec<_>>>()?;
    let attack_strategies = strategies.clone();

    let Some(path) = &opts.network else {
        print_help();
        return Ok(());
    };
    let mut net = Network::from_json_file(path)?;
    if opts.isolated {
        net = net.without_edge_kind(EdgeKind::Walk);
    }

    println!("Configuration:");
    println!("  Network:     {}", path.display());
    println!("  Nodes:       {}", net.node_count());
    println!("  Edges:       {}", net.edge_count());
    println!("  Steps:       {}", config.percolation.removal_steps);
    println!("  Trials:      {}", config.percolation.random_trials);
    println!("  Strategies:  {:?}", opts.strategies);
    println!("  Null models: {}", opts.replicates);
    println!("  Output file: {}", opts.output);
    println!();

    let progress = console_progress();
    let mut report = ResilienceReport::new(config.clone());

    for strategy in strategies {
        println!("Attack: {}", strategy);
        let table = percolation::analyse_strategy(
            &net,
            strategy,
            &config.percolation,
            &config.centrality,
            &progress,
        )?;
        let mut curve = StrategyCurve::new(strategy.to_string(), table);

        if opts.replicates > 0 {
            let tables = benchmark::benchmark_resilience(
                &net,
                strategy,
                &config.benchmark,
                &config.percolation,
                &config.centrality,
                &progress,
            )?;
            curve = curve.with_null_model(&tables);
        }

        match &curve.null_model {
            Some(null) => println!(
                "  R_b = {:.4}  (null {:.4} ± {:.4}, z = {:.2})",
                curve.robustness, null.mean, null.std, null.z
            ),
            None => println!("  R_b = {:.4}", curve.robustness),
        }
        info!(strategy = %strategy, robustness = curve.robustness, "strategy complete");
        report.curves.push(curve);
    }

    if opts.summary {
        println!("\nStructural summary");
        let summary = NetworkSummary::compute(&net, &config.centrality);
        println!("  E       = {:.4}", summary.efficiency);
        println!("  E_geo   = {:.4}", summary.geo_efficiency);
        println!("  S0      = {:.3}", summary.s0);
        if opts.replicates > 0 {
            let stats = benchmark::benchmark_stats(&net, &config.benchmark, &progress);
            println!("  z(E)     = {:.2}", stats.efficiency_z(summary.efficiency));
            println!("  z(E_geo) = {:.2}", stats.geo_efficiency_z(summary.geo_efficiency));
            report.benchmark = Some(stats);
        }
        report.network = Some(summary);
    }

    if opts.relocation {
        println!("\nRelocation rates");
        let modes = relocation::modes_of(&net);
        let rows = relocation::relocation_table(&net, &modes, &config.relocation, &progress);
        for row in &rows {
            println!(
                "  {:<10} d_max={:<6} {:<15} {:.4}",
                row.subsystem.as_str(),
                row.d_max,
                format!("{:?}", row.state),
                row.rate
            );
        }
        report.relocation = rows;
    }

    if opts.incremental {
        println!("\nIncremental layering");
        let modes: Vec<TransitMode> = if opts.modes.is_empty() {
            relocation::modes_of(&net)
        } else {
            opts.modes.iter().map(|m| TransitMode::new(m.as_str())).collect()
        };
        let rows =
            incremental::incremental(&net, &modes, &attack_strategies, &config, &progress)?;
        for row in &rows {
            let rb: Vec<String> = row
                .curves
                .iter()
                .map(|c| format!("{}={:.4}", c.strategy, c.robustness))
                .collect();
            println!(
                "  step {} {:<15} |V|={:<6} E={:.4} z(E)={:.2} {}",
                row.step,
                format!("{:?}", row.state),
                row.summary.nodes,
                row.summary.efficiency,
                row.efficiency_z,
                rb.join(" ")
            );
        }
        report.incremental = rows;
    }

    report.write_json(&opts.output)?;
    println!("\nResults saved to {}", opts.output);
    Ok(())
}

fn main() {
    println!("MPTN Percolation Sweep");
    println!("======================\n");

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
