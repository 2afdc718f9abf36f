//! Simulation parameters
//!
//! All calibration constants of the engines (sampling fractions, round caps,
//! modal penalties) are exposed here rather than hard-coded.

use crate::error::{ResilienceError, Result};
use crate::network::TransitMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Percolation ensemble parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercolationConfig {
    /// Number of removal steps R
    pub removal_steps: usize,
    /// Ensemble size for the random strategy
    pub random_trials: usize,
    /// Worker cap; None uses every available core
    pub max_workers: Option<usize>,
}

impl Default for PercolationConfig {
    fn default() -> Self {
        Self {
            removal_steps: 50,
            random_trials: 50,
            max_workers: None,
        }
    }
}

/// Betweenness estimation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralityConfig {
    /// Networks with more nodes than this use sampled source nodes
    pub approx_threshold: usize,
    /// Fraction of nodes used as sources when sampling
    pub sample_fraction: f64,
    pub seed: u64,
}

impl Default for CentralityConfig {
    fn default() -> Self {
        Self {
            approx_threshold: 2000,
            sample_fraction: 0.1,
            seed: 42,
        }
    }
}

/// Functional cascade parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Capacity tolerance β
    pub beta: f64,
    /// OD pairs sampled for the base load estimate
    pub flow_samples: usize,
    /// Propagation rounds sample `flow_samples / iteration_flow_divisor` pairs
    pub iteration_flow_divisor: usize,
    /// Upper bound on propagation rounds
    pub max_rounds: usize,
    pub seed: u64,
    /// Node capacity tolerance α of the betweenness-load cascade
    pub node_alpha: f64,
    /// Fraction of sources sampled for every betweenness-load estimate
    pub node_sample_fraction: f64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            beta: 0.085,
            flow_samples: 20_000,
            iteration_flow_divisor: 2,
            max_rounds: 10,
            seed: 42,
            node_alpha: 0.2,
            node_sample_fraction: 0.2,
        }
    }
}

impl CascadeConfig {
    pub fn iteration_samples(&self) -> usize {
        (self.flow_samples / self.iteration_flow_divisor.max(1)).max(1)
    }
}

/// Transfer penalty applied when relocating from a stop of mode `from`
/// to an alternative stop of mode `to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalPenalty {
    pub from: TransitMode,
    pub to: TransitMode,
    pub factor: f64,
}

/// Relocation-rate parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelocationConfig {
    /// Distance budgets in metres
    pub d_max_list: Vec<f64>,
    pub penalties: Vec<ModalPenalty>,
    /// Factor for mode pairs without an explicit penalty
    pub default_factor: f64,
}

impl Default for RelocationConfig {
    fn default() -> Self {
        Self {
            d_max_list: vec![750.0, 1600.0],
            penalties: vec![
                ModalPenalty {
                    from: TransitMode::new("metro"),
                    to: TransitMode::new("bus"),
                    factor: 1.5,
                },
                ModalPenalty {
                    from: TransitMode::new("bus"),
                    to: TransitMode::new("metro"),
                    factor: 0.8,
                },
            ],
            default_factor: 1.0,
        }
    }
}

impl RelocationConfig {
    /// Penalty multiplier for relocating from `from` to `to`
    pub fn factor(&self, from: Option<&TransitMode>, to: Option<&TransitMode>) -> f64 {
        match (from, to) {
            (Some(f), Some(t)) => self
                .penalties
                .iter()
                .find(|p| &p.from == f && &p.to == t)
                .map(|p| p.factor)
                .unwrap_or(self.default_factor),
            _ => self.default_factor,
        }
    }

    /// Same budgets with every penalty removed
    pub fn symmetric(&self) -> Self {
        Self {
            d_max_list: self.d_max_list.clone(),
            penalties: Vec::new(),
            default_factor: 1.0,
        }
    }
}

/// Null-model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub replicates: usize,
    /// Replicate `i` is generated with seed `base_seed + i`
    pub base_seed: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            replicates: 50,
            base_seed: 0,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub percolation: PercolationConfig,
    pub centrality: CentralityConfig,
    pub cascade: CascadeConfig,
    pub relocation: RelocationConfig,
    pub benchmark: BenchmarkConfig,
}

impl ResilienceConfig {
    /// Load from a JSON file; absent fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ResilienceConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(ResilienceError::InvalidConfig(msg)) };

        if self.percolation.removal_steps == 0 {
            return invalid("percolation.removal_steps must be at least 1".into());
        }
        if self.percolation.random_trials == 0 {
            return invalid("percolation.random_trials must be at least 1".into());
        }
        if self.percolation.max_workers == Some(0) {
            return invalid("percolation.max_workers must be at least 1".into());
        }
        let fraction = self.centrality.sample_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return invalid(format!("centrality.sample_fraction {} not in (0, 1]", fraction));
        }
        if !(self.cascade.beta >= 0.0 && self.cascade.beta.is_finite()) {
            return invalid(format!("cascade.beta {} must be finite and >= 0", self.cascade.beta));
        }
        if self.cascade.flow_samples == 0 {
            return invalid("cascade.flow_samples must be at least 1".into());
        }
        if self.cascade.iteration_flow_divisor == 0 {
            return invalid("cascade.iteration_flow_divisor must be at least 1".into());
        }
        if !(self.cascade.node_alpha >= 0.0 && self.cascade.node_alpha.is_finite()) {
            return invalid(format!("cascade.node_alpha {} must be finite and >= 0", self.cascade.node_alpha));
        }
        let fraction = self.cascade.node_sample_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return invalid(format!("cascade.node_sample_fraction {} not in (0, 1]", fraction));
        }
        if let Some(d) = self.relocation.d_max_list.iter().find(|d| !(**d > 0.0)) {
            return invalid(format!("relocation distance {} must be positive", d));
        }
        if let Some(p) = self.relocation.penalties.iter().find(|p| !(p.factor > 0.0)) {
            return invalid(format!("penalty {} -> {} must be positive", p.from, p.to));
        }
        if self.benchmark.replicates == 0 {
            return invalid("benchmark.replicates must be at least 1".into());
        }
        Ok(())
    }
}
