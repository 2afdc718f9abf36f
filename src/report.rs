//! Result bundle written by the sweep drivers

use crate::aggregate::ResilienceTable;
use crate::benchmark::{self, BenchmarkStats};
use crate::cascade::{BetaSweepRow, CascadeDamageRecord, KAttackRow, NodeLoadRecord};
use crate::config::ResilienceConfig;
use crate::error::Result;
use crate::incremental::IncrementalRow;
use crate::recovery::NodeMetricsRow;
use crate::relocation::RelocationRow;
use crate::topology::NetworkSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Robustness of the null model for one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullRobustness {
    pub replicates: usize,
    pub mean: f64,
    pub std: f64,
    /// z-score of the real network's R_b against the replicates
    pub z: f64,
}

/// Aggregated curve and robustness integral for one attack strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyCurve {
    pub strategy: String,
    pub robustness: f64,
    pub table: ResilienceTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_model: Option<NullRobustness>,
}

impl StrategyCurve {
    pub fn new(strategy: impl Into<String>, table: ResilienceTable) -> Self {
        Self {
            strategy: strategy.into(),
            robustness: table.robustness(),
            table,
            null_model: None,
        }
    }

    /// Attach null-model robustness from benchmark replicate tables
    pub fn with_null_model(mut self, replicates: &[ResilienceTable]) -> Self {
        if replicates.is_empty() {
            return self;
        }
        let values: Vec<f64> = replicates.iter().map(|t| t.robustness()).collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        self.null_model = Some(NullRobustness {
            replicates: values.len(),
            mean,
            std,
            z: benchmark::z_score(self.robustness, mean, std),
        });
        self
    }
}

/// Everything one analysis run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceReport {
    pub generated_at: DateTime<Utc>,
    pub config: ResilienceConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub curves: Vec<StrategyCurve>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cascades: Vec<CascadeDamageRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub beta_sweep: Vec<BetaSweepRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub k_attack: Vec<KAttackRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_metrics: Vec<NodeMetricsRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relocation: Vec<RelocationRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_load: Vec<NodeLoadRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incremental: Vec<IncrementalRow>,
}

impl ResilienceReport {
    pub fn new(config: ResilienceConfig) -> Self {
        Self {
            generated_at: Utc::now(),
            config,
            network: None,
            benchmark: None,
            curves: Vec::new(),
            cascades: Vec::new(),
            beta_sweep: Vec::new(),
            k_attack: Vec::new(),
            node_metrics: Vec::new(),
            relocation: Vec::new(),
            node_load: Vec::new(),
            incremental: Vec::new(),
        }
    }

    /// Write as pretty JSON, creating parent directories as needed
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ResilienceRow;

    fn table(values: &[f64]) -> ResilienceTable {
        let step = 1.0 / (values.len() - 1) as f64;
        ResilienceTable {
            rows: values
                .iter()
                .enumerate()
                .map(|(i, &mean)| ResilienceRow {
                    removed_fraction: i as f64 * step,
                    mean,
                    std: 0.0,
                })
                .collect(),
            trials: 1,
        }
    }

    #[test]
    fn test_curve_robustness_and_null_model() {
        let curve = StrategyCurve::new("degree", table(&[1.0, 0.5, 0.0]));
        assert!((curve.robustness - 0.5).abs() < 1e-12);
        assert!(curve.null_model.is_none());

        let curve = curve.with_null_model(&[table(&[1.0, 0.0, 0.0]), table(&[1.0, 1.0, 0.0])]);
        let null = curve.null_model.unwrap();
        assert_eq!(null.replicates, 2);
        assert!((null.mean - 0.5).abs() < 1e-12);
        assert_eq!(null.z, 0.0);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        let mut report = ResilienceReport::new(ResilienceConfig::default());
        report.curves.push(StrategyCurve::new("random", table(&[1.0, 0.0])));
        report.write_json(&path).unwrap();

        let back = ResilienceReport::from_json_file(&path).unwrap();
        assert_eq!(back.curves, report.curves);
        assert_eq!(back.generated_at, report.generated_at);
        assert!(back.cascades.is_empty());
    }
}
