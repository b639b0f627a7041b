//! Metrics reports for scenario runs and worldtests.
//!
//! A report summarises one run: how many moves of each kind happened, whether
//! item totals were conserved, and optionally what a snapshot of the final
//! world cost on disk. Reports are exported as JSON for CI artifacts.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Top-level metrics report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Run identifier
    pub test_name: String,

    /// Timestamp when the report was built (RFC 3339)
    pub timestamp: String,

    /// Overall result
    pub result: TestResult,

    /// Item movement metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfers: Option<TransferMetrics>,

    /// Snapshot metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceMetrics>,
}

/// Overall run result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    /// Every check held.
    Pass,
    /// At least one check failed.
    Fail,
}

/// Item movement over a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferMetrics {
    /// Ticks stepped.
    pub ticks: u64,
    /// Units moved, keyed by move kind label.
    pub moves: BTreeMap<String, u64>,
    /// Per-item totals before the run.
    pub totals_before: BTreeMap<String, u64>,
    /// Per-item totals after the run.
    pub totals_after: BTreeMap<String, u64>,
}

impl TransferMetrics {
    /// Count `units` moved by a move of `kind`.
    pub fn record_move(&mut self, kind: &str, units: u64) {
        *self.moves.entry(kind.to_string()).or_default() += units;
    }

    /// Units moved across all kinds.
    pub fn total_moved(&self) -> u64 {
        self.moves.values().sum()
    }

    /// Whether every tracked item kept its total.
    pub fn conserved(&self) -> bool {
        self.totals_before == self.totals_after
    }
}

/// Snapshot size and contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistenceMetrics {
    /// Encoded snapshot size in bytes.
    pub snapshot_bytes: u64,
    /// Blocks written.
    pub blocks: u64,
    /// Entities written.
    pub entities: u64,
}

/// Builder for [`MetricsReport`].
pub struct MetricsReportBuilder {
    report: MetricsReport,
}

impl MetricsReportBuilder {
    /// Start a report stamped with the current time.
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            report: MetricsReport {
                test_name: test_name.into(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                result: TestResult::Pass,
                transfers: None,
                persistence: None,
            },
        }
    }

    /// Set result
    pub fn result(mut self, result: TestResult) -> Self {
        self.report.result = result;
        self
    }

    /// Set transfer metrics
    pub fn transfers(mut self, metrics: TransferMetrics) -> Self {
        self.report.transfers = Some(metrics);
        self
    }

    /// Set persistence metrics
    pub fn persistence(mut self, metrics: PersistenceMetrics) -> Self {
        self.report.persistence = Some(metrics);
        self
    }

    /// Build the report
    pub fn build(self) -> MetricsReport {
        self.report
    }
}

/// Sink for writing metrics reports to JSON files
pub struct MetricsSink {
    path: PathBuf,
}

impl MetricsSink {
    /// Create a sink at `path`, creating parent directories if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Write the report.
    pub fn write(&self, report: &MetricsReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn totals(n: u64) -> BTreeMap<String, u64> {
        BTreeMap::from([("mdm:stone".to_string(), n)])
    }

    #[test]
    fn lost_items_are_not_conserved() {
        let mut metrics = TransferMetrics {
            ticks: 10,
            totals_before: totals(64),
            totals_after: totals(63),
            ..TransferMetrics::default()
        };
        metrics.record_move("push", 1);
        metrics.record_move("push", 1);
        metrics.record_move("pull", 1);
        assert_eq!(metrics.total_moved(), 3);
        assert_eq!(metrics.moves["push"], 2);
        assert!(!metrics.conserved());

        let report = MetricsReportBuilder::new("leaky")
            .result(TestResult::Fail)
            .transfers(metrics)
            .build();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["result"], "fail");
        assert!(json.get("persistence").is_none());
    }

    #[test]
    fn metrics_sink_writes_file() {
        let path = std::env::temp_dir().join(format!(
            "mdl-metrics-{}.json",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));

        let report = MetricsReportBuilder::new("sink_test")
            .transfers(TransferMetrics {
                ticks: 4,
                totals_before: totals(8),
                totals_after: totals(8),
                ..TransferMetrics::default()
            })
            .persistence(PersistenceMetrics {
                snapshot_bytes: 120,
                blocks: 3,
                entities: 0,
            })
            .build();

        let sink = MetricsSink::create(&path).unwrap();
        sink.write(&report).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("sink_test"));
        assert!(contents.contains("\"result\": \"pass\""));
        let parsed: MetricsReport = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.persistence.unwrap().blocks, 3);

        fs::remove_file(&path).ok();
    }
}
