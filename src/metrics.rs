//! Build metrics.
//!
//! Recorded through the `metrics` facade, so they cost nothing unless a
//! recorder is installed. A batch run has no scrape endpoint; instead the
//! Prometheus recorder is installed in-process and its rendered snapshot is
//! written to a textfile when the run ends.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;

/// Metric names follow `baseball_db_{name}` with a `_total` suffix on
/// counters.
macro_rules! build_metric {
    (counter, $name:literal) => {
        concat!("baseball_db_", $name, "_total")
    };
    (histogram, $name:literal) => {
        concat!("baseball_db_", $name)
    };
}

/// Metrics emitted by the load, transform and write stages
pub struct BuildMetrics;

impl BuildMetrics {
    /// Rows read from one source extract
    pub fn record_source_rows(source: &'static str, rows: usize) {
        ::metrics::counter!(build_metric!(counter, "source_rows"), "source" => source)
            .increment(rows as u64);
    }

    /// Rows offered to one table, split into kept and ignored
    pub fn record_insert(table: &'static str, inserted: u64, skipped: u64) {
        ::metrics::counter!(build_metric!(counter, "rows_inserted"), "table" => table)
            .increment(inserted);
        ::metrics::counter!(build_metric!(counter, "rows_skipped"), "table" => table)
            .increment(skipped);
    }

    /// A descriptive cell that could not be read as a number
    pub fn record_invalid_cell(source: &'static str, column: &str) {
        ::metrics::counter!(
            build_metric!(counter, "invalid_cells"),
            "source" => source,
            "column" => column.to_string()
        )
        .increment(1);
    }

    pub fn record_stage_duration(stage: &'static str, duration_secs: f64) {
        ::metrics::histogram!(
            build_metric!(histogram, "stage_duration_seconds"),
            "stage" => stage
        )
        .record(duration_secs);
    }

    pub fn record_integrity_violations(count: usize) {
        ::metrics::counter!(build_metric!(counter, "foreign_key_violations"))
            .increment(count as u64);
    }

    /// Names of every metric above, for documentation and tests
    pub fn metric_names() -> Vec<&'static str> {
        vec![
            build_metric!(counter, "source_rows"),
            build_metric!(counter, "rows_inserted"),
            build_metric!(counter, "rows_skipped"),
            build_metric!(counter, "invalid_cells"),
            build_metric!(histogram, "stage_duration_seconds"),
            build_metric!(counter, "foreign_key_violations"),
        ]
    }
}

/// Install the Prometheus recorder without an HTTP listener. Returns `None`
/// if a recorder is already installed.
pub fn install_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus recorder installed");
            Some(handle)
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
            None
        }
    }
}

/// Write the current snapshot in the Prometheus text format
pub fn write_textfile(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, handle.render())?;
    info!(path = %path.display(), "Wrote metrics snapshot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_a_no_op() {
        BuildMetrics::record_source_rows("game_log", 3);
        BuildMetrics::record_insert("game", 3, 0);
        BuildMetrics::record_invalid_cell("game_log", "attendance");
        BuildMetrics::record_stage_duration("load", 0.01);
        BuildMetrics::record_integrity_violations(0);
    }

    #[test]
    fn test_metric_naming_convention() {
        for name in BuildMetrics::metric_names() {
            assert!(name.starts_with("baseball_db_"));
        }
        assert!(BuildMetrics::metric_names()
            .iter()
            .filter(|n| !n.contains("duration"))
            .all(|n| n.ends_with("_total")));
    }
}
