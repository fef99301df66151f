//! Row-count instrumentation for the ETL run.
//!
//! Each pipeline phase owns a small metrics struct in its own submodule.
//! Names follow `epi_{phase}_{name}_total` for counters. Recording through
//! the `metrics` facade is a no-op until `init_metrics` installs a recorder.

pub mod phases;
pub mod registry;

pub use phases::{IngestMetrics, SinkMetrics, UnifyMetrics, ValidateMetrics};

use std::path::Path;
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

use crate::error::Result;

static INIT: Once = Once::new();
static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder once. No HTTP listener: a batch job
/// renders its snapshot in-process when it finishes.
pub fn init_metrics() {
    INIT.call_once(|| {
        match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                if HANDLE.set(handle).is_err() {
                    warn!("Prometheus handle already set");
                }
                registry::register_all_metrics();
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
            }
        }
    });
}

/// Current metrics in Prometheus text format, if a recorder is installed
pub fn render_snapshot() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

/// Write the rendered snapshot to `path`. Returns false when there is no recorder.
pub fn write_snapshot(path: &Path) -> Result<bool> {
    let Some(body) = render_snapshot() else {
        return Ok(false);
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, body)?;
    info!("Wrote metrics snapshot to {}", path.display());
    Ok(true)
}

/// Implemented by each phase's metrics struct
pub trait PhaseMetrics {
    /// Describe every metric of the phase to the installed recorder
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
}

/// epi_{phase}_{name}_total for counters, epi_{phase}_{name} for gauges
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("epi_", $phase, "_", $name, "_total")
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("epi_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;
