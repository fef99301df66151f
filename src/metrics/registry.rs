//! Registers every phase's metrics and catches duplicate names early.

use crate::metrics::{MetricDoc, MetricType, PhaseMetrics};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::phases::{IngestMetrics, SinkMetrics, UnifyMetrics, ValidateMetrics};

pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<IngestMetrics>(&mut all_metrics);
    register_phase_metrics::<UnifyMetrics>(&mut all_metrics);
    register_phase_metrics::<ValidateMetrics>(&mut all_metrics);
    register_phase_metrics::<SinkMetrics>(&mut all_metrics);

    info!("Registered {} metrics across all phases", all_metrics.len());
}

fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut HashMap<&'static str, MetricDoc>) {
    T::register_metrics();
    let phase_name = T::phase_name();

    for doc in T::metrics_documentation() {
        if all_metrics.contains_key(doc.name) {
            warn!(
                "Metric name conflict: '{}' registered again by phase '{}'",
                doc.name, phase_name
            );
        } else {
            debug!("  - {} ({:?}): {}", doc.name, doc.metric_type, doc.help);
            all_metrics.insert(doc.name, doc);
        }
    }
}

/// Attach the help text of each documented metric to the recorder
pub(crate) fn describe(docs: &[MetricDoc]) {
    for doc in docs {
        match doc.metric_type {
            MetricType::Counter => ::metrics::describe_counter!(doc.name, doc.help),
            MetricType::Gauge => ::metrics::describe_gauge!(doc.name, doc.help),
        }
    }
}
