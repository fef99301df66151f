//! Per-phase metrics: ingest, unify, validate, sink.

use crate::metrics::registry::describe;
use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};
use crate::pipeline::processing::quality_gate::ValidationReport;
use crate::pipeline::processing::unify::UnifyStats;

pub struct IngestMetrics;

impl IngestMetrics {
    pub fn record_rows_read(source: &'static str, rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "ingest", "rows_read"), "source" => source)
            .increment(rows as u64);
    }
}

impl PhaseMetrics for IngestMetrics {
    fn register_metrics() {
        describe(&Self::metrics_documentation());
    }

    fn phase_name() -> &'static str {
        "ingest"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![MetricDoc {
            name: phase_metric!(counter, "ingest", "rows_read"),
            metric_type: MetricType::Counter,
            help: "Rows read from each source file",
            labels: vec!["source"],
        }]
    }
}

pub struct UnifyMetrics;

impl UnifyMetrics {
    /// Unmatched locations are expected attrition; this is the only place they surface
    pub fn record(stats: &UnifyStats) {
        ::metrics::counter!(phase_metric!(counter, "unify", "owid_filtered"))
            .increment(stats.owid_filtered as u64);
        ::metrics::counter!(phase_metric!(counter, "unify", "facts"), "disease" => "coronavirus")
            .increment(stats.corona_rows as u64);
        ::metrics::counter!(phase_metric!(counter, "unify", "facts"), "disease" => "monkeypox")
            .increment(stats.monkeypox_rows as u64);
        ::metrics::counter!(phase_metric!(counter, "unify", "unmatched_locations"), "disease" => "coronavirus")
            .increment(stats.corona_unmatched as u64);
        ::metrics::counter!(phase_metric!(counter, "unify", "unmatched_locations"), "disease" => "monkeypox")
            .increment(stats.monkeypox_unmatched as u64);
    }
}

impl PhaseMetrics for UnifyMetrics {
    fn register_metrics() {
        describe(&Self::metrics_documentation());
    }

    fn phase_name() -> &'static str {
        "unify"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "unify", "owid_filtered"),
                metric_type: MetricType::Counter,
                help: "Monkeypox aggregate rows excluded by their OWID code",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "unify", "facts"),
                metric_type: MetricType::Counter,
                help: "Fact rows produced by the unifier",
                labels: vec!["disease"],
            },
            MetricDoc {
                name: phase_metric!(counter, "unify", "unmatched_locations"),
                metric_type: MetricType::Counter,
                help: "Fact rows whose country has no Localization entry",
                labels: vec!["disease"],
            },
        ]
    }
}

pub struct ValidateMetrics;

impl ValidateMetrics {
    pub fn record(report: &ValidationReport) {
        ::metrics::counter!(phase_metric!(counter, "validate", "rows_kept"))
            .increment(report.kept.len() as u64);
        for (reason, count) in report.rejected_by_label() {
            ::metrics::counter!(phase_metric!(counter, "validate", "rows_rejected"), "reason" => reason)
                .increment(count as u64);
        }
    }
}

impl PhaseMetrics for ValidateMetrics {
    fn register_metrics() {
        describe(&Self::metrics_documentation());
    }

    fn phase_name() -> &'static str {
        "validate"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "validate", "rows_kept"),
                metric_type: MetricType::Counter,
                help: "Fact rows that passed validation",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "validate", "rows_rejected"),
                metric_type: MetricType::Counter,
                help: "Fact rows dropped for a missing field or a negative measure",
                labels: vec!["reason"],
            },
        ]
    }
}

pub struct SinkMetrics;

impl SinkMetrics {
    pub fn record_rows_written(sink: &'static str, table: &'static str, rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "sink", "rows_written"), "sink" => sink, "table" => table)
            .increment(rows as u64);
        ::metrics::gauge!(phase_metric!(gauge, "sink", "last_run_rows"), "table" => table)
            .set(rows as f64);
    }
}

impl PhaseMetrics for SinkMetrics {
    fn register_metrics() {
        describe(&Self::metrics_documentation());
    }

    fn phase_name() -> &'static str {
        "sink"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "sink", "rows_written"),
                metric_type: MetricType::Counter,
                help: "Rows written to the sink per table",
                labels: vec!["sink", "table"],
            },
            MetricDoc {
                name: phase_metric!(gauge, "sink", "last_run_rows"),
                metric_type: MetricType::Gauge,
                help: "Rows written per table by the most recent run",
                labels: vec!["table"],
            },
        ]
    }
}
