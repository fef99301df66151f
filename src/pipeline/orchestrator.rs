use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, info_span, instrument};

use super::ingestion::Sources;
use super::processing::dimensions::{build_localization, disease_dimension};
use super::processing::normalize::RuleTable;
use super::processing::quality_gate::{validate, ActiveMeasurePolicy, DefaultQualityGate};
use super::processing::unify::{unify, UnifyStats};
use crate::app::ports::ReportSink;
use crate::config::{Config, SourcesConfig};
use crate::error::Result;
use crate::metrics::{SinkMetrics, UnifyMetrics, ValidateMetrics};
use crate::types::{Disease, Localization, ReportCase};

/// The three finished record sets of one run
#[derive(Debug, Clone, Default)]
pub struct EtlOutput {
    pub diseases: Vec<Disease>,
    pub localizations: Vec<Localization>,
    pub report_cases: Vec<ReportCase>,
    pub unify: UnifyStats,
    /// Rejections keyed by reason, e.g. "missing localizationId"
    pub rejected: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    pub corona: usize,
    pub monkeypox: usize,
    pub localization: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteCounts {
    pub diseases: usize,
    pub localizations: usize,
    pub report_cases: usize,
}

/// Summary of a complete run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub sources: SourceCounts,
    pub unify: UnifyStats,
    pub rows_kept: usize,
    pub rejected: BTreeMap<String, usize>,
    pub sink: Option<&'static str>,
    pub written: WriteCounts,
    pub duration_secs: f64,
}

impl PipelineResult {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

pub struct Pipeline {
    rules: RuleTable,
    gate: DefaultQualityGate,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(RuleTable::builtin(), ActiveMeasurePolicy::default())
    }
}

impl Pipeline {
    pub fn new(rules: RuleTable, active_measure: ActiveMeasurePolicy) -> Self {
        Self {
            rules,
            gate: DefaultQualityGate::with_policy(active_measure),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let rules = RuleTable::with_extra_rules(&config.reconciliation.extra_rules)?;
        Ok(Self::new(rules, config.validation.active_measure))
    }

    pub fn active_measure(&self) -> ActiveMeasurePolicy {
        self.gate.config.active_measure
    }

    /// Pure transformation from source snapshots to the three record sets
    pub fn transform(&self, sources: &Sources) -> EtlOutput {
        let diseases = disease_dimension();
        let localizations = build_localization(&sources.locations);

        let unified = unify(&sources.corona, &sources.monkeypox, &localizations, &self.rules);
        UnifyMetrics::record(&unified.stats);

        let report = validate(unified.facts, &self.gate);
        ValidateMetrics::record(&report);

        let rejected = report
            .rejected
            .iter()
            .map(|(reason, count)| (reason.to_string(), *count))
            .collect();

        EtlOutput {
            diseases,
            localizations,
            report_cases: report.kept,
            unify: unified.stats,
            rejected,
        }
    }

    /// Hand the record sets to the sink in foreign-key order. Nothing in the
    /// sink is touched before this point.
    #[instrument(skip_all, fields(sink = sink.name()))]
    pub fn write(output: &EtlOutput, sink: &mut dyn ReportSink) -> Result<WriteCounts> {
        let sink_name = sink.name();
        sink.begin_load()?;

        let diseases = sink.write_diseases(&output.diseases)?;
        SinkMetrics::record_rows_written(sink_name, "Disease", diseases);

        let localizations = sink.write_localizations(&output.localizations)?;
        SinkMetrics::record_rows_written(sink_name, "Localization", localizations);

        let report_cases = sink.write_report_cases(&output.report_cases)?;
        SinkMetrics::record_rows_written(sink_name, "ReportCase", report_cases);

        info!(diseases, localizations, report_cases, "Wrote record sets");
        Ok(WriteCounts {
            diseases,
            localizations,
            report_cases,
        })
    }

    /// Read, transform and persist. Source failures abort before the sink
    /// sees any record.
    pub fn run(
        &self,
        sources_config: &SourcesConfig,
        sink: &mut dyn ReportSink,
    ) -> Result<PipelineResult> {
        self.execute(sources_config, Some(sink))
    }

    /// Read and transform only
    pub fn check(&self, sources_config: &SourcesConfig) -> Result<PipelineResult> {
        self.execute(sources_config, None)
    }

    fn execute(
        &self,
        sources_config: &SourcesConfig,
        sink: Option<&mut dyn ReportSink>,
    ) -> Result<PipelineResult> {
        let started = Instant::now();

        let sources = {
            let _span = info_span!("ingest").entered();
            Sources::load(sources_config)?
        };
        let source_counts = SourceCounts {
            corona: sources.corona.len(),
            monkeypox: sources.monkeypox.len(),
            localization: sources.locations.len(),
        };

        let output = {
            let _span = info_span!("transform", active_measure = ?self.active_measure()).entered();
            self.transform(&sources)
        };

        let (sink_name, written) = match sink {
            Some(sink) => (Some(sink.name()), Self::write(&output, sink)?),
            None => (None, WriteCounts::default()),
        };

        let result = PipelineResult {
            sources: source_counts,
            unify: output.unify,
            rows_kept: output.report_cases.len(),
            rejected: output.rejected,
            sink: sink_name,
            written,
            duration_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            kept = result.rows_kept,
            rejected = result.rejected_total(),
            duration_secs = result.duration_secs,
            "Pipeline finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::storage::InMemorySink;
    use crate::types::{CoronaRow, LocationRef, MonkeypoxRow};
    use chrono::NaiveDate;

    fn sources() -> Sources {
        Sources {
            corona: vec![CoronaRow {
                country: "UK".to_string(),
                date: NaiveDate::from_ymd_opt(2021, 1, 1),
                cumulative_total_cases: Some(10.0),
                cumulative_total_deaths: Some(1.0),
                active_cases: Some(2.0),
            }],
            monkeypox: vec![MonkeypoxRow {
                iso_code: Some("GBR".to_string()),
                location: "United Kingdom".to_string(),
                date: NaiveDate::from_ymd_opt(2022, 6, 1),
                total_cases: Some(5.0),
                total_deaths: Some(0.0),
            }],
            locations: vec![LocationRef {
                country: "UK".to_string(),
                continent: "Europe".to_string(),
            }],
        }
    }

    #[test]
    fn test_transform_with_optional_active_measure() {
        let output = Pipeline::default().transform(&sources());
        assert_eq!(output.diseases.len(), 2);
        assert_eq!(output.localizations.len(), 1);
        assert_eq!(output.report_cases.len(), 2);
        assert_eq!(output.report_cases[1].disease_id, 2);
        assert!(output.rejected.is_empty());
    }

    #[test]
    fn test_transform_with_required_active_measure_drops_monkeypox() {
        let pipeline = Pipeline::new(RuleTable::builtin(), ActiveMeasurePolicy::Required);
        let output = pipeline.transform(&sources());
        assert_eq!(output.report_cases.len(), 1);
        assert_eq!(output.report_cases[0].disease_id, 1);
        assert_eq!(output.rejected["missing totalActive"], 1);
    }

    #[test]
    fn test_write_goes_through_sink_in_order() {
        let output = Pipeline::default().transform(&sources());
        let mut sink = InMemorySink::new();
        let written = Pipeline::write(&output, &mut sink).unwrap();
        assert_eq!(
            written,
            WriteCounts {
                diseases: 2,
                localizations: 1,
                report_cases: 2
            }
        );
        assert_eq!(sink.report_cases, output.report_cases);
    }

    #[test]
    fn test_invalid_extra_rule_fails_construction() {
        let mut config = Config::default();
        config
            .reconciliation
            .extra_rules
            .push(crate::pipeline::processing::normalize::CountryRule::new("USA", "America"));
        assert!(Pipeline::from_config(&config).is_err());
    }
}
