//! Quality gate for unified facts.
//!
//! A fact is either accepted as a `ReportCase` or rejected with the first
//! reason found. Rows are never clamped or otherwise rewritten.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{ReportCase, UnifiedFact};

/// How a missing `totalActive` is treated.
///
/// The Monkeypox series has no active-case measure, so `Required` drops
/// every disease-2 row. `Optional` only requires the other fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ActiveMeasurePolicy {
    #[default]
    Optional,
    Required,
}

/// Fact fields checked by the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FactField {
    TotalConfirmed,
    TotalDeath,
    TotalActive,
    LocalizationId,
    DateInfo,
}

impl FactField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactField::TotalConfirmed => "totalConfirmed",
            FactField::TotalDeath => "totalDeath",
            FactField::TotalActive => "totalActive",
            FactField::LocalizationId => "localizationId",
            FactField::DateInfo => "dateInfo",
        }
    }
}

impl fmt::Display for FactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RejectionReason {
    MissingField(FactField),
    NegativeMeasure(FactField),
}

impl RejectionReason {
    /// Stable label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            RejectionReason::MissingField(_) => "missing_field",
            RejectionReason::NegativeMeasure(_) => "negative_measure",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::MissingField(field) => write!(f, "missing {field}"),
            RejectionReason::NegativeMeasure(field) => write!(f, "negative {field}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QualityDecision {
    Accept(ReportCase),
    Reject(RejectionReason),
}

pub trait QualityGate {
    fn assess(&self, fact: &UnifiedFact) -> QualityDecision;
}

#[derive(Debug, Clone, Default)]
pub struct QualityGateConfig {
    pub active_measure: ActiveMeasurePolicy,
}

#[derive(Debug, Clone, Default)]
pub struct DefaultQualityGate {
    pub config: QualityGateConfig,
}

impl DefaultQualityGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(active_measure: ActiveMeasurePolicy) -> Self {
        Self {
            config: QualityGateConfig { active_measure },
        }
    }
}

impl QualityGate for DefaultQualityGate {
    fn assess(&self, fact: &UnifiedFact) -> QualityDecision {
        use FactField::*;
        use RejectionReason::*;

        // Null filter first, in column order
        let Some(total_confirmed) = fact.total_confirmed else {
            return QualityDecision::Reject(MissingField(TotalConfirmed));
        };
        let Some(total_death) = fact.total_death else {
            return QualityDecision::Reject(MissingField(TotalDeath));
        };
        if fact.total_active.is_none() && self.config.active_measure == ActiveMeasurePolicy::Required {
            return QualityDecision::Reject(MissingField(TotalActive));
        }
        let Some(localization_id) = fact.localization_id else {
            return QualityDecision::Reject(MissingField(LocalizationId));
        };
        let Some(date_info) = fact.date_info else {
            return QualityDecision::Reject(MissingField(DateInfo));
        };

        if total_confirmed < 0.0 {
            return QualityDecision::Reject(NegativeMeasure(TotalConfirmed));
        }
        if total_death < 0.0 {
            return QualityDecision::Reject(NegativeMeasure(TotalDeath));
        }
        if fact.total_active.is_some_and(|active| active < 0.0) {
            return QualityDecision::Reject(NegativeMeasure(TotalActive));
        }

        QualityDecision::Accept(ReportCase {
            total_confirmed,
            total_death,
            total_active: fact.total_active,
            localization_id,
            date_info,
            disease_id: fact.disease_id,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub kept: Vec<ReportCase>,
    pub rejected: BTreeMap<RejectionReason, usize>,
}

impl ValidationReport {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    /// Rejections summed per reason label, ignoring the field
    pub fn rejected_by_label(&self) -> BTreeMap<&'static str, usize> {
        let mut out = BTreeMap::new();
        for (reason, count) in &self.rejected {
            *out.entry(reason.label()).or_insert(0) += count;
        }
        out
    }
}

/// Run every fact through the gate, preserving the order of accepted rows
pub fn validate(facts: Vec<UnifiedFact>, gate: &dyn QualityGate) -> ValidationReport {
    let mut report = ValidationReport {
        kept: Vec::with_capacity(facts.len()),
        rejected: BTreeMap::new(),
    };

    for fact in &facts {
        match gate.assess(fact) {
            QualityDecision::Accept(case) => report.kept.push(case),
            QualityDecision::Reject(reason) => *report.rejected.entry(reason).or_insert(0) += 1,
        }
    }

    info!(
        kept = report.kept.len(),
        rejected = report.rejected_total(),
        "Validated facts"
    );
    report
}
