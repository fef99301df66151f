//! Fact unification: both case series joined to the Localization dimension
//! and projected onto one fact shape.
//!
//! The join is a left join. A row whose country has no Localization entry
//! is kept with `localization_id = None` and dropped later by the validator.

use serde::Serialize;
use tracing::info;

use super::dimensions::LocalizationIndex;
use super::normalize::RuleTable;
use crate::constants::{CORONAVIRUS_ID, MONKEYPOX_ID};
use crate::types::{CoronaRow, Localization, MonkeypoxRow, UnifiedFact};

/// Row counts observed while unifying
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnifyStats {
    pub corona_rows: usize,
    pub monkeypox_rows: usize,
    pub owid_filtered: usize,
    pub corona_unmatched: usize,
    pub monkeypox_unmatched: usize,
}

impl UnifyStats {
    pub fn unmatched(&self) -> usize {
        self.corona_unmatched + self.monkeypox_unmatched
    }
}

#[derive(Debug, Clone, Default)]
pub struct Unified {
    pub facts: Vec<UnifiedFact>,
    pub stats: UnifyStats,
}

/// Series A: country names are already canonical, joined as is
pub fn project_corona(rows: &[CoronaRow], index: &LocalizationIndex<'_>) -> Vec<UnifiedFact> {
    rows.iter()
        .map(|row| UnifiedFact {
            total_confirmed: row.cumulative_total_cases,
            total_death: row.cumulative_total_deaths,
            total_active: row.active_cases,
            localization_id: index.lookup(&row.country),
            date_info: row.date,
            disease_id: CORONAVIRUS_ID,
        })
        .collect()
}

/// Series B: aggregates dropped first, then names reconciled before the join.
/// There is no active-case measure, so `total_active` stays missing.
pub fn project_monkeypox(
    rows: &[MonkeypoxRow],
    index: &LocalizationIndex<'_>,
    rules: &RuleTable,
) -> Vec<UnifiedFact> {
    rows.iter()
        .filter(|row| !row.is_aggregate())
        .map(|row| UnifiedFact {
            total_confirmed: row.total_cases,
            total_death: row.total_deaths,
            total_active: None,
            localization_id: index.lookup(&rules.reconcile(&row.location)),
            date_info: row.date,
            disease_id: MONKEYPOX_ID,
        })
        .collect()
}

/// Series A rows in source order, followed by series B rows in source order
pub fn unify(
    corona: &[CoronaRow],
    monkeypox: &[MonkeypoxRow],
    localizations: &[Localization],
    rules: &RuleTable,
) -> Unified {
    let index = LocalizationIndex::new(localizations);

    let corona_facts = project_corona(corona, &index);
    let monkeypox_facts = project_monkeypox(monkeypox, &index, rules);

    let stats = UnifyStats {
        corona_rows: corona_facts.len(),
        monkeypox_rows: monkeypox_facts.len(),
        owid_filtered: monkeypox.len() - monkeypox_facts.len(),
        corona_unmatched: count_unmatched(&corona_facts),
        monkeypox_unmatched: count_unmatched(&monkeypox_facts),
    };

    info!(
        corona = stats.corona_rows,
        monkeypox = stats.monkeypox_rows,
        owid_filtered = stats.owid_filtered,
        unmatched = stats.unmatched(),
        "Unified case series"
    );

    let mut facts = corona_facts;
    facts.extend(monkeypox_facts);
    Unified { facts, stats }
}

fn count_unmatched(facts: &[UnifiedFact]) -> usize {
    facts.iter().filter(|f| f.localization_id.is_none()).count()
}
