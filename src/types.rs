use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the location reference table; canonical country naming lives here
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRef {
    pub country: String,
    pub continent: String,
}

/// Case series A (COVID-19), one row per country and date
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoronaRow {
    pub country: String,
    pub date: Option<NaiveDate>,
    pub cumulative_total_cases: Option<f64>,
    pub cumulative_total_deaths: Option<f64>,
    pub active_cases: Option<f64>,
}

/// Case series B (Monkeypox, OWID layout). Carries no active-case measure.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonkeypoxRow {
    pub iso_code: Option<String>,
    pub location: String,
    pub date: Option<NaiveDate>,
    pub total_cases: Option<f64>,
    pub total_deaths: Option<f64>,
}

impl MonkeypoxRow {
    /// Aggregate rows (continents, World) are tagged with an OWID code
    pub fn is_aggregate(&self) -> bool {
        self.iso_code
            .as_deref()
            .is_some_and(|code| code.contains(crate::constants::OWID_MARKER))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disease {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localization {
    pub id: u32,
    pub country: String,
    pub continent: String,
}

/// A fact row after unification but before validation. Any field may still be missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnifiedFact {
    pub total_confirmed: Option<f64>,
    pub total_death: Option<f64>,
    pub total_active: Option<f64>,
    pub localization_id: Option<u32>,
    pub date_info: Option<NaiveDate>,
    pub disease_id: u32,
}

/// A validated fact row, ready for the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCase {
    pub total_confirmed: f64,
    pub total_death: f64,
    pub total_active: Option<f64>,
    pub localization_id: u32,
    pub date_info: NaiveDate,
    pub disease_id: u32,
}

/// A stored ReportCase row together with its surrogate id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCaseRecord {
    pub id: i64,
    #[serde(flatten)]
    pub case: ReportCase,
}

/// Request body for creating or replacing a Disease row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDisease {
    pub name: String,
}

/// Request body for creating or replacing a Localization row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLocalization {
    pub country: String,
    pub continent: String,
}
