/// Source names used in logs, errors and metric labels
pub const CORONA_SOURCE: &str = "corona";
pub const MONKEYPOX_SOURCE: &str = "monkeypox";
pub const LOCALIZATION_SOURCE: &str = "localization";

// Hardcoded Disease dimension. Ids are stable across runs.
pub const CORONAVIRUS_ID: u32 = 1;
pub const CORONAVIRUS_NAME: &str = "Coronavirus";
pub const MONKEYPOX_ID: u32 = 2;
pub const MONKEYPOX_NAME: &str = "Monkeypox";

/// Marker carried by Our World in Data aggregate rows (continents, income groups, World)
pub const OWID_MARKER: &str = "OWID";

/// Required columns per source, checked against the CSV header row
pub const CORONA_COLUMNS: &[&str] = &[
    "country",
    "date",
    "cumulative_total_cases",
    "cumulative_total_deaths",
    "active_cases",
];
pub const MONKEYPOX_COLUMNS: &[&str] = &["iso_code", "location", "date", "total_cases", "total_deaths"];
pub const LOCALIZATION_COLUMNS: &[&str] = &["country", "continent"];

/// Date format of the `date` column in both case series
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const DEFAULT_CONFIG_PATH: &str = "etl.toml";
pub const CONFIG_PATH_ENV: &str = "EPI_ETL_CONFIG";
