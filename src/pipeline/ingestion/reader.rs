//! CSV source readers.
//!
//! Each reader checks the header row for its required columns before reading
//! any data row, then deserializes rows by column name. Extra columns and any
//! column order are accepted. Cells that cannot be parsed are read as missing
//! and left for the validator to drop.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::constants::{
    CORONA_COLUMNS, CORONA_SOURCE, DATE_FORMAT, LOCALIZATION_COLUMNS, LOCALIZATION_SOURCE,
    MONKEYPOX_COLUMNS, MONKEYPOX_SOURCE,
};
use crate::error::{EtlError, Result};
use crate::types::{CoronaRow, LocationRef, MonkeypoxRow};

#[derive(Debug, Deserialize)]
struct CoronaRecord {
    #[serde(default)]
    country: String,
    #[serde(default, deserialize_with = "de_date")]
    date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_measure")]
    cumulative_total_cases: Option<f64>,
    #[serde(default, deserialize_with = "de_measure")]
    cumulative_total_deaths: Option<f64>,
    #[serde(default, deserialize_with = "de_measure")]
    active_cases: Option<f64>,
}

impl From<CoronaRecord> for CoronaRow {
    fn from(r: CoronaRecord) -> Self {
        Self {
            country: r.country,
            date: r.date,
            cumulative_total_cases: r.cumulative_total_cases,
            cumulative_total_deaths: r.cumulative_total_deaths,
            active_cases: r.active_cases,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MonkeypoxRecord {
    #[serde(default, deserialize_with = "de_text")]
    iso_code: Option<String>,
    #[serde(default)]
    location: String,
    #[serde(default, deserialize_with = "de_date")]
    date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_measure")]
    total_cases: Option<f64>,
    #[serde(default, deserialize_with = "de_measure")]
    total_deaths: Option<f64>,
}

impl From<MonkeypoxRecord> for MonkeypoxRow {
    fn from(r: MonkeypoxRecord) -> Self {
        Self {
            iso_code: r.iso_code,
            location: r.location,
            date: r.date,
            total_cases: r.total_cases,
            total_deaths: r.total_deaths,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LocationRecord {
    #[serde(default)]
    country: String,
    #[serde(default)]
    continent: String,
}

fn de_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

// NaN is how the upstream exports spell a missing measure
fn de_measure<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f64>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| !v.is_nan()))
}

fn de_date<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()))
}

fn ensure_columns(
    headers: &StringRecord,
    source_name: &'static str,
    required: &[&'static str],
) -> Result<()> {
    for &column in required {
        if !headers.iter().any(|h| h == column) {
            return Err(EtlError::MissingColumn {
                source_name,
                column,
            });
        }
    }
    Ok(())
}

fn read_rows<R, T>(reader: R, source_name: &'static str, required: &[&'static str]) -> Result<Vec<T>>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    ensure_columns(&headers, source_name, required)?;

    let mut rows = Vec::new();
    for record in csv_reader.deserialize::<T>() {
        rows.push(record?);
    }
    debug!(source = source_name, rows = rows.len(), "Read source rows");
    Ok(rows)
}

fn open_source(source_name: &'static str, path: &Path) -> Result<File> {
    File::open(path).map_err(|e| EtlError::SourceRead {
        source_name,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Tag a read failure with the file it came from, keeping MissingColumn as is
fn with_path(source_name: &'static str, path: &Path, err: EtlError) -> EtlError {
    match err {
        EtlError::Csv(e) => EtlError::SourceRead {
            source_name,
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
        other => other,
    }
}

pub fn read_corona<R: Read>(reader: R) -> Result<Vec<CoronaRow>> {
    let records: Vec<CoronaRecord> = read_rows(reader, CORONA_SOURCE, CORONA_COLUMNS)?;
    Ok(records.into_iter().map(CoronaRow::from).collect())
}

pub fn read_monkeypox<R: Read>(reader: R) -> Result<Vec<MonkeypoxRow>> {
    let records: Vec<MonkeypoxRecord> = read_rows(reader, MONKEYPOX_SOURCE, MONKEYPOX_COLUMNS)?;
    Ok(records.into_iter().map(MonkeypoxRow::from).collect())
}

pub fn read_localization<R: Read>(reader: R) -> Result<Vec<LocationRef>> {
    let records: Vec<LocationRecord> =
        read_rows(reader, LOCALIZATION_SOURCE, LOCALIZATION_COLUMNS)?;
    Ok(records
        .into_iter()
        .map(|r| LocationRef {
            country: r.country,
            continent: r.continent,
        })
        .collect())
}

pub fn read_corona_from_path(path: &Path) -> Result<Vec<CoronaRow>> {
    let file = open_source(CORONA_SOURCE, path)?;
    read_corona(file).map_err(|e| with_path(CORONA_SOURCE, path, e))
}

pub fn read_monkeypox_from_path(path: &Path) -> Result<Vec<MonkeypoxRow>> {
    let file = open_source(MONKEYPOX_SOURCE, path)?;
    read_monkeypox(file).map_err(|e| with_path(MONKEYPOX_SOURCE, path, e))
}

pub fn read_localization_from_path(path: &Path) -> Result<Vec<LocationRef>> {
    let file = open_source(LOCALIZATION_SOURCE, path)?;
    read_localization(file).map_err(|e| with_path(LOCALIZATION_SOURCE, path, e))
}
