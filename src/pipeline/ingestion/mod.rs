// Source readers: the three flat files, fully materialized before any transform

pub mod reader;

use tracing::info;

use crate::config::SourcesConfig;
use crate::constants::{CORONA_SOURCE, LOCALIZATION_SOURCE, MONKEYPOX_SOURCE};
use crate::error::Result;
use crate::metrics::IngestMetrics;
use crate::types::{CoronaRow, LocationRef, MonkeypoxRow};

/// Immutable snapshot of all three sources for one run
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub corona: Vec<CoronaRow>,
    pub monkeypox: Vec<MonkeypoxRow>,
    pub locations: Vec<LocationRef>,
}

impl Sources {
    /// Read every source or fail; nothing downstream runs on a partial snapshot
    pub fn load(config: &SourcesConfig) -> Result<Self> {
        let locations = reader::read_localization_from_path(&config.localization)?;
        IngestMetrics::record_rows_read(LOCALIZATION_SOURCE, locations.len());

        let corona = reader::read_corona_from_path(&config.corona)?;
        IngestMetrics::record_rows_read(CORONA_SOURCE, corona.len());

        let monkeypox = reader::read_monkeypox_from_path(&config.monkeypox)?;
        IngestMetrics::record_rows_read(MONKEYPOX_SOURCE, monkeypox.len());

        info!(
            locations = locations.len(),
            corona = corona.len(),
            monkeypox = monkeypox.len(),
            "Loaded sources"
        );

        Ok(Self {
            corona,
            monkeypox,
            locations,
        })
    }
}
