use std::collections::HashMap;

use tracing::debug;

use crate::constants::{CORONAVIRUS_ID, CORONAVIRUS_NAME, MONKEYPOX_ID, MONKEYPOX_NAME};
use crate::types::{Disease, LocationRef, Localization};

/// The fixed Disease dimension. Never read from a source file.
pub fn disease_dimension() -> Vec<Disease> {
    vec![
        Disease {
            id: CORONAVIRUS_ID,
            name: CORONAVIRUS_NAME.to_string(),
        },
        Disease {
            id: MONKEYPOX_ID,
            name: MONKEYPOX_NAME.to_string(),
        },
    ]
}

/// Assign surrogate ids 1..=N in source order
pub fn build_localization(locations: &[LocationRef]) -> Vec<Localization> {
    locations
        .iter()
        .zip(1u32..)
        .map(|(loc, id)| Localization {
            id,
            country: loc.country.clone(),
            continent: loc.continent.clone(),
        })
        .collect()
}

/// Exact-name lookup into the Localization dimension
#[derive(Debug, Clone, Default)]
pub struct LocalizationIndex<'a> {
    by_country: HashMap<&'a str, u32>,
}

impl<'a> LocalizationIndex<'a> {
    /// When a country appears more than once the first row wins, so a join
    /// never produces more than one fact per case-series row.
    pub fn new(localizations: &'a [Localization]) -> Self {
        let mut by_country = HashMap::with_capacity(localizations.len());
        let mut duplicates = 0usize;
        for loc in localizations {
            if by_country.contains_key(loc.country.as_str()) {
                duplicates += 1;
            } else {
                by_country.insert(loc.country.as_str(), loc.id);
            }
        }
        if duplicates > 0 {
            debug!(duplicates, "Duplicate countries in localization reference, first row kept");
        }
        Self { by_country }
    }

    pub fn lookup(&self, country: &str) -> Option<u32> {
        self.by_country.get(country).copied()
    }

    pub fn len(&self) -> usize {
        self.by_country.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_country.is_empty()
    }
}
