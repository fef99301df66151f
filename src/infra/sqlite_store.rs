use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::sqlite_sink::prepare_schema;
use crate::app::ports::ReportStore;
use crate::constants::DATE_FORMAT;
use crate::error::Result;
use crate::types::{
    Disease, Localization, NewDisease, NewLocalization, ReportCase, ReportCaseRecord,
};

const REPORT_CASE_COLUMNS: &str =
    "id, totalConfirmed, totalDeath, totalActive, localizationId, dateInfo, diseaseId";

/// Row-level CRUD over the tables written by `SqliteSink`
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database and make sure the schema is there
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self::from_connection(Connection::open(path)?)?;
        info!("Opened SQLite store at {}", path.display());
        Ok(store)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        prepare_schema(&conn, true)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // poisoning only means a handler panicked; the connection is still usable
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn disease_from_row(row: &Row<'_>) -> rusqlite::Result<Disease> {
    Ok(Disease {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn localization_from_row(row: &Row<'_>) -> rusqlite::Result<Localization> {
    Ok(Localization {
        id: row.get(0)?,
        country: row.get(1)?,
        continent: row.get(2)?,
    })
}

fn report_case_from_row(row: &Row<'_>) -> rusqlite::Result<ReportCaseRecord> {
    let raw_date: String = row.get(5)?;
    let date_info = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    Ok(ReportCaseRecord {
        id: row.get(0)?,
        case: ReportCase {
            total_confirmed: row.get(1)?,
            total_death: row.get(2)?,
            total_active: row.get(3)?,
            localization_id: row.get(4)?,
            date_info,
            disease_id: row.get(6)?,
        },
    })
}

impl ReportStore for SqliteStore {
    fn list_diseases(&self) -> Result<Vec<Disease>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached("SELECT id, name FROM Disease ORDER BY id")?;
        let rows = stmt.query_map([], disease_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_disease(&self, id: u32) -> Result<Option<Disease>> {
        let conn = self.conn();
        Ok(conn
            .query_row("SELECT id, name FROM Disease WHERE id = ?1", params![id], disease_from_row)
            .optional()?)
    }

    fn create_disease(&self, disease: &NewDisease) -> Result<Disease> {
        let conn = self.conn();
        conn.execute("INSERT INTO Disease (name) VALUES (?1)", params![disease.name])?;
        Ok(Disease {
            id: conn.last_insert_rowid() as u32,
            name: disease.name.clone(),
        })
    }

    fn update_disease(&self, id: u32, disease: &NewDisease) -> Result<Option<Disease>> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE Disease SET name = ?1 WHERE id = ?2",
            params![disease.name, id],
        )?;
        Ok((changed > 0).then(|| Disease {
            id,
            name: disease.name.clone(),
        }))
    }

    fn delete_disease(&self, id: u32) -> Result<bool> {
        let conn = self.conn();
        Ok(conn.execute("DELETE FROM Disease WHERE id = ?1", params![id])? > 0)
    }

    fn list_localizations(&self) -> Result<Vec<Localization>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare_cached("SELECT id, country, continent FROM Localization ORDER BY id")?;
        let rows = stmt.query_map([], localization_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_localization(&self, id: u32) -> Result<Option<Localization>> {
        let conn = self.conn();
        Ok(conn
            .query_row(
                "SELECT id, country, continent FROM Localization WHERE id = ?1",
                params![id],
                localization_from_row,
            )
            .optional()?)
    }

    fn create_localization(&self, localization: &NewLocalization) -> Result<Localization> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO Localization (country, continent) VALUES (?1, ?2)",
            params![localization.country, localization.continent],
        )?;
        Ok(Localization {
            id: conn.last_insert_rowid() as u32,
            country: localization.country.clone(),
            continent: localization.continent.clone(),
        })
    }

    fn update_localization(
        &self,
        id: u32,
        localization: &NewLocalization,
    ) -> Result<Option<Localization>> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE Localization SET country = ?1, continent = ?2 WHERE id = ?3",
            params![localization.country, localization.continent, id],
        )?;
        Ok((changed > 0).then(|| Localization {
            id,
            country: localization.country.clone(),
            continent: localization.continent.clone(),
        }))
    }

    fn delete_localization(&self, id: u32) -> Result<bool> {
        let conn = self.conn();
        Ok(conn.execute("DELETE FROM Localization WHERE id = ?1", params![id])? > 0)
    }

    fn list_report_cases(&self) -> Result<Vec<ReportCaseRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {REPORT_CASE_COLUMNS} FROM ReportCase ORDER BY id"
        ))?;
        let rows = stmt.query_map([], report_case_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_report_case(&self, id: i64) -> Result<Option<ReportCaseRecord>> {
        let conn = self.conn();
        Ok(conn
            .query_row(
                &format!("SELECT {REPORT_CASE_COLUMNS} FROM ReportCase WHERE id = ?1"),
                params![id],
                report_case_from_row,
            )
            .optional()?)
    }

    fn create_report_case(&self, case: &ReportCase) -> Result<ReportCaseRecord> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO ReportCase (totalConfirmed, totalDeath, totalActive, localizationId, dateInfo, diseaseId)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                case.total_confirmed,
                case.total_death,
                case.total_active,
                case.localization_id,
                case.date_info.format(DATE_FORMAT).to_string(),
                case.disease_id,
            ],
        )?;
        Ok(ReportCaseRecord {
            id: conn.last_insert_rowid(),
            case: case.clone(),
        })
    }

    fn update_report_case(&self, id: i64, case: &ReportCase) -> Result<Option<ReportCaseRecord>> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE ReportCase
             SET totalConfirmed = ?1, totalDeath = ?2, totalActive = ?3,
                 localizationId = ?4, dateInfo = ?5, diseaseId = ?6
             WHERE id = ?7",
            params![
                case.total_confirmed,
                case.total_death,
                case.total_active,
                case.localization_id,
                case.date_info.format(DATE_FORMAT).to_string(),
                case.disease_id,
                id,
            ],
        )?;
        Ok((changed > 0).then(|| ReportCaseRecord {
            id,
            case: case.clone(),
        }))
    }

    fn delete_report_case(&self, id: i64) -> Result<bool> {
        let conn = self.conn();
        Ok(conn.execute("DELETE FROM ReportCase WHERE id = ?1", params![id])? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;

    fn store() -> SqliteStore {
        SqliteStore::from_connection(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn case(localization_id: u32, disease_id: u32) -> ReportCase {
        ReportCase {
            total_confirmed: 10.0,
            total_death: 1.0,
            total_active: None,
            localization_id,
            date_info: NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(),
            disease_id,
        }
    }

    fn seeded() -> SqliteStore {
        let store = store();
        store.create_disease(&NewDisease { name: "Coronavirus".to_string() }).unwrap();
        store
            .create_localization(&NewLocalization {
                country: "UK".to_string(),
                continent: "Europe".to_string(),
            })
            .unwrap();
        store
    }

    #[test]
    fn test_disease_lifecycle() {
        let store = store();
        let created = store.create_disease(&NewDisease { name: "Measles".to_string() }).unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(store.get_disease(1).unwrap(), Some(created));

        let renamed = store
            .update_disease(1, &NewDisease { name: "Rubeola".to_string() })
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Rubeola");
        assert_eq!(store.list_diseases().unwrap(), vec![renamed]);

        assert!(store.delete_disease(1).unwrap());
        assert!(!store.delete_disease(1).unwrap());
        assert_eq!(store.get_disease(1).unwrap(), None);
    }

    #[test]
    fn test_unknown_ids_are_not_errors() {
        let store = store();
        assert_eq!(store.get_localization(42).unwrap(), None);
        assert_eq!(store.get_report_case(42).unwrap(), None);
        let update = NewLocalization {
            country: "France".to_string(),
            continent: "Europe".to_string(),
        };
        assert_eq!(store.update_localization(42, &update).unwrap(), None);
        assert_eq!(store.update_report_case(42, &case(1, 1)).unwrap(), None);
    }

    #[test]
    fn test_report_case_round_trips_through_the_table() {
        let store = seeded();
        let created = store.create_report_case(&case(1, 1)).unwrap();
        let fetched = store.get_report_case(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.case.total_active, None);

        let mut changed = case(1, 1);
        changed.total_active = Some(4.0);
        let updated = store.update_report_case(created.id, &changed).unwrap().unwrap();
        assert_eq!(store.list_report_cases().unwrap(), vec![updated]);
    }

    #[test]
    fn test_foreign_keys_are_enforced() {
        let store = seeded();
        let err = store.create_report_case(&case(99, 1)).unwrap_err();
        assert!(matches!(err, EtlError::Sink(_)));

        store.create_report_case(&case(1, 1)).unwrap();
        assert!(store.delete_disease(1).is_err());
        assert!(store.get_disease(1).unwrap().is_some());
    }
}
