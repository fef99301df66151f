use rusqlite::{params, Connection};
use std::path::Path;
use tracing::{debug, info};

use crate::app::ports::ReportSink;
use crate::config::SinkConfig;
use crate::constants::DATE_FORMAT;
use crate::error::{EtlError, Result};
use crate::types::{Disease, Localization, ReportCase};

pub(crate) const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS Disease (
        id    INTEGER PRIMARY KEY,
        name  TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS Localization (
        id         INTEGER PRIMARY KEY,
        country    TEXT NOT NULL,
        continent  TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS ReportCase (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        totalConfirmed  REAL NOT NULL,
        totalDeath      REAL NOT NULL,
        totalActive     REAL,
        localizationId  INTEGER NOT NULL REFERENCES Localization(id),
        dateInfo        TEXT NOT NULL,
        diseaseId       INTEGER NOT NULL REFERENCES Disease(id)
    );
"#;

pub(crate) const TABLES: &[&str] = &["Disease", "Localization", "ReportCase"];

/// Enable foreign keys, then either create the schema or insist it exists
pub(crate) fn prepare_schema(conn: &Connection, create_schema: bool) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    if create_schema {
        conn.execute_batch(SCHEMA)?;
        return Ok(());
    }
    for &table in TABLES {
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(EtlError::Config(format!(
                "table {table} does not exist and create_schema is disabled"
            )));
        }
    }
    Ok(())
}

/// SQLite-backed sink. One transaction per record set.
///
/// Existing rows are only cleared in `begin_load`, which the pipeline calls
/// after every source has been read.
pub struct SqliteSink {
    conn: Connection,
    truncate_before_load: bool,
}

impl SqliteSink {
    pub fn open(config: &SinkConfig) -> Result<Self> {
        let db_path = config.path.as_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        let sink = Self::from_connection(conn, config.create_schema, config.truncate_before_load)?;
        info!("Opened SQLite sink at {}", db_path.display());
        Ok(sink)
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(&SinkConfig {
            path: path.as_ref().to_path_buf(),
            ..SinkConfig::default()
        })
    }

    pub fn from_connection(conn: Connection, create_schema: bool, truncate: bool) -> Result<Self> {
        prepare_schema(&conn, create_schema)?;
        Ok(Self {
            conn,
            truncate_before_load: truncate,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn count_rows(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl ReportSink for SqliteSink {
    fn begin_load(&mut self) -> Result<()> {
        if self.truncate_before_load {
            // children first so foreign keys hold
            self.conn.execute_batch(
                r#"
                BEGIN;
                DELETE FROM ReportCase;
                DELETE FROM Localization;
                DELETE FROM Disease;
                COMMIT;
                "#,
            )?;
            debug!("Truncated Disease, Localization and ReportCase");
        }
        Ok(())
    }

    fn write_diseases(&mut self, diseases: &[Disease]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached("INSERT INTO Disease (id, name) VALUES (?1, ?2)")?;
            for disease in diseases {
                stmt.execute(params![disease.id, disease.name])?;
            }
        }
        tx.commit()?;
        Ok(diseases.len())
    }

    fn write_localizations(&mut self, localizations: &[Localization]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO Localization (id, country, continent) VALUES (?1, ?2, ?3)",
            )?;
            for loc in localizations {
                stmt.execute(params![loc.id, loc.country, loc.continent])?;
            }
        }
        tx.commit()?;
        Ok(localizations.len())
    }

    fn write_report_cases(&mut self, report_cases: &[ReportCase]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO ReportCase (totalConfirmed, totalDeath, totalActive, localizationId, dateInfo, diseaseId)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for case in report_cases {
                stmt.execute(params![
                    case.total_confirmed,
                    case.total_death,
                    case.total_active,
                    case.localization_id,
                    case.date_info.format(DATE_FORMAT).to_string(),
                    case.disease_id,
                ])?;
            }
        }
        tx.commit()?;
        Ok(report_cases.len())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
