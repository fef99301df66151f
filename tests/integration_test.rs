use anyhow::Result;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

use epi_etl::config::{SinkConfig, SinkKind, SourcesConfig};
use epi_etl::infra::{self, SqliteSink};
use epi_etl::pipeline::storage::InMemorySink;
use epi_etl::{ActiveMeasurePolicy, EtlError, Pipeline, RuleTable};

const CORONA_HEADER: &str =
    "country,date,cumulative_total_cases,cumulative_total_deaths,active_cases";
const MONKEYPOX_HEADER: &str = "iso_code,location,date,total_cases,total_deaths";
const LOCALIZATION_HEADER: &str = "country,continent";

struct Fixture {
    dir: TempDir,
    sources: SourcesConfig,
}

fn write_csv(path: &Path, header: &str, rows: &[&str]) {
    let mut content = String::from(header);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(path, content).unwrap();
}

fn fixture(corona: &[&str], monkeypox: &[&str], localization: &[&str]) -> Fixture {
    let dir = tempdir().unwrap();
    let sources = SourcesConfig {
        corona: dir.path().join("corona.csv"),
        monkeypox: dir.path().join("variole.csv"),
        localization: dir.path().join("localisation.csv"),
    };
    write_csv(&sources.corona, CORONA_HEADER, corona);
    write_csv(&sources.monkeypox, MONKEYPOX_HEADER, monkeypox);
    write_csv(&sources.localization, LOCALIZATION_HEADER, localization);
    Fixture { dir, sources }
}

#[test]
fn test_single_corona_row_end_to_end() -> Result<()> {
    let fx = fixture(&["UK,2021-01-01,10,1,2"], &[], &["UK,Europe"]);
    let mut sink = InMemorySink::new();

    let result = Pipeline::default().run(&fx.sources, &mut sink)?;

    assert_eq!(result.rows_kept, 1);
    assert_eq!(sink.report_cases.len(), 1);
    let case = &sink.report_cases[0];
    assert_eq!(case.total_confirmed, 10.0);
    assert_eq!(case.total_death, 1.0);
    assert_eq!(case.total_active, Some(2.0));
    assert_eq!(case.localization_id, 1);
    assert_eq!(case.date_info, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
    assert_eq!(case.disease_id, 1);

    assert_eq!(sink.diseases.len(), 2);
    assert_eq!(sink.localizations.len(), 1);
    Ok(())
}

#[test]
fn test_reconciled_name_joins_canonical_country() -> Result<()> {
    let fx = fixture(&[], &["USA,United States,2022-07-01,100,0"], &["USA,North America"]);
    let mut sink = InMemorySink::new();

    Pipeline::default().run(&fx.sources, &mut sink)?;

    assert_eq!(sink.report_cases.len(), 1);
    assert_eq!(sink.report_cases[0].localization_id, 1);
    assert_eq!(sink.report_cases[0].disease_id, 2);
    assert_eq!(sink.report_cases[0].total_active, None);
    Ok(())
}

#[test]
fn test_unreconciled_reference_name_drops_the_row() -> Result<()> {
    let fx = fixture(
        &[],
        &["USA,United States,2022-07-01,100,0"],
        &["United States,North America"],
    );
    let mut sink = InMemorySink::new();

    let result = Pipeline::default().run(&fx.sources, &mut sink)?;

    assert!(sink.report_cases.is_empty());
    assert_eq!(result.unify.monkeypox_unmatched, 1);
    assert_eq!(result.rejected["missing localizationId"], 1);
    Ok(())
}

#[test]
fn test_owid_rows_are_excluded_regardless_of_location() -> Result<()> {
    let fx = fixture(
        &[],
        &[
            "OWID_EUR,Europe,2022-07-01,5000,3",
            "OWID_WRL,UK,2022-07-01,9000,5",
            "GBR,United Kingdom,2022-07-01,10,0",
        ],
        &["UK,Europe", "Europe,Europe"],
    );
    let mut sink = InMemorySink::new();

    let result = Pipeline::default().run(&fx.sources, &mut sink)?;

    assert_eq!(result.unify.owid_filtered, 2);
    assert_eq!(sink.report_cases.len(), 1);
    assert_eq!(sink.report_cases[0].total_confirmed, 10.0);
    Ok(())
}

#[test]
fn test_required_active_measure_empties_monkeypox_facts() -> Result<()> {
    let fx = fixture(
        &["UK,2021-01-01,10,1,2"],
        &["GBR,United Kingdom,2022-07-01,10,0", "FRA,France,2022-07-01,4,0"],
        &["UK,Europe", "France,Europe"],
    );

    let mut optional = InMemorySink::new();
    Pipeline::new(RuleTable::builtin(), ActiveMeasurePolicy::Optional)
        .run(&fx.sources, &mut optional)?;
    assert_eq!(optional.report_cases.len(), 3);

    let mut required = InMemorySink::new();
    let result = Pipeline::new(RuleTable::builtin(), ActiveMeasurePolicy::Required)
        .run(&fx.sources, &mut required)?;
    assert_eq!(required.report_cases.len(), 1);
    assert!(required.report_cases.iter().all(|c| c.disease_id == 1));
    assert_eq!(result.rejected["missing totalActive"], 2);
    Ok(())
}

#[test]
fn test_invalid_rows_are_dropped_never_clamped() -> Result<()> {
    let fx = fixture(
        &[
            "UK,2021-01-01,10,1,2",
            "UK,2021-01-02,-5,1,2",
            "UK,2021-01-03,10,1,-1",
            "UK,,10,1,2",
            "UK,2021-01-05,,1,2",
        ],
        &["GBR,United Kingdom,2022-07-01,3,-1"],
        &["UK,Europe"],
    );
    let mut sink = InMemorySink::new();

    let result = Pipeline::default().run(&fx.sources, &mut sink)?;

    assert_eq!(sink.report_cases.len(), 1);
    assert_eq!(sink.report_cases[0].date_info, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
    assert_eq!(result.rejected_total(), 5);
    assert_eq!(result.rejected["negative totalConfirmed"], 1);
    assert_eq!(result.rejected["negative totalActive"], 1);
    assert_eq!(result.rejected["negative totalDeath"], 1);
    assert_eq!(result.rejected["missing dateInfo"], 1);
    assert_eq!(result.rejected["missing totalConfirmed"], 1);
    Ok(())
}

#[test]
fn test_localization_ids_follow_reference_order() -> Result<()> {
    let fx = fixture(
        &["France,2021-01-01,1,0,1", "UK,2021-01-01,1,0,1"],
        &[],
        &["UK,Europe", "USA,North America", "France,Europe"],
    );
    let mut sink = InMemorySink::new();

    Pipeline::default().run(&fx.sources, &mut sink)?;

    let ids: Vec<u32> = sink.localizations.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    let joined: Vec<u32> = sink.report_cases.iter().map(|c| c.localization_id).collect();
    assert_eq!(joined, vec![3, 1]);
    Ok(())
}

#[test]
fn test_missing_source_aborts_before_any_write() {
    let fx = fixture(&["UK,2021-01-01,10,1,2"], &[], &["UK,Europe"]);
    fs::remove_file(&fx.sources.monkeypox).unwrap();
    let mut sink = InMemorySink::new();

    let err = Pipeline::default().run(&fx.sources, &mut sink).unwrap_err();

    assert!(err.is_source_error());
    assert!(sink.diseases.is_empty());
    assert!(sink.localizations.is_empty());
    assert!(sink.report_cases.is_empty());
}

#[test]
fn test_missing_reference_column_is_fatal() {
    let fx = fixture(&[], &[], &[]);
    fs::write(&fx.sources.localization, "country\nUK\n").unwrap();

    let err = Pipeline::default().check(&fx.sources).unwrap_err();

    assert!(matches!(
        err,
        EtlError::MissingColumn {
            column: "continent",
            ..
        }
    ));
}

#[test]
fn test_load_into_sqlite() -> Result<()> {
    let fx = fixture(
        &["UK,2021-01-01,10,1,2", "Atlantis,2021-01-01,1,0,0"],
        &[
            "OWID_EUR,Europe,2022-07-01,5000,3",
            "VNM,Vietnam,2022-07-01,2,0",
            "CZE,Czechia,2022-07-01,7,0",
        ],
        &["UK,Europe", "Viet Nam,Asia", "Czech Republic,Europe"],
    );
    let db_path = fx.dir.path().join("db").join("epi.db");
    let mut sink = SqliteSink::open(&SinkConfig {
        path: db_path.clone(),
        ..SinkConfig::default()
    })?;

    let result = Pipeline::default().run(&fx.sources, &mut sink)?;

    assert_eq!(result.written.diseases, 2);
    assert_eq!(result.written.localizations, 3);
    assert_eq!(result.written.report_cases, 3);
    assert_eq!(sink.count_rows("ReportCase")?, 3);

    let monkeypox_locations: Vec<String> = {
        let mut stmt = sink.connection().prepare(
            "SELECT l.country FROM ReportCase r JOIN Localization l ON l.id = r.localizationId
             WHERE r.diseaseId = 2 ORDER BY r.id",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let names = rows.collect::<std::result::Result<Vec<String>, _>>()?;
        names
    };
    assert_eq!(monkeypox_locations, vec!["Viet Nam", "Czech Republic"]);
    drop(sink);

    // a second load replaces the first one
    let mut again = SqliteSink::open(&SinkConfig {
        path: db_path,
        ..SinkConfig::default()
    })?;
    Pipeline::default().run(&fx.sources, &mut again)?;
    assert_eq!(again.count_rows("Disease")?, 2);
    assert_eq!(again.count_rows("ReportCase")?, 3);
    Ok(())
}

#[test]
fn test_failed_reload_keeps_previous_database() -> Result<()> {
    let fx = fixture(
        &["UK,2021-01-01,10,1,2", "France,2021-01-01,4,0,1"],
        &["GBR,United Kingdom,2022-07-01,3,0"],
        &["UK,Europe", "France,Europe"],
    );
    let sink_config = SinkConfig {
        kind: SinkKind::Sqlite,
        path: fx.dir.path().join("epi.db"),
        ..SinkConfig::default()
    };

    {
        let mut sink = infra::open_sink(&sink_config)?.expect("sqlite sink");
        Pipeline::default().run(&fx.sources, &mut *sink)?;
    }
    assert_eq!(SqliteSink::open(&sink_config)?.count_rows("ReportCase")?, 3);

    fs::remove_file(&fx.sources.monkeypox)?;
    {
        let mut sink = infra::open_sink(&sink_config)?.expect("sqlite sink");
        let err = Pipeline::default()
            .run(&fx.sources, &mut *sink)
            .unwrap_err();
        assert!(err.is_source_error());
    }

    let db = SqliteSink::open(&sink_config)?;
    assert_eq!(db.count_rows("Disease")?, 2);
    assert_eq!(db.count_rows("Localization")?, 2);
    assert_eq!(db.count_rows("ReportCase")?, 3);
    Ok(())
}
