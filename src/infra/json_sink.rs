use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::ports::ReportSink;
use crate::error::Result;
use crate::types::{Disease, Localization, ReportCase};

/// Writes each record set as a pretty-printed JSON array in one directory
pub struct JsonSink {
    output_dir: PathBuf,
}

impl JsonSink {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}.json"))
    }

    fn persist<T: Serialize>(&self, name: &str, records: &[T]) -> Result<usize> {
        let filepath = self.file_path(name);
        let json_content = serde_json::to_string_pretty(records)?;
        fs::write(&filepath, json_content)?;
        info!("Saved {} {} to {}", records.len(), name, filepath.display());
        Ok(records.len())
    }
}

impl ReportSink for JsonSink {
    fn write_diseases(&mut self, diseases: &[Disease]) -> Result<usize> {
        self.persist("diseases", diseases)
    }

    fn write_localizations(&mut self, localizations: &[Localization]) -> Result<usize> {
        self.persist("localizations", localizations)
    }

    fn write_report_cases(&mut self, report_cases: &[ReportCase]) -> Result<usize> {
        self.persist("report_cases", report_cases)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn test_report_cases_use_schema_field_names() {
        let dir = tempdir().unwrap();
        let mut sink = JsonSink::new(dir.path().join("out")).unwrap();
        sink.write_report_cases(&[ReportCase {
            total_confirmed: 10.0,
            total_death: 1.0,
            total_active: Some(2.0),
            localization_id: 1,
            date_info: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            disease_id: 1,
        }])
        .unwrap();

        let content = fs::read_to_string(sink.file_path("report_cases")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value[0]["totalConfirmed"], 10.0);
        assert_eq!(value[0]["localizationId"], 1);
        assert_eq!(value[0]["dateInfo"], "2021-01-01");
        assert_eq!(value[0]["diseaseId"], 1);
    }
}
