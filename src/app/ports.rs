use crate::error::Result;
use crate::types::{
    Disease, Localization, NewDisease, NewLocalization, ReportCase, ReportCaseRecord,
};

/// Relational sink for the three finished record sets.
///
/// The pipeline calls `begin_load` once, after every source has been read,
/// then the writers in foreign-key order: diseases, localizations, report
/// cases. Each writer returns the number of rows written.
pub trait ReportSink {
    /// Prepare the target for a fresh load (e.g. clear previous rows)
    fn begin_load(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_diseases(&mut self, diseases: &[Disease]) -> Result<usize>;
    fn write_localizations(&mut self, localizations: &[Localization]) -> Result<usize>;
    fn write_report_cases(&mut self, report_cases: &[ReportCase]) -> Result<usize>;

    /// Short name for logs and metric labels
    fn name(&self) -> &'static str;
}

/// Record-level access to the loaded tables, used by the HTTP API.
///
/// `get_*` and `update_*` return `None` and `delete_*` returns `false`
/// when no row has the given id.
pub trait ReportStore: Send + Sync {
    fn list_diseases(&self) -> Result<Vec<Disease>>;
    fn get_disease(&self, id: u32) -> Result<Option<Disease>>;
    fn create_disease(&self, disease: &NewDisease) -> Result<Disease>;
    fn update_disease(&self, id: u32, disease: &NewDisease) -> Result<Option<Disease>>;
    fn delete_disease(&self, id: u32) -> Result<bool>;

    fn list_localizations(&self) -> Result<Vec<Localization>>;
    fn get_localization(&self, id: u32) -> Result<Option<Localization>>;
    fn create_localization(&self, localization: &NewLocalization) -> Result<Localization>;
    fn update_localization(
        &self,
        id: u32,
        localization: &NewLocalization,
    ) -> Result<Option<Localization>>;
    fn delete_localization(&self, id: u32) -> Result<bool>;

    fn list_report_cases(&self) -> Result<Vec<ReportCaseRecord>>;
    fn get_report_case(&self, id: i64) -> Result<Option<ReportCaseRecord>>;
    fn create_report_case(&self, case: &ReportCase) -> Result<ReportCaseRecord>;
    fn update_report_case(&self, id: i64, case: &ReportCase) -> Result<Option<ReportCaseRecord>>;
    fn delete_report_case(&self, id: i64) -> Result<bool>;
}
