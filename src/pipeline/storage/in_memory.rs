use crate::app::ports::ReportSink;
use crate::error::Result;
use crate::types::{Disease, Localization, ReportCase};
use tracing::debug;

/// In-memory sink for dry runs and testing
#[derive(Debug, Default)]
pub struct InMemorySink {
    pub diseases: Vec<Disease>,
    pub localizations: Vec<Localization>,
    pub report_cases: Vec<ReportCase>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportSink for InMemorySink {
    fn write_diseases(&mut self, diseases: &[Disease]) -> Result<usize> {
        self.diseases.extend_from_slice(diseases);
        debug!("Held {} diseases in memory", diseases.len());
        Ok(diseases.len())
    }

    fn write_localizations(&mut self, localizations: &[Localization]) -> Result<usize> {
        self.localizations.extend_from_slice(localizations);
        debug!("Held {} localizations in memory", localizations.len());
        Ok(localizations.len())
    }

    fn write_report_cases(&mut self, report_cases: &[ReportCase]) -> Result<usize> {
        self.report_cases.extend_from_slice(report_cases);
        debug!("Held {} report cases in memory", report_cases.len());
        Ok(report_cases.len())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
