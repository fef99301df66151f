// ETL pipeline: ingestion, processing, and storage

pub mod ingestion;
pub mod orchestrator;
pub mod processing;
pub mod storage;

pub use ingestion::Sources;
pub use orchestrator::{EtlOutput, Pipeline, PipelineResult, WriteCounts};
