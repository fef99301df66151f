pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod infra;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod server;
pub mod types;

pub use error::{EtlError, Result};
pub use pipeline::processing::normalize::{reconcile, CountryRule, RuleTable};
pub use pipeline::processing::quality_gate::ActiveMeasurePolicy;
pub use pipeline::{Pipeline, PipelineResult, Sources};
