pub mod json_sink;
pub mod sqlite_sink;
pub mod sqlite_store;

pub use json_sink::JsonSink;
pub use sqlite_sink::SqliteSink;
pub use sqlite_store::SqliteStore;

use crate::app::ports::ReportSink;
use crate::config::{SinkConfig, SinkKind};
use crate::error::Result;

/// Build the sink named by the config. `SinkKind::None` yields no sink.
pub fn open_sink(config: &SinkConfig) -> Result<Option<Box<dyn ReportSink>>> {
    let sink: Box<dyn ReportSink> = match config.kind {
        SinkKind::Sqlite => Box::new(SqliteSink::open(config)?),
        SinkKind::Json => Box::new(JsonSink::new(&config.path)?),
        SinkKind::None => return Ok(None),
    };
    Ok(Some(sink))
}
