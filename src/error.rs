use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Failed to read {source_name} source '{}': {reason}", path.display())]
    SourceRead {
        source_name: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("{source_name} source is missing required column '{column}'")]
    MissingColumn {
        source_name: &'static str,
        column: &'static str,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid reconciliation rule: {0}")]
    InvalidRule(String),

    #[error("Sink write failed: {0}")]
    Sink(#[from] rusqlite::Error),

    #[error("HTTP server error: {0}")]
    Server(#[from] hyper::Error),
}

impl EtlError {
    /// True for failures that happen before anything reaches the sink.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            EtlError::SourceRead { .. } | EtlError::MissingColumn { .. } | EtlError::Csv(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
