use crate::constants::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use crate::error::{EtlError, Result};
use crate::pipeline::processing::normalize::CountryRule;
use crate::pipeline::processing::quality_gate::ActiveMeasurePolicy;
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub sink: SinkConfig,
    pub validation: ValidationConfig,
    pub reconciliation: ReconciliationConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub corona: PathBuf,
    pub monkeypox: PathBuf,
    pub localization: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            corona: PathBuf::from("data/corona.csv"),
            monkeypox: PathBuf::from("data/variole.csv"),
            localization: PathBuf::from("data/localisation.csv"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Sqlite,
    Json,
    None,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    /// Database file for `sqlite`, output directory for `json`
    pub path: PathBuf,
    pub create_schema: bool,
    /// Disease ids are fixed, so reloading into a populated database needs this
    pub truncate_before_load: bool,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Sqlite,
            path: PathBuf::from("output/epi.db"),
            create_schema: true,
            truncate_before_load: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub active_measure: ActiveMeasurePolicy,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Evaluated after the built-in rules, in listed order
    pub extra_rules: Vec<CountryRule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
    pub json_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_prefix: "epi_etl.log".to_string(),
            json_file: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus text snapshot written when the run finishes
    pub snapshot_path: Option<PathBuf>,
}

/// HTTP API over the SQLite database at `[sink].path`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve the config file: explicit path, then `EPI_ETL_CONFIG`, then `etl.toml`.
    /// Only an explicitly requested file has to exist; otherwise defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Self::load_from(Path::new(&path));
            }
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            Self::load_from(default_path)
        } else {
            info!("No {} found, using default configuration", DEFAULT_CONFIG_PATH);
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.sources.corona, PathBuf::from("data/corona.csv"));
        assert_eq!(config.sink.kind, SinkKind::Sqlite);
        assert!(config.sink.truncate_before_load);
        assert_eq!(config.validation.active_measure, ActiveMeasurePolicy::Optional);
        assert!(config.reconciliation.extra_rules.is_empty());
        assert!(config.metrics.snapshot_path.is_none());
        assert_eq!(config.server.socket_addr().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_full_config_parses() {
        let config = Config::from_toml_str(
            r#"
            [sources]
            corona = "in/a.csv"
            monkeypox = "in/b.csv"
            localization = "in/loc.csv"

            [sink]
            kind = "json"
            path = "out"
            truncate_before_load = false

            [validation]
            active_measure = "required"

            [[reconciliation.extra_rules]]
            pattern = "Türkiye"
            replacement = "Turkey"

            [metrics]
            snapshot_path = "out/metrics.prom"

            [server]
            host = "0.0.0.0"
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.monkeypox, PathBuf::from("in/b.csv"));
        assert_eq!(config.sink.kind, SinkKind::Json);
        assert!(config.sink.create_schema);
        assert!(!config.sink.truncate_before_load);
        assert_eq!(config.validation.active_measure, ActiveMeasurePolicy::Required);
        assert_eq!(config.reconciliation.extra_rules.len(), 1);
        assert_eq!(config.reconciliation.extra_rules[0].replacement, "Turkey");
        assert_eq!(
            config.metrics.snapshot_path.as_deref(),
            Some(Path::new("out/metrics.prom"))
        );
        assert_eq!(config.server.socket_addr().to_string(), "0.0.0.0:9000");
    }

    #[test]
    fn test_unknown_sink_kind_is_rejected() {
        let result = Config::from_toml_str("[sink]\nkind = \"mysql\"\n");
        assert!(matches!(result, Err(EtlError::Toml(_))));
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let result = Config::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(EtlError::Config(_))));
    }
}
