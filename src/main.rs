use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use epi_etl::config::{Config, SinkKind};
use epi_etl::pipeline::storage::InMemorySink;
use epi_etl::{infra, logging, metrics, server, ActiveMeasurePolicy, Pipeline, PipelineResult};

#[derive(Parser)]
#[command(name = "epi_etl")]
#[command(about = "Load COVID-19 and Monkeypox case series into Disease/Localization/ReportCase")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $EPI_ETL_CONFIG, then ./etl.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read, transform and load all three record sets into the sink
    Run {
        #[command(flatten)]
        transform: TransformArgs,

        /// Sink kind, overrides [sink].kind
        #[arg(long, value_enum)]
        sink: Option<SinkKind>,

        /// Database file or output directory, overrides [sink].path
        #[arg(long)]
        sink_path: Option<PathBuf>,

        /// Keep the result in memory instead of writing to the sink
        #[arg(long)]
        dry_run: bool,
    },
    /// Read and transform the sources, print the summary, write nothing
    Check {
        #[command(flatten)]
        transform: TransformArgs,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Serve the loaded tables over HTTP (/api/diseases, /api/localizations, /api/reportcases)
    Serve {
        /// SQLite database, overrides [sink].path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Address to bind, overrides [server].host
        #[arg(long)]
        host: Option<IpAddr>,

        /// Port to listen on, overrides [server].port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args)]
struct TransformArgs {
    /// COVID-19 case series CSV
    #[arg(long)]
    corona: Option<PathBuf>,

    /// Monkeypox case series CSV
    #[arg(long)]
    monkeypox: Option<PathBuf>,

    /// Country/continent reference CSV
    #[arg(long)]
    localization: Option<PathBuf>,

    /// Whether rows without an active-case measure are kept
    #[arg(long, value_enum)]
    active_measure: Option<ActiveMeasurePolicy>,
}

impl TransformArgs {
    fn apply(self, config: &mut Config) {
        if let Some(path) = self.corona {
            config.sources.corona = path;
        }
        if let Some(path) = self.monkeypox {
            config.sources.monkeypox = path;
        }
        if let Some(path) = self.localization {
            config.sources.localization = path;
        }
        if let Some(policy) = self.active_measure {
            config.validation.active_measure = policy;
        }
    }
}

fn print_summary(result: &PipelineResult) {
    println!("\n📊 ETL Results:");
    println!(
        "   Read: {} corona, {} monkeypox, {} localization rows",
        result.sources.corona, result.sources.monkeypox, result.sources.localization
    );
    println!("   OWID aggregates excluded: {}", result.unify.owid_filtered);
    println!("   Unmatched locations: {}", result.unify.unmatched());
    println!("   Report cases kept: {}", result.rows_kept);
    println!("   Rejected: {}", result.rejected_total());
    for (reason, count) in &result.rejected {
        println!("     - {reason}: {count}");
    }
    if let Some(sink) = result.sink {
        println!(
            "   Written to {sink}: {} diseases, {} localizations, {} report cases",
            result.written.diseases, result.written.localizations, result.written.report_cases
        );
    }
    println!("   Duration: {:.2}s", result.duration_secs);
}

async fn run(cli: Cli, mut config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run {
            transform,
            sink,
            sink_path,
            dry_run,
        } => {
            transform.apply(&mut config);
            if let Some(kind) = sink {
                config.sink.kind = kind;
            }
            if let Some(path) = sink_path {
                config.sink.path = path;
            }

            let pipeline = Pipeline::from_config(&config).context("Invalid reconciliation rules")?;

            let result = if dry_run {
                info!("Dry run: records stay in memory");
                let mut memory = InMemorySink::new();
                pipeline.run(&config.sources, &mut memory)?
            } else {
                match infra::open_sink(&config.sink).context("Failed to open sink")? {
                    Some(mut sink) => pipeline.run(&config.sources, &mut *sink)?,
                    None => pipeline.check(&config.sources)?,
                }
            };
            print_summary(&result);
        }
        Commands::Check { transform, json } => {
            transform.apply(&mut config);
            let pipeline = Pipeline::from_config(&config).context("Invalid reconciliation rules")?;
            let result = pipeline.check(&config.sources)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(&result);
            }
        }
        Commands::Serve { db, host, port } => {
            if let Some(path) = db {
                config.sink.path = path;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let store = infra::SqliteStore::open(&config.sink.path)
                .context("Failed to open SQLite database")?;
            server::start_server(Arc::new(store), config.server.socket_addr()).await?;
        }
    }

    if let Some(path) = &config.metrics.snapshot_path {
        metrics::write_snapshot(path).context("Failed to write metrics snapshot")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let _guard = logging::init_logging(&config.logging);
    metrics::init_metrics();

    if let Err(e) = run(cli, config).await {
        error!("ETL run failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}
