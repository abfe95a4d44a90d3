//! logtriage
//!
//! Classifies log lines through a cost-ordered cascade: a regex rule table,
//! sentence-embedding similarity against trained centroids, and an LLM for
//! sources whose logs neither handles well.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use logtriage_classifiers::{build_router, BatchRunner, ClassificationRouter};
use logtriage_core::LogRecord;
use logtriage_telemetry::describe_metrics;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod config;
mod io;

use config::Overrides;

#[derive(Parser, Debug)]
#[command(name = "logtriage")]
#[command(about = "Tiered log classification", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Configuration file path [default: ./logtriage.yaml if present]
    #[arg(short, long, global = true, env = "LOGTRIAGE_CONFIG")]
    config: Option<PathBuf>,

    /// Minimum semantic similarity accepted
    #[arg(long, global = true)]
    semantic_threshold: Option<f32>,

    /// Remote LLM API base URL
    #[arg(long, global = true, env = "LOGTRIAGE_REMOTE_URL")]
    remote_url: Option<String>,

    /// Remote LLM model identifier
    #[arg(long, global = true, env = "LOGTRIAGE_REMOTE_MODEL")]
    remote_model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify every row of a CSV file
    Classify {
        /// Input CSV with `source` and `log_message` columns
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,

        /// Records classified concurrently
        #[arg(long)]
        concurrency: Option<usize>,

        /// Write Prometheus metrics here after the batch
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },

    /// Classify one record and print the result with its routing trace
    Route {
        #[arg(short, long)]
        source: String,

        #[arg(short, long)]
        message: String,
    },

    /// Validate configuration, load every routed tier, and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    let concurrency = match &cli.command {
        Command::Classify { concurrency, .. } => *concurrency,
        _ => None,
    };
    let overrides = Overrides {
        concurrency,
        semantic_threshold: cli.global.semantic_threshold,
        remote_base_url: cli.global.remote_url.clone(),
        remote_model: cli.global.remote_model.clone(),
    };

    let config = config::load(cli.global.config.as_deref(), &overrides)?;
    info!("Configuration loaded successfully");

    match cli.command {
        Command::Classify {
            input,
            output,
            metrics_out,
            ..
        } => {
            let metrics_handle = match &metrics_out {
                Some(_) => Some(init_metrics()?),
                None => None,
            };

            let router = Arc::new(build_router(&config)?);
            let mut runner = BatchRunner::new(router);
            if let Some(n) = config.batch.concurrency {
                runner = runner.with_concurrency(n);
            }

            let table = io::read_input(&input)?;
            info!(records = table.records.len(), input = ?input, "Input loaded");

            let report = runner.run_batch(table.records.clone()).await;
            io::write_output(&output, &table, &report.outcomes)?;

            let snapshot = runner.metrics().snapshot();
            info!(
                batch_id = %report.batch_id,
                output = ?output,
                classified = report.summary.classified,
                unclassified = report.summary.unclassified,
                failed = report.summary.failed,
                avg_tiers = snapshot.avg_tiers_per_record(),
                "Classification complete"
            );

            if let (Some(path), Some(handle)) = (metrics_out, metrics_handle) {
                std::fs::write(&path, handle.render())
                    .with_context(|| format!("Failed to write metrics to {:?}", path))?;
            }
        }

        Command::Route { source, message } => {
            let router = build_router(&config)?;
            print_route(&router, LogRecord::new(source, message)).await?;
        }

        Command::CheckConfig => {
            let router = build_router(&config)?;
            println!("Configuration OK; tiers: {}", router.tier_names().join(", "));
        }
    }

    Ok(())
}

async fn print_route(router: &ClassificationRouter, record: LogRecord) -> Result<()> {
    let (outcome, decision) = router.route_record(&record).await;
    let body = match outcome {
        Ok(result) => json!({ "result": result, "decision": decision }),
        Err(failure) => json!({ "failure": failure, "decision": decision }),
    };
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("logtriage=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("logtriage=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Install the Prometheus recorder and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    describe_metrics();
    Ok(handle)
}
