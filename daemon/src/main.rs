//! Veriflow daemon: entry point for running verifications against live services.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use veriflow_engine::{init_logging, EngineConfig, LogFormat, ReportStatus, VerificationEngine};
use veriflow_integrations::Integrations;
use veriflow_store::MemoryStore;
use veriflow_types::{AdditionalData, SystemClock, VerificationType};

#[derive(Parser)]
#[command(name = "veriflow", about = "KYC/KYB verification engine")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "VERIFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Log output: "human" or "json".
    #[arg(long, env = "VERIFLOW_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level or filter directive, e.g. "info" or "debug,veriflow_engine=trace".
    #[arg(long, env = "VERIFLOW_LOG_LEVEL")]
    log_level: Option<String>,

    /// Top-level workflows that may run at once.
    #[arg(long, env = "VERIFLOW_WORKERS")]
    workers: Option<usize>,

    /// Per-agent time limit in milliseconds.
    #[arg(long, env = "VERIFLOW_AGENT_TIMEOUT_MS")]
    agent_timeout_ms: Option<u64>,

    /// Per-workflow time limit in milliseconds.
    #[arg(long, env = "VERIFLOW_WORKFLOW_TIMEOUT_MS")]
    workflow_timeout_ms: Option<u64>,

    /// Base URL of the subject data source.
    #[arg(long, env = "VERIFLOW_DATA_SOURCE_URL")]
    data_source_url: Option<String>,

    /// Base URL of the identity provider.
    #[arg(long, env = "VERIFLOW_IDENTITY_URL")]
    identity_url: Option<String>,

    /// Base URL of the fraud scorer.
    #[arg(long, env = "VERIFLOW_FRAUD_URL")]
    fraud_url: Option<String>,

    /// Base URL of the summary service. Without one, summaries are templated.
    #[arg(long, env = "VERIFLOW_SUMMARIZER_URL")]
    summarizer_url: Option<String>,

    /// Print Prometheus metrics to stderr before exiting.
    #[arg(long, env = "VERIFLOW_ENABLE_METRICS")]
    metrics: bool,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Verify one subject and print the outcome as JSON.
    Verify {
        /// "kyc" or "kyb".
        verification_type: VerificationType,

        /// Subject id handed to the data source.
        subject_id: String,

        /// Extra request data as key=value; values that parse as JSON are kept typed.
        #[arg(long = "data", value_parser = parse_data_pair)]
        data: Vec<(String, serde_json::Value)>,

        /// How often to poll for the outcome, in milliseconds.
        #[arg(long, default_value_t = 100)]
        poll_ms: u64,
    },

    /// Print the effective configuration as TOML.
    PrintConfig,
}

fn parse_data_pair(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn effective_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(workers) = cli.workers {
        config.worker_capacity = workers;
    }
    if let Some(ms) = cli.agent_timeout_ms {
        config.agent_timeout_ms = ms;
    }
    if let Some(ms) = cli.workflow_timeout_ms {
        config.workflow_timeout_ms = ms;
    }
    if let Some(url) = &cli.data_source_url {
        config.integrations.data_source_url = url.clone();
    }
    if let Some(url) = &cli.identity_url {
        config.integrations.identity_provider_url = url.clone();
    }
    if let Some(url) = &cli.fraud_url {
        config.integrations.fraud_scorer_url = url.clone();
    }
    if cli.summarizer_url.is_some() {
        config.integrations.summarizer_url = cli.summarizer_url.clone();
    }
    config.enable_metrics |= cli.metrics;

    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = effective_config(&cli)?;

    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level)?;

    match cli.command {
        Command::PrintConfig => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Verify {
            verification_type,
            subject_id,
            data,
            poll_ms,
        } => {
            let endpoints = &config.integrations;
            let integrations = Integrations::http(
                &endpoints.data_source_url,
                &endpoints.identity_provider_url,
                &endpoints.fraud_scorer_url,
                endpoints.summarizer_url.as_deref(),
                Duration::from_millis(endpoints.http_timeout_ms),
            );
            let print_metrics = config.enable_metrics;

            let engine = VerificationEngine::new(
                config,
                integrations,
                Arc::new(MemoryStore::new()),
                Arc::new(SystemClock),
            )?;
            engine.start().await?;

            let additional: AdditionalData = data.into_iter().collect();
            let id = engine
                .start_verification(verification_type, subject_id, additional)
                .await?;
            tracing::info!(verification_id = %id, "verification submitted");

            tokio::select! {
                settled = engine.wait_for_terminal(&id, Duration::from_millis(poll_ms)) => {
                    settled?;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupted, shutting down");
                }
            }
            engine.shutdown().await;

            let status = engine.get_report(&id)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            if print_metrics {
                eprintln!("{}", engine.metrics().encode()?);
            }
            if matches!(status, ReportStatus::Failed(_)) {
                std::process::exit(2);
            }
        }
    }

    Ok(())
}
