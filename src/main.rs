//! `gnss-exporter` binary: load stations, supervise them, serve `/metrics`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gnss_exporter::supervisor::SupervisorOptions;
use gnss_exporter::{Config, PrometheusSink, SupervisorSet, TcpConnector, server};

#[derive(Debug, Parser)]
#[command(name = "gnss-exporter", version, about = "Export GNSS receiver health as metrics")]
struct Args {
    /// Path to the YAML station configuration
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let sink = Arc::new(PrometheusSink::new().context("creating metrics registry")?);
    let options = SupervisorOptions { sync: config.stream.sync_options(), ..Default::default() };
    let supervisors =
        SupervisorSet::spawn(&config.stations, Arc::new(TcpConnector), sink.clone(), options);

    let listener = server::bind(config.server.port)
        .await
        .with_context(|| format!("binding metrics port {}", config.server.port))?;
    let cancel = supervisors.cancellation_token();
    let endpoint = tokio::spawn(server::serve(listener, sink, cancel.clone()));

    info!("GNSS exporter running for {} stations", supervisors.len());
    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;

    info!("Shutting down");
    supervisors.shutdown().await;
    endpoint.await.context("metrics endpoint task")?;
    Ok(())
}
