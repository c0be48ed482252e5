use anyhow::{anyhow, Context, Result};
use clap::Parser;
use gantry_core::{Lifecycle, RpcServer, ServerInfo, ToolRegistry};
use gantry_datadog::adapter::DatadogAdapter;
use gantry_datadog::config::DatadogConfig;
use gantry_datadog::tools;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Gantry Datadog tool server", long_about = None)]
struct Args {
    /// Log filter written to stderr; stdout carries protocol frames.
    #[arg(long, default_value = "info", env = "GANTRY_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = DatadogConfig::from_env().context("loading Datadog configuration")?;
    let adapter = Arc::new(
        DatadogAdapter::new(config).map_err(|e| anyhow!("building Datadog client: {}", e))?,
    );

    let mut registry = ToolRegistry::new();
    tools::register_tools(&mut registry, Arc::clone(&adapter))
        .context("registering Datadog tools")?;

    adapter
        .test_connectivity()
        .await
        .map_err(|e| anyhow!("connectivity probe failed: {}", e))?;
    tracing::info!("connectivity probe succeeded");

    let lifecycle = Arc::new(Lifecycle::new());
    Lifecycle::install_signal_handlers(&lifecycle);

    let server = RpcServer::new(
        ServerInfo {
            name: "gantry-datadog",
            version: env!("CARGO_PKG_VERSION"),
        },
        registry,
    );
    server.serve(&lifecycle).await?;

    lifecycle.shutdown().await;
    Ok(())
}
