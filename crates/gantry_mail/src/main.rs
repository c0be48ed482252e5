use anyhow::{anyhow, Context, Result};
use clap::Parser;
use gantry_core::{Lifecycle, RpcServer, ServerInfo, ToolRegistry};
use gantry_mail::adapter::MailAdapter;
use gantry_mail::config::MailConfig;
use gantry_mail::tools;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Gantry mailbox tool server", long_about = None)]
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

    let config = MailConfig::from_env().context("loading mail configuration")?;
    let adapter =
        Arc::new(MailAdapter::new(config).map_err(|e| anyhow!("building mail client: {}", e))?);

    let mut registry = ToolRegistry::new();
    tools::register_tools(&mut registry, Arc::clone(&adapter))
        .context("registering mail tools")?;

    adapter
        .test_connectivity()
        .await
        .map_err(|e| anyhow!("connectivity probe failed: {}", e))?;
    tracing::info!("connectivity probe succeeded");

    let lifecycle = Arc::new(Lifecycle::new());
    Lifecycle::install_signal_handlers(&lifecycle);

    let server = RpcServer::new(
        ServerInfo {
            name: "gantry-mail",
            version: env!("CARGO_PKG_VERSION"),
        },
        registry,
    );
    server.serve(&lifecycle).await?;

    lifecycle.shutdown().await;
    Ok(())
}
