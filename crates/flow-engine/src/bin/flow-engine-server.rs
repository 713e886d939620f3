//! Flow engine server binary.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dialplane_flow_engine::config::FlowEngineConfig;
use dialplane_flow_engine::server::FlowEngineServerBuilder;

#[derive(Parser, Debug)]
#[command(name = "flow-engine-server", about = "Dialplane call-flow routing engine")]
struct Args {
    /// Address to serve the webhook API on
    #[arg(long, default_value = "127.0.0.1:8085")]
    bind: String,

    /// SQLite database URL, e.g. sqlite://flow-engine.db?mode=rwc
    #[arg(long)]
    database_url: Option<String>,

    /// Use an ephemeral in-memory database
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,dialplane_flow_engine=debug")),
        )
        .init();

    let args = Args::parse();

    let mut config = FlowEngineConfig::default();
    config.general.bind_address = args.bind;
    if let Some(url) = args.database_url {
        config.database.database_url = url;
    }

    let mut builder = FlowEngineServerBuilder::new().with_config(config);
    if args.in_memory {
        builder = builder.with_in_memory_database();
    }

    let mut server = builder.build().await?;
    server.start();

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }
    server.stop();

    Ok(())
}
