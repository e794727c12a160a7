//! Standalone MediaROM server
//!
//! Serves the built-in element classes over the TCP transport. Ctrl-C
//! triggers a graceful shutdown that releases every live object.

mod config;

use mediarom_core::server::RomServer;
use mediarom_tcp::RomTcpServer;

use config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load()?;
    tracing::info!(bind = %config.bind_addr, "starting mediarom server");

    let server = RomServer::with_default_classes();
    let tcp = RomTcpServer::bind_with(&config.bind_addr, server, config.max_frame_bytes).await?;

    let shutdown = tcp.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
            let _ = shutdown.send(());
        }
    });

    tcp.serve().await?;
    Ok(())
}
