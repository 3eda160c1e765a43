//! # guesswho
//!
//! Game event server binary: loads settings, starts the broker, the HTTP
//! server, and the Redis relay bridge, then waits for ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use guesswho_core::logging::{bootstrap_subscriber, init_subscriber};
use guesswho_server::broker::Broker;
use guesswho_server::config::{BrokerConfig, RelayConfig, ServerConfig};
use guesswho_server::game::GameStore;
use guesswho_server::metrics::install_recorder;
use guesswho_server::relay::{PubSubBridge, open_source};
use guesswho_server::server::GuesswhoServer;
use guesswho_settings::GuesswhoSettings;

/// Game event server.
#[derive(Parser, Debug)]
#[command(name = "guesswho", about = "Game event stream server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.guesswho/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    fn settings_path(&self) -> PathBuf {
        self.settings
            .clone()
            .unwrap_or_else(guesswho_settings::settings_path)
    }

    fn apply(&self, settings: &mut GuesswhoSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
    }
}

fn load(cli: &Cli) -> Result<GuesswhoSettings> {
    let path = cli.settings_path();
    let mut settings = guesswho_settings::load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    cli.apply(&mut settings);
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Loader warnings fire before the configured subscriber exists.
    let settings = tracing::subscriber::with_default(bootstrap_subscriber(), || load(&cli))?;
    init_subscriber(&settings.logging.level, settings.logging.format);
    run(settings).await
}

async fn run(settings: GuesswhoSettings) -> Result<()> {
    let metrics = match install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics disabled");
            None
        }
    };

    let (broker, broker_handle) = Broker::spawn(BrokerConfig::from(&settings.broker));
    let relay_address = settings.relay.address.as_deref();
    let source = open_source(relay_address).context("Bad relay address")?;

    let server = GuesswhoServer::new(
        ServerConfig::from(&settings.server),
        broker.clone(),
        Arc::new(GameStore::seeded()),
    );
    let bridge = PubSubBridge::new(
        source,
        RelayConfig::from(&settings.relay),
        broker,
        server.shutdown().token(),
    );
    let mut server = server.with_relay_status(bridge.status());
    if let Some(handle) = metrics {
        server = server.with_metrics(handle);
    }

    let bridge_handle = tokio::spawn(async move {
        let exit = bridge.run().await;
        tracing::info!(?exit, "relay bridge stopped");
    });

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("guesswho listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server
        .shutdown()
        .graceful_shutdown(
            vec![handle, bridge_handle, broker_handle],
            Some(Duration::from_secs(settings.server.shutdown_timeout_secs)),
        )
        .await;

    tracing::info!("Shutdown complete");
    Ok(())
}
