//! identity-server binary
//!
//! Serves `/connect/token` (password grant), `/connect/introspect` for API
//! resources, `/connect/revocation` and the discovery document.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use identity_server::{AppState, Issuer, IssuerConfig, router};

#[derive(Parser, Debug)]
#[command(name = "identity-server")]
#[command(about = "In-memory OAuth2 token issuer")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 5000, env = "IDENTITY_PORT")]
    port: u16,

    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1", env = "IDENTITY_BIND")]
    bind: String,

    /// Path to config directory
    #[arg(long, default_value = "./config", env = "IDENTITY_CONFIG_PATH")]
    config_path: String,

    /// Public URL for this service (issuer identifier and discovery URLs)
    #[arg(long, default_value = "http://localhost:5000", env = "IDENTITY_PUBLIC_URL")]
    public_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("identity_server=info,tower_http=debug"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = IssuerConfig::load(&cli.config_path)?;
    let issuer = Issuer::from_config(&config, &cli.public_url)
        .context("Failed to build issuer from configuration")?;

    let state = Arc::new(AppState {
        issuer,
        public_url: cli.public_url.clone(),
    });

    spawn_token_sweeper(
        state.clone(),
        Duration::from_secs(config.tokens.cleanup_interval_secs.max(1)),
    );

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", cli.bind, cli.port))?;
    tracing::info!(
        "Starting identity-server on {} (issuer {})",
        addr,
        cli.public_url
    );

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Identity server shut down");
    Ok(())
}

/// Drop expired reference tokens every `period`
fn spawn_token_sweeper(state: Arc<AppState>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            state.issuer.cleanup_expired();
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
