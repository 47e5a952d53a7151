//! Sample API protected by bearer tokens from the identity server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use port_api::{ApiConfig, AppState, router};

#[derive(Parser, Debug)]
#[command(name = "port-api")]
#[command(about = "Bearer-protected sample API")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 5001, env = "API_PORT")]
    port: u16,

    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1", env = "API_BIND")]
    bind: String,

    /// Base URL of the identity server
    #[arg(long, default_value = "http://localhost:5000", env = "API_AUTHORITY")]
    authority: String,

    /// API resource name registered at the identity server
    #[arg(long, default_value = "port-api", env = "API_NAME")]
    api_name: String,

    /// API resource secret
    #[arg(long, default_value = "port-api-secret", env = "API_SECRET")]
    api_secret: String,

    /// Scope required by /helloworld
    #[arg(long, default_value = "api.read", env = "API_REQUIRED_SCOPE")]
    required_scope: String,

    /// Introspection request timeout in seconds
    #[arg(long, default_value_t = 10, env = "API_INTROSPECTION_TIMEOUT_SECS")]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("port_api=info,tower_http=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let mut config = ApiConfig::new(
        &cli.authority,
        cli.api_name,
        cli.api_secret,
        cli.required_scope,
    )?;
    config.timeout = Duration::from_secs(cli.timeout_secs);

    tracing::info!("Authority: {}", config.authority);
    tracing::info!("Required scope for /helloworld: {}", config.required_scope);

    let app = router(Arc::new(AppState::from_config(&config)?));

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    tracing::info!("Starting port-api on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    tracing::info!("port-api shut down");
    Ok(())
}
