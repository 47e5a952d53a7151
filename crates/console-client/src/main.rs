//! console-client binary
//!
//! Runs the sample flow once and prints the outcome. Exits non-zero unless
//! the protected call succeeded.

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use console_client::report::{self, Style};
use console_client::{ApiClient, ClientConfig, TokenClient, run_sample};

#[derive(Parser, Debug)]
#[command(name = "console-client")]
#[command(about = "Log in with the password grant and call the sample API")]
struct Cli {
    /// Base URL of the identity server
    #[arg(long, default_value = "http://localhost:5000", env = "CONSOLE_AUTHORITY")]
    authority: String,

    /// Base URL of the sample API
    #[arg(long, default_value = "http://localhost:5001", env = "CONSOLE_API_URL")]
    api_url: String,

    #[arg(long, default_value = "console-client", env = "CONSOLE_CLIENT_ID")]
    client_id: String,

    #[arg(long, default_value = "console-client-secret", env = "CONSOLE_CLIENT_SECRET")]
    client_secret: String,

    /// Space-separated scopes to request
    #[arg(long, default_value = "api.read", env = "CONSOLE_SCOPE")]
    scope: String,

    #[arg(long, env = "CONSOLE_USERNAME")]
    username: String,

    #[arg(long, env = "CONSOLE_PASSWORD")]
    password: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10, env = "CONSOLE_TIMEOUT_SECS")]
    timeout_secs: u64,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Diagnostics go to stderr so stdout stays the report
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("console_client=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::new(
        &cli.authority,
        &cli.api_url,
        cli.client_id,
        cli.client_secret,
        cli.scope,
    )?;
    config.timeout = Duration::from_secs(cli.timeout_secs);

    let tokens = TokenClient::new(&config)?;
    let api = ApiClient::new(config.timeout)?;
    let outcome = run_sample(
        &tokens,
        &api,
        &config.protected_resource(),
        &cli.username,
        &cli.password,
    )
    .await;

    let stdout = io::stdout();
    let style = Style {
        color: !cli.no_color && stdout.is_terminal(),
    };
    report::render(&outcome, &mut stdout.lock(), style)?;

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
