use anyhow::{Error, Result, anyhow};
use clap::{Parser, Subcommand};
use mailer::{api::run_api_server, config::Config, worker::run_consumer};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "mailer", about = "Queues and sends templated emails")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API that validates and queues send requests
    Serve,
    /// Consume queued send requests and deliver them over SMTP
    Consume,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Command::Serve => run_api_server(config).await,
        Command::Consume => run_consumer(config).await,
    }
}
