#![doc = include_str!("../README.md")]

mod args;
mod client;
mod error;
mod input;

use args::{CliArgs, ClientConfig};
use clap::Parser;
use client::DaemonClient;
use error::CliError;
use input::read_source_lines;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::try_from(args)?;
    run(&config).await?;
    Ok(())
}

async fn run(config: &ClientConfig) -> Result<(), CliError> {
    let lines = read_source_lines(&config.file).await?;
    for line in &lines {
        println!("{line}");
    }

    let mut client = DaemonClient::connect(&config.daemon_addr, config.connect_timeout).await?;
    client.check_alive().await?;

    let submitted = client.submit(lines, config.language).await?;
    tracing::info!("Submitted {submitted} lines for translation into {}", config.language);

    let collected = client
        .wait_for_results(submitted, config.wait_timeout, config.poll_interval)
        .await?;
    for line in &collected.lines {
        println!("{line}");
    }

    if !collected.is_complete() {
        return Err(CliError::WaitTimeout {
            received: collected.lines.len(),
            expected: collected.expected,
            waited_secs: config.wait_timeout.as_secs(),
        });
    }
    Ok(())
}
