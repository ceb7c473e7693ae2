use clap::Parser;
use std::path::PathBuf;

mod commands;
mod engine;

use commands::Commands;

#[derive(Parser)]
#[command(name = "txgate")]
#[command(about = "Transaction dispatch engine with embedded authorization", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to $TXGATE_CONFIG, then ./txgate.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = cli.command.execute(cli.config).await?;
    std::process::exit(exit_code);
}
