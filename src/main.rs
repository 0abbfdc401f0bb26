//! Arcade console binary
//!
//! Reads `<user> [#chat] /command` lines from stdin and prints the replies.

use botarcade::{
    config::ArcadeConfig,
    console::{Dispatcher, HELP},
    errors::ConfigurationError,
    logging::init_logging,
    ArcadeFactory, ArcadeResult, ConfigLoader,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// Botarcade CLI
#[derive(Parser)]
#[command(name = "arcade")]
#[command(about = "Credit wallet, betting games and checkers behind a chat-style console")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read commands from stdin (the default)
    Console,

    /// Print one user's balance and exit
    Balance {
        #[arg(short, long)]
        user: i64,
    },

    /// Print the effective configuration as TOML
    ShowConfig,
}

#[tokio::main]
async fn main() -> ArcadeResult<()> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_file(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;
    init_logging(&config.logging, cli.verbose);

    match cli.command.unwrap_or(Commands::Console) {
        Commands::Console => run_console(config).await,
        Commands::Balance { user } => {
            let arcade = ArcadeFactory::build(config)?;
            println!("{}", arcade.ledger.balance(user));
            Ok(())
        }
        Commands::ShowConfig => {
            let text = toml::to_string_pretty(&config)
                .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;
            print!("{}", text);
            Ok(())
        }
    }
}

async fn run_console(config: ArcadeConfig) -> ArcadeResult<()> {
    let arcade = ArcadeFactory::build(config)?;

    match arcade.betting.recover_orphaned_escrows() {
        Ok(refunds) if !refunds.is_empty() => info!(count = refunds.len(), "Refunded stranded stakes"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Could not refund stranded stakes"),
    }

    let dispatcher = Dispatcher::new(arcade);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match dispatcher.handle_line(&line) {
            None => continue,
            Some(Ok(reply)) => println!("{}", reply.trim_end()),
            Some(Err(e)) if e.kind().is_fatal() => {
                error!(error = %e, "Ledger could not persist, shutting down");
                println!("Error: {}", e);
                break;
            }
            Some(Err(e)) => println!("Error: {}", e),
        }
    }

    info!(
        wallets = %dispatcher.arcade().ledger.total_in_wallets(),
        escrowed = %dispatcher.arcade().ledger.total_in_escrow(),
        "Console closed"
    );
    Ok(())
}
