//! Ledger inspection binary
//!
//! Prints every wallet and open escrow held by the configured store.

use botarcade::{storage::open_store, ArcadeResult, ConfigLoader};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "inspect_ledger")]
#[command(about = "Dump wallets and open escrows from a ledger store")]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> ArcadeResult<()> {
    let cli = Cli::parse();
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_file(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;

    let store = open_store(&config.storage)?;
    let snapshot = store.load()?;
    println!("Store: {}", store.describe());

    println!("Wallets ({}):", snapshot.wallets.len());
    for (user, balance) in &snapshot.wallets {
        println!("  {:>12}  {}", user, balance);
    }

    println!("Open escrows ({}):", snapshot.escrows.len());
    for escrow in snapshot.escrows.values() {
        let participants: Vec<String> = escrow
            .participants
            .iter()
            .map(|(user, stake)| format!("{}={}", user, stake))
            .collect();
        println!(
            "  {}  creator {}  stake {}  pot {}  [{}]  opened {}",
            escrow.id,
            escrow.creator_id,
            escrow.stake,
            escrow.pot(),
            participants.join(", "),
            escrow.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    let wallets: u128 = snapshot.wallets.values().map(|b| u128::from(*b)).sum();
    let escrowed: u128 = snapshot.escrows.values().map(|e| u128::from(e.pot())).sum();
    println!("Total credits: {} in wallets, {} in escrow", wallets, escrowed);
    Ok(())
}
