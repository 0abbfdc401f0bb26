//! Copy a ledger between storage backends, e.g. a legacy JSON wallet file
//! into RocksDB.

use botarcade::{
    config::{StorageBackend, StorageConfig},
    storage::open_store,
    ArcadeResult,
};
use clap::Parser;

#[derive(Parser)]
#[command(name = "migrate_ledger")]
struct Cli {
    #[arg(long, default_value = "json")]
    from_backend: StorageBackend,
    #[arg(long)]
    from: String,
    #[arg(long, default_value = "rocksdb")]
    to_backend: StorageBackend,
    #[arg(long)]
    to: String,
}

fn main() -> ArcadeResult<()> {
    let cli = Cli::parse();

    let source = open_store(&StorageConfig {
        backend: cli.from_backend,
        path: cli.from,
    })?;
    let target = open_store(&StorageConfig {
        backend: cli.to_backend,
        path: cli.to,
    })?;

    let snapshot = source.load()?;
    target.commit(&snapshot.to_changes())?;

    println!(
        "Copied {} wallets and {} escrows from {} to {}",
        snapshot.wallets.len(),
        snapshot.escrows.len(),
        source.describe(),
        target.describe()
    );
    Ok(())
}
