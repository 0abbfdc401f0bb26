//! Arcade initialization shared by the binaries and the integration tests
//!
//! Opens the configured store, loads the ledger and wires both engines to it.

use crate::{
    checkers::CheckersEngine,
    config::ArcadeConfig,
    errors::ArcadeResult,
    games::BettingEngine,
    random::{RandomSource, ThreadRandom},
    storage::{open_store, LedgerStore},
    wallet::Ledger,
};
use std::sync::Arc;
use tracing::info;

/// Everything a dispatcher needs to serve commands
pub struct Arcade {
    pub config: ArcadeConfig,
    pub ledger: Arc<Ledger>,
    pub betting: BettingEngine,
    pub checkers: CheckersEngine,
}

/// Builds an `Arcade` from configuration
pub struct ArcadeFactory;

impl ArcadeFactory {
    /// Open the configured store and use the thread-local RNG
    pub fn build(config: ArcadeConfig) -> ArcadeResult<Arcade> {
        let store = open_store(&config.storage)?;
        Self::build_with(config, store, Arc::new(ThreadRandom))
    }

    /// Build over an explicit store and random source
    ///
    /// `rng` drives dice, coins, targets and the checkers AI; game ids are
    /// always drawn from the thread RNG.
    pub fn build_with(
        config: ArcadeConfig,
        store: Arc<dyn LedgerStore>,
        rng: Arc<dyn RandomSource>,
    ) -> ArcadeResult<Arcade> {
        config.validate()?;

        let ledger = Arc::new(Ledger::open(config.wallet.clone(), store)?);
        let betting = BettingEngine::new(ledger.clone(), config.betting.clone(), rng.clone())
            .with_id_source(Arc::new(ThreadRandom));
        let checkers = CheckersEngine::new(config.checkers.clone(), rng);

        info!(
            backend = ?config.storage.backend,
            starting_balance = config.wallet.starting_balance,
            "Arcade ready"
        );

        Ok(Arcade {
            config,
            ledger,
            betting,
            checkers,
        })
    }
}
