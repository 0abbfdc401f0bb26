//! Wallet ledger: balances, escrows and the admin credit tools

pub mod error;
pub mod ledger;
pub mod types;

pub use error::LedgerError;
pub use ledger::Ledger;
pub use types::{Credits, Escrow, EscrowClosure, EscrowId, Settlement, UserId};
