use super::types::{Credits, EscrowClosure, EscrowId, UserId};
use crate::errors::{ArcadeError, ErrorKind};
use thiserror::Error;

/// Reasons the ledger refuses an operation
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("User {user} has {balance} credits, {required} required")]
    InsufficientFunds {
        user: UserId,
        balance: Credits,
        required: Credits,
    },

    #[error("Balance of user {user} would overflow")]
    BalanceOverflow { user: UserId },

    #[error("Escrow {0} already exists")]
    EscrowExists(EscrowId),

    #[error("Escrow {0} does not exist")]
    EscrowNotFound(EscrowId),

    #[error("Escrow {id} was already {closure}")]
    EscrowClosed { id: EscrowId, closure: EscrowClosure },

    #[error("User {user} already participates in escrow {id}")]
    AlreadyParticipant { id: EscrowId, user: UserId },

    #[error("Escrow {id} stake is {expected}, not {offered}")]
    StakeMismatch {
        id: EscrowId,
        expected: Credits,
        offered: Credits,
    },

    #[error("Only the creator of escrow {id} can cancel it")]
    NotCreator { id: EscrowId, user: UserId },

    #[error("Escrow {id} already has other participants and cannot be cancelled")]
    EscrowLocked { id: EscrowId },

    #[error("User {user} is not a participant in escrow {id}")]
    NotParticipant { id: EscrowId, user: UserId },

    #[error("User {0} does not have admin privileges")]
    NotAdmin(UserId),

    #[error("Ledger persistence failed: {0}")]
    Persistence(#[from] ArcadeError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount | LedgerError::EscrowLocked { .. } => ErrorKind::Validation,
            LedgerError::InsufficientFunds { .. }
            | LedgerError::BalanceOverflow { .. }
            | LedgerError::StakeMismatch { .. }
            | LedgerError::AlreadyParticipant { .. }
            | LedgerError::EscrowExists(_) => ErrorKind::Economic,
            LedgerError::EscrowNotFound(_) => ErrorKind::NotFound,
            LedgerError::EscrowClosed { .. } => ErrorKind::Ended,
            LedgerError::NotCreator { .. }
            | LedgerError::NotParticipant { .. }
            | LedgerError::NotAdmin(_) => ErrorKind::Authorization,
            LedgerError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}
