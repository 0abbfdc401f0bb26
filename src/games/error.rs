use super::types::{BetState, Variant};
use crate::errors::ErrorKind;
use crate::registry::RegistryError;
use crate::wallet::{Credits, LedgerError, UserId};
use thiserror::Error;

/// Reasons a betting operation is refused
#[derive(Debug, Error)]
pub enum BetError {
    #[error("Unknown game type '{0}' (try dice, coin, number or rps)")]
    UnknownVariant(String),

    #[error("'{0}' is not a valid move")]
    InvalidMove(String),

    #[error("That move does not fit a {0} game")]
    WrongMoveKind(Variant),

    #[error("Guess must be between {min} and {max}, got {guess}")]
    GuessOutOfRange { guess: u8, min: u8, max: u8 },

    #[error("Stake {stake} is outside the allowed range")]
    StakeOutOfRange {
        stake: Credits,
        min: Credits,
        max: Option<Credits>,
    },

    #[error("Game {0} does not exist")]
    GameNotFound(String),

    #[error("Game {id} is already {state}")]
    GameEnded { id: String, state: BetState },

    #[error("Game {id} is {state}")]
    WrongState { id: String, state: BetState },

    #[error("User {user} is already seated in game {id}")]
    AlreadySeated { id: String, user: UserId },

    #[error("User {user} is not playing in game {id}")]
    NotSeated { id: String, user: UserId },

    #[error("User {user} already moved in game {id}")]
    AlreadyMoved { id: String, user: UserId },

    #[error("Only the creator can cancel game {id}")]
    NotCreator { id: String, user: UserId },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl BetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BetError::UnknownVariant(_)
            | BetError::InvalidMove(_)
            | BetError::WrongMoveKind(_)
            | BetError::GuessOutOfRange { .. }
            | BetError::StakeOutOfRange { .. }
            | BetError::WrongState { .. }
            | BetError::AlreadySeated { .. }
            | BetError::AlreadyMoved { .. } => ErrorKind::Validation,
            BetError::Registry(_) => ErrorKind::Internal,
            BetError::GameNotFound(_) => ErrorKind::NotFound,
            BetError::GameEnded { .. } => ErrorKind::Ended,
            BetError::NotSeated { .. } | BetError::NotCreator { .. } => ErrorKind::Authorization,
            BetError::Ledger(e) => e.kind(),
        }
    }
}
