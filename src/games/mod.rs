pub mod betting;
pub mod engine;
pub mod error;
pub mod rules;
pub mod types;

pub use betting::{BettingGame, GameView};
pub use engine::BettingEngine;
pub use error::BetError;
pub use rules::Rules;
pub use types::*;
