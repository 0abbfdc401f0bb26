//! Botarcade - chat-bot game arcade core
//!
//! A credit wallet ledger with escrowed stakes, four small betting games
//! (dice, coin flip, number guess, rock-paper-scissors) played against
//! another user or the house, and checkers against a random-move AI or a
//! second player. Front ends talk to it through `console::Dispatcher`, or
//! drive the engines directly.

pub mod checkers;
pub mod config;
pub mod console;
pub mod errors;
pub mod factory;
pub mod games;
pub mod logging;
pub mod random;
pub mod registry;
pub mod storage;
pub mod wallet;

pub use config::{ArcadeConfig, ConfigLoader};
pub use errors::{ArcadeError, ArcadeResult, ErrorKind};
pub use factory::{Arcade, ArcadeFactory};
