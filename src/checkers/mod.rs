//! Checkers (8x8 draughts) against another user or a random AI

pub mod board;
pub mod engine;
pub mod game;
pub mod notation;

pub use board::{Board, Cell, Move, Piece, PieceKind, Side, Square};
pub use engine::{CheckersEngine, PlayReport};
pub use game::{ChatId, CheckersError, CheckersGame, CheckersState, CheckersView, MoveOutcome, Opponent, Winner};
pub use notation::{format_move, parse_move, NotationError};
