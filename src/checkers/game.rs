//! Checkers game state: seats, turn order, jump chains and game end

use super::board::{Board, Move, Side, Square};
use super::notation::{format_move, NotationError};
use crate::errors::ErrorKind;
use crate::random::RandomSource;
use crate::wallet::UserId;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use thiserror::Error;

pub type ChatId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckersState {
    AwaitingOpponent,
    AwaitingMove,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Light,
    Dark,
    Draw,
}

impl From<Side> for Winner {
    fn from(side: Side) -> Self {
        match side {
            Side::Light => Winner::Light,
            Side::Dark => Winner::Dark,
        }
    }
}

/// Who plays the dark pieces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opponent {
    Ai,
    Human,
}

#[derive(Debug, Error)]
pub enum CheckersError {
    #[error(transparent)]
    Notation(#[from] NotationError),

    #[error("Illegal move {0}")]
    IllegalMove(Move),

    #[error("The jumping piece must keep capturing")]
    MustContinueJump { square: Square },

    #[error("The game is over")]
    GameOver,

    #[error("Waiting for an opponent to join")]
    AwaitingOpponent,

    #[error("It is {0}'s turn")]
    NotYourTurn(Side),

    #[error("User {0} is not playing in this game")]
    NotAPlayer(UserId),

    #[error("You cannot join your own game")]
    CannotJoinOwnGame,

    #[error("This game already has two players")]
    SeatTaken,

    #[error("No checkers game in chat {0}")]
    GameNotFound(ChatId),

    #[error("The checkers game in chat {0} has ended")]
    GameEnded(ChatId),

    #[error("A checkers game is already running in chat {0}")]
    GameInProgress(ChatId),
}

impl CheckersError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckersError::Notation(_)
            | CheckersError::IllegalMove(_)
            | CheckersError::MustContinueJump { .. }
            | CheckersError::AwaitingOpponent
            | CheckersError::CannotJoinOwnGame
            | CheckersError::SeatTaken
            | CheckersError::GameInProgress(_) => ErrorKind::Validation,
            CheckersError::NotYourTurn(_) | CheckersError::NotAPlayer(_) => ErrorKind::Authorization,
            CheckersError::GameOver | CheckersError::GameEnded(_) => ErrorKind::Ended,
            CheckersError::GameNotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// What a single applied move did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub mv: Move,
    pub captured: Option<Square>,
    pub promoted: bool,
    /// The same piece must capture again before the turn passes
    pub continues_jump: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckersGame {
    board: Board,
    light: UserId,
    /// `None` while waiting for a human, or always for an AI game
    dark: Option<UserId>,
    vs_ai: bool,
    turn: Side,
    state: CheckersState,
    winner: Option<Winner>,
    move_log: Vec<Move>,
    /// Square of a piece in the middle of a jump chain
    pending_jump: Option<Square>,
    /// Plies since the last capture or promotion
    quiet_plies: u32,
    draw_limit: Option<u32>,
}

impl CheckersGame {
    fn new(light: UserId, vs_ai: bool) -> Self {
        Self {
            board: Board::initial(),
            light,
            dark: None,
            vs_ai,
            turn: Side::Light,
            state: if vs_ai {
                CheckersState::AwaitingMove
            } else {
                CheckersState::AwaitingOpponent
            },
            winner: None,
            move_log: Vec::new(),
            pending_jump: None,
            quiet_plies: 0,
            draw_limit: None,
        }
    }

    /// `light` against the random AI; play starts at once
    pub fn vs_ai(light: UserId) -> Self {
        Self::new(light, true)
    }

    /// `light` waiting for a human to take the dark pieces
    pub fn vs_human(light: UserId) -> Self {
        Self::new(light, false)
    }

    pub fn with_draw_limit(mut self, limit: Option<u32>) -> Self {
        self.draw_limit = limit;
        self
    }

    /// Start from an arbitrary position, e.g. for puzzles and tests
    pub fn with_board(mut self, board: Board, turn: Side) -> Self {
        self.board = board;
        self.turn = turn;
        self
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Side {
        self.turn
    }

    pub fn state(&self) -> CheckersState {
        self.state
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn move_log(&self) -> &[Move] {
        &self.move_log
    }

    pub fn pending_jump(&self) -> Option<Square> {
        self.pending_jump
    }

    pub fn is_vs_ai(&self) -> bool {
        self.vs_ai
    }

    pub fn light_player(&self) -> UserId {
        self.light
    }

    pub fn dark_player(&self) -> Option<UserId> {
        self.dark
    }

    pub fn side_of(&self, user: UserId) -> Option<Side> {
        if user == self.light {
            Some(Side::Light)
        } else if self.dark == Some(user) {
            Some(Side::Dark)
        } else {
            None
        }
    }

    pub fn is_player(&self, user: UserId) -> bool {
        self.side_of(user).is_some()
    }

    /// Take the dark seat of a human game
    pub fn join(&mut self, dark: UserId) -> Result<(), CheckersError> {
        if self.state == CheckersState::Over {
            return Err(CheckersError::GameOver);
        }
        if dark == self.light {
            return Err(CheckersError::CannotJoinOwnGame);
        }
        if self.vs_ai || self.dark.is_some() || self.state != CheckersState::AwaitingOpponent {
            return Err(CheckersError::SeatTaken);
        }

        self.dark = Some(dark);
        self.state = CheckersState::AwaitingMove;
        Ok(())
    }

    /// Apply a move for the side to move
    pub fn apply_move(&mut self, mv: Move) -> Result<MoveOutcome, CheckersError> {
        match self.state {
            CheckersState::Over => return Err(CheckersError::GameOver),
            CheckersState::AwaitingOpponent => return Err(CheckersError::AwaitingOpponent),
            CheckersState::AwaitingMove => {}
        }

        if let Some(square) = self.pending_jump {
            if mv.from != square || !self.board.captures_from(square).contains(&mv) {
                return Err(CheckersError::MustContinueJump { square });
            }
        } else if !self.board.is_legal_move(self.turn, mv) {
            return Err(CheckersError::IllegalMove(mv));
        }

        let applied = self.board.apply(mv).ok_or(CheckersError::IllegalMove(mv))?;
        self.move_log.push(mv);

        if applied.captured.is_some() || applied.promoted {
            self.quiet_plies = 0;
        } else {
            self.quiet_plies += 1;
        }

        // The chain follows the piece as it moved; a fresh king stops here
        let continues_jump = applied.captured.is_some()
            && !applied.promoted
            && !self.board.captures_from(mv.to).is_empty();

        if continues_jump {
            self.pending_jump = Some(mv.to);
        } else {
            self.pending_jump = None;
            self.turn = self.turn.opponent();
            self.check_terminal();
        }

        Ok(MoveOutcome {
            mv,
            captured: applied.captured,
            promoted: applied.promoted,
            continues_jump,
        })
    }

    /// End the game if a side is wiped out, stuck, or the quiet-move limit hit
    pub fn check_terminal(&mut self) -> Option<Winner> {
        if self.state == CheckersState::Over {
            return self.winner;
        }

        let winner = if self.board.count(Side::Light) == 0 {
            Some(Winner::Dark)
        } else if self.board.count(Side::Dark) == 0 {
            Some(Winner::Light)
        } else if !self.board.has_legal_move(self.turn) {
            Some(self.turn.opponent().into())
        } else if self.draw_limit.map_or(false, |limit| self.quiet_plies >= limit) {
            Some(Winner::Draw)
        } else {
            None
        };

        if winner.is_some() {
            self.finish(winner);
        }
        winner
    }

    fn finish(&mut self, winner: Option<Winner>) {
        self.state = CheckersState::Over;
        self.winner = winner;
        self.pending_jump = None;
    }

    /// Play the AI's whole turn, jump chains included.
    ///
    /// Captures are preferred; among the candidates the choice is uniform.
    /// Returns the moves played, empty when it is not the AI's turn.
    pub fn ai_move(&mut self, rng: &dyn RandomSource) -> Result<Vec<Move>, CheckersError> {
        let mut played = Vec::new();
        while self.vs_ai && self.state == CheckersState::AwaitingMove && self.turn == Side::Dark {
            let candidates = match self.pending_jump {
                Some(square) => self.board.captures_from(square),
                None => {
                    let captures = self.board.legal_moves(Side::Dark, true);
                    if captures.is_empty() {
                        self.board.legal_moves(Side::Dark, false)
                    } else {
                        captures
                    }
                }
            };

            if candidates.is_empty() {
                self.finish(Some(Winner::Light));
                break;
            }

            let mv = candidates[rng.index(candidates.len())];
            self.apply_move(mv)?;
            played.push(mv);
        }
        Ok(played)
    }

    pub fn view(&self) -> CheckersView {
        CheckersView {
            board: self.board.clone(),
            light: self.light,
            dark: self.dark,
            vs_ai: self.vs_ai,
            turn: self.turn,
            state: self.state,
            winner: self.winner,
            last_move: self.move_log.last().copied(),
            moves_played: self.move_log.len(),
            pending_jump: self.pending_jump,
        }
    }
}

/// Read-only snapshot of a checkers game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckersView {
    pub board: Board,
    pub light: UserId,
    pub dark: Option<UserId>,
    pub vs_ai: bool,
    pub turn: Side,
    pub state: CheckersState,
    pub winner: Option<Winner>,
    pub last_move: Option<Move>,
    pub moves_played: usize,
    pub pending_jump: Option<Square>,
}

impl CheckersView {
    fn dark_name(&self) -> String {
        match self.dark {
            _ if self.vs_ai => "the AI".to_string(),
            Some(user) => format!("player {}", user),
            None => "nobody yet".to_string(),
        }
    }

    pub fn status_text(&self) -> String {
        let mut text = self.board.to_string();
        if let Some(mv) = self.last_move {
            let _ = writeln!(text, "Last move: {}", format_move(mv));
        }
        let _ = writeln!(text, "{}", self);
        text
    }
}

impl fmt::Display for CheckersView {
    /// One-line status
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.state, self.winner) {
            (CheckersState::AwaitingOpponent, _) => {
                write!(f, "Player {} (light) is waiting for an opponent", self.light)
            }
            (CheckersState::Over, Some(Winner::Light)) => {
                write!(f, "Game over: player {} (light) wins", self.light)
            }
            (CheckersState::Over, Some(Winner::Dark)) => {
                write!(f, "Game over: {} (dark) wins", self.dark_name())
            }
            (CheckersState::Over, _) => write!(f, "Game over: draw"),
            (CheckersState::AwaitingMove, _) => {
                let mover = match self.turn {
                    Side::Light => format!("player {}", self.light),
                    Side::Dark => self.dark_name(),
                };
                match self.pending_jump {
                    Some(square) => write!(
                        f,
                        "{} to move ({}), keep jumping from {}",
                        self.turn,
                        mover,
                        super::notation::format_square(square)
                    ),
                    None => write!(f, "{} to move ({})", self.turn, mover),
                }
            }
        }
    }
}
