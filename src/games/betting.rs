//! Betting game state machine
//!
//! `BettingGame` knows seats, moves and who won. It never touches credits;
//! the engine moves money around the transitions this type allows.

use super::error::BetError;
use super::rules::Rules;
use super::types::{BetMove, BetState, CoinSide, GameMode, Outcome, Seat, Variant, HOUSE_ID};
use crate::wallet::{Credits, UserId};
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Number of seats a betting game fills before moves open
pub const SEATS_PER_GAME: usize = 2;

#[derive(Debug, Clone)]
pub struct BettingGame {
    id: String,
    rules: Rules,
    creator_id: UserId,
    stake: Credits,
    mode: GameMode,
    seats: Vec<Seat>,
    state: BetState,
    outcome: Option<Outcome>,
    coin_result: Option<CoinSide>,
    created_at: DateTime<Utc>,
}

impl BettingGame {
    /// New game with the creator seated; solo games also seat the house
    pub fn new(id: String, rules: Rules, creator_id: UserId, stake: Credits, mode: GameMode) -> Self {
        let mut seats = vec![Seat::empty(creator_id)];
        let state = match mode {
            GameMode::Solo => {
                seats.push(Seat::empty(HOUSE_ID));
                BetState::AwaitingMoves
            }
            GameMode::Multiplayer => BetState::AwaitingOpponent,
        };

        Self {
            id,
            rules,
            creator_id,
            stake,
            mode,
            seats,
            state,
            outcome: None,
            coin_result: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn creator_id(&self) -> UserId {
        self.creator_id
    }

    pub fn stake(&self) -> Credits {
        self.stake
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn state(&self) -> BetState {
        self.state
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_seated(&self, user: UserId) -> bool {
        self.seats.iter().any(|seat| seat.user == user)
    }

    fn ended(&self) -> Result<(), BetError> {
        if self.state.is_terminal() {
            Err(BetError::GameEnded {
                id: self.id.clone(),
                state: self.state,
            })
        } else {
            Ok(())
        }
    }

    /// Check that `user` may take the open seat, without taking it
    pub fn check_join(&self, user: UserId) -> Result<(), BetError> {
        self.ended()?;
        if self.is_seated(user) {
            return Err(BetError::AlreadySeated {
                id: self.id.clone(),
                user,
            });
        }
        if self.state != BetState::AwaitingOpponent {
            return Err(BetError::WrongState {
                id: self.id.clone(),
                state: self.state,
            });
        }
        Ok(())
    }

    /// Seat `user`; moves open once every seat is filled
    pub fn seat(&mut self, user: UserId) -> Result<(), BetError> {
        self.check_join(user)?;
        self.seats.push(Seat::empty(user));
        if self.seats.len() >= SEATS_PER_GAME {
            self.state = BetState::AwaitingMoves;
        }
        Ok(())
    }

    /// Check that `user` may move now, without recording anything
    pub fn check_move(&self, user: UserId) -> Result<(), BetError> {
        self.ended()?;
        let seat = self
            .seats
            .iter()
            .find(|seat| seat.user == user)
            .ok_or_else(|| BetError::NotSeated {
                id: self.id.clone(),
                user,
            })?;
        if self.state != BetState::AwaitingMoves {
            return Err(BetError::WrongState {
                id: self.id.clone(),
                state: self.state,
            });
        }
        if seat.mv.is_some() {
            return Err(BetError::AlreadyMoved {
                id: self.id.clone(),
                user,
            });
        }
        Ok(())
    }

    /// Record a validated move. Returns `true` once every seat has moved.
    pub fn record_move(&mut self, user: UserId, mv: BetMove) -> Result<bool, BetError> {
        self.check_move(user)?;
        if let Some(seat) = self.seats.iter_mut().find(|seat| seat.user == user) {
            seat.mv = Some(mv);
        }
        Ok(self.all_moved())
    }

    pub fn all_moved(&self) -> bool {
        self.seats.iter().all(|seat| seat.mv.is_some())
    }

    /// Decide the outcome and mark the game resolved.
    ///
    /// `flip` is only used by coin games and is recorded for display.
    pub fn resolve(&mut self, flip: Option<CoinSide>) -> Outcome {
        let flip = if self.rules.needs_flip() { flip } else { None };
        let outcome = self.rules.resolve(&self.seats, flip);
        self.coin_result = flip;
        self.outcome = Some(outcome);
        self.state = BetState::Resolved;
        outcome
    }

    pub fn cancel(&mut self) {
        self.state = BetState::Cancelled;
    }

    pub fn view(&self) -> GameView {
        GameView {
            id: self.id.clone(),
            variant: self.rules.variant(),
            creator_id: self.creator_id,
            stake: self.stake,
            mode: self.mode,
            seats: self.seats.clone(),
            state: self.state,
            outcome: self.outcome,
            coin_result: self.coin_result,
            target: match self.state {
                BetState::Resolved => self.rules.target(),
                _ => None,
            },
            created_at: self.created_at,
        }
    }
}

/// Read-only snapshot of a betting game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameView {
    pub id: String,
    pub variant: Variant,
    pub creator_id: UserId,
    pub stake: Credits,
    pub mode: GameMode,
    pub seats: Vec<Seat>,
    pub state: BetState,
    pub outcome: Option<Outcome>,
    pub coin_result: Option<CoinSide>,
    /// Number-guess target, revealed once resolved
    pub target: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl GameView {
    pub fn pot(&self) -> Credits {
        self.stake * self.seats.len() as Credits
    }

    pub fn moves_made(&self) -> usize {
        self.seats.iter().filter(|seat| seat.mv.is_some()).count()
    }

    pub fn move_of(&self, user: UserId) -> Option<BetMove> {
        self.seats.iter().find(|seat| seat.user == user).and_then(|seat| seat.mv)
    }

    /// Plain text status for chat replies
    pub fn status_text(&self) -> String {
        let mut text = format!("{} betting game {}\n", self.variant.title(), self.id);
        let _ = writeln!(text, "Stake: {} credits", self.stake);

        match self.state {
            BetState::AwaitingOpponent => {
                let _ = writeln!(text, "Status: waiting for an opponent (/join {})", self.id);
            }
            BetState::AwaitingMoves => {
                let _ = writeln!(
                    text,
                    "Status: waiting for moves ({}/{})",
                    self.moves_made(),
                    self.seats.len()
                );
            }
            BetState::Cancelled => {
                let _ = writeln!(text, "Status: cancelled, stakes refunded");
            }
            BetState::Resolved => {
                if let Some(target) = self.target {
                    let _ = writeln!(text, "Target number: {}", target);
                }
                if let Some(flip) = self.coin_result {
                    let _ = writeln!(text, "Coin landed on {}", flip);
                }
                for seat in &self.seats {
                    let name = if seat.is_house() {
                        "House".to_string()
                    } else {
                        format!("Player {}", seat.user)
                    };
                    let played = seat.mv.map(|mv| mv.to_string()).unwrap_or_default();
                    let _ = writeln!(text, "{}: {}", name, played);
                }
                match self.outcome {
                    Some(Outcome::Winner(HOUSE_ID)) => {
                        let _ = writeln!(text, "The house wins the pot of {}", self.pot());
                    }
                    Some(Outcome::Winner(user)) => {
                        let _ = writeln!(text, "Player {} wins the pot of {}", user, self.pot());
                    }
                    Some(Outcome::Tie) | None => {
                        let _ = writeln!(text, "Tie, every stake refunded");
                    }
                }
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dice_game(mode: GameMode) -> BettingGame {
        BettingGame::new("DICE01".to_string(), Rules::Dice, 1, 100, mode)
    }

    #[test]
    fn test_multiplayer_lifecycle() {
        let mut game = dice_game(GameMode::Multiplayer);
        assert_eq!(game.state(), BetState::AwaitingOpponent);
        assert!(matches!(game.record_move(1, BetMove::Dice(3)), Err(BetError::WrongState { .. })));

        assert!(matches!(game.seat(1), Err(BetError::AlreadySeated { .. })));
        game.seat(2).unwrap();
        assert_eq!(game.state(), BetState::AwaitingMoves);
        assert!(matches!(game.seat(3), Err(BetError::WrongState { .. })));

        assert!(!game.record_move(1, BetMove::Dice(5)).unwrap());
        assert!(matches!(game.record_move(1, BetMove::Dice(6)), Err(BetError::AlreadyMoved { .. })));
        assert!(matches!(game.record_move(9, BetMove::Dice(6)), Err(BetError::NotSeated { .. })));
        assert!(game.record_move(2, BetMove::Dice(2)).unwrap());

        let view = game.view();
        assert_eq!(view.move_of(1), Some(BetMove::Dice(5)));
        assert_eq!(view.move_of(2), Some(BetMove::Dice(2)));
        assert_eq!(view.move_of(9), None);

        assert_eq!(game.resolve(None), Outcome::Winner(1));
        assert!(matches!(game.check_move(2), Err(BetError::GameEnded { .. })));
    }

    #[test]
    fn test_solo_seats_house() {
        let game = dice_game(GameMode::Solo);
        assert_eq!(game.state(), BetState::AwaitingMoves);
        assert!(game.is_seated(HOUSE_ID));
        assert_eq!(game.view().seats[0].user, 1);
    }

    #[test]
    fn test_target_hidden_until_resolved() {
        let mut game = BettingGame::new(
            "GUESS1".to_string(),
            Rules::NumberGuess { target: 4 },
            1,
            10,
            GameMode::Solo,
        );
        assert_eq!(game.view().target, None);
        assert!(!game.view().status_text().contains("Target"));

        game.record_move(HOUSE_ID, BetMove::Guess(9)).unwrap();
        game.record_move(1, BetMove::Guess(4)).unwrap();
        game.resolve(None);

        let view = game.view();
        assert_eq!(view.target, Some(4));
        assert!(view.status_text().contains("Target number: 4"));
        assert!(view.status_text().contains("Player 1 wins the pot of 20"));
    }

    #[test]
    fn test_coin_flip_is_only_kept_for_coin_games() {
        let mut game = dice_game(GameMode::Solo);
        game.record_move(HOUSE_ID, BetMove::Dice(1)).unwrap();
        game.record_move(1, BetMove::Dice(1)).unwrap();
        assert_eq!(game.resolve(Some(CoinSide::Heads)), Outcome::Tie);
        assert_eq!(game.view().coin_result, None);
    }
}
