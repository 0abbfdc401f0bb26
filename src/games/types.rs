use crate::wallet::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::BetError;

/// Seat id of the synthetic house player in solo games
pub const HOUSE_ID: UserId = -1;

/// Supported betting games
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Dice,
    Coin,
    NumberGuess,
    RockPaperScissors,
}

impl Variant {
    pub fn title(&self) -> &'static str {
        match self {
            Variant::Dice => "Dice Roll",
            Variant::Coin => "Coin Flip",
            Variant::NumberGuess => "Number Guess",
            Variant::RockPaperScissors => "Rock Paper Scissors",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Dice => write!(f, "dice"),
            Variant::Coin => write!(f, "coin"),
            Variant::NumberGuess => write!(f, "number"),
            Variant::RockPaperScissors => write!(f, "rps"),
        }
    }
}

impl FromStr for Variant {
    type Err = BetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dice" => Ok(Variant::Dice),
            "coin" => Ok(Variant::Coin),
            "number" => Ok(Variant::NumberGuess),
            "rps" | "rock" | "paper" | "scissors" => Ok(Variant::RockPaperScissors),
            other => Err(BetError::UnknownVariant(other.to_string())),
        }
    }
}

/// Coin side, used both for guesses and the flip result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl CoinSide {
    pub fn from_flip(heads: bool) -> Self {
        if heads {
            CoinSide::Heads
        } else {
            CoinSide::Tails
        }
    }
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinSide::Heads => write!(f, "heads"),
            CoinSide::Tails => write!(f, "tails"),
        }
    }
}

/// Rock-paper-scissors throw
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Hand {
    Rock,
    Paper,
    Scissors,
}

impl Hand {
    pub const ALL: [Hand; 3] = [Hand::Rock, Hand::Paper, Hand::Scissors];

    pub fn beats(self, other: Hand) -> bool {
        matches!(
            (self, other),
            (Hand::Rock, Hand::Scissors) | (Hand::Scissors, Hand::Paper) | (Hand::Paper, Hand::Rock)
        )
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hand::Rock => write!(f, "rock"),
            Hand::Paper => write!(f, "paper"),
            Hand::Scissors => write!(f, "scissors"),
        }
    }
}

/// Whether the second seat is the house or another user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Solo,
    Multiplayer,
}

/// A move as submitted by a player, before validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveInput {
    /// Ask the server to roll the die
    Roll,
    Call(CoinSide),
    Guess(u8),
    Throw(Hand),
}

impl FromStr for MoveInput {
    type Err = BetError;

    /// Accepts `roll`, `heads`/`tails`, a number or `rock`/`paper`/`scissors`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().to_ascii_lowercase();
        match text.as_str() {
            "roll" | "dice" => Ok(MoveInput::Roll),
            "heads" => Ok(MoveInput::Call(CoinSide::Heads)),
            "tails" => Ok(MoveInput::Call(CoinSide::Tails)),
            "rock" => Ok(MoveInput::Throw(Hand::Rock)),
            "paper" => Ok(MoveInput::Throw(Hand::Paper)),
            "scissors" => Ok(MoveInput::Throw(Hand::Scissors)),
            _ => text
                .parse::<u8>()
                .map(MoveInput::Guess)
                .map_err(|_| BetError::InvalidMove(s.trim().to_string())),
        }
    }
}

/// A validated, recorded move
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BetMove {
    Dice(u8),
    Coin(CoinSide),
    Guess(u8),
    Hand(Hand),
}

impl fmt::Display for BetMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetMove::Dice(roll) => write!(f, "rolled {}", roll),
            BetMove::Coin(side) => write!(f, "called {}", side),
            BetMove::Guess(n) => write!(f, "guessed {}", n),
            BetMove::Hand(hand) => write!(f, "threw {}", hand),
        }
    }
}

/// Betting game lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BetState {
    AwaitingOpponent,
    AwaitingMoves,
    Resolved,
    Cancelled,
}

impl BetState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BetState::Resolved | BetState::Cancelled)
    }
}

impl fmt::Display for BetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetState::AwaitingOpponent => write!(f, "waiting for opponent"),
            BetState::AwaitingMoves => write!(f, "waiting for moves"),
            BetState::Resolved => write!(f, "resolved"),
            BetState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of a resolved game
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Winner(UserId),
    Tie,
}

/// One player seat and the move recorded for it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seat {
    pub user: UserId,
    pub mv: Option<BetMove>,
}

impl Seat {
    pub fn empty(user: UserId) -> Self {
        Self { user, mv: None }
    }

    pub fn is_house(&self) -> bool {
        self.user == HOUSE_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_aliases() {
        assert_eq!("dice".parse::<Variant>().unwrap(), Variant::Dice);
        assert_eq!("Coin".parse::<Variant>().unwrap(), Variant::Coin);
        assert_eq!("number".parse::<Variant>().unwrap(), Variant::NumberGuess);
        for alias in ["rps", "rock", "paper", "scissors"] {
            assert_eq!(alias.parse::<Variant>().unwrap(), Variant::RockPaperScissors);
        }
        assert!("poker".parse::<Variant>().is_err());
    }

    #[test]
    fn test_move_input_parsing() {
        assert_eq!("roll".parse::<MoveInput>().unwrap(), MoveInput::Roll);
        assert_eq!(" TAILS ".parse::<MoveInput>().unwrap(), MoveInput::Call(CoinSide::Tails));
        assert_eq!("7".parse::<MoveInput>().unwrap(), MoveInput::Guess(7));
        assert_eq!("paper".parse::<MoveInput>().unwrap(), MoveInput::Throw(Hand::Paper));
        assert!("lizard".parse::<MoveInput>().is_err());
        assert!("-3".parse::<MoveInput>().is_err());
    }

    #[test]
    fn test_beats_relation() {
        assert!(Hand::Rock.beats(Hand::Scissors));
        assert!(Hand::Scissors.beats(Hand::Paper));
        assert!(Hand::Paper.beats(Hand::Rock));
        for hand in Hand::ALL {
            assert!(!hand.beats(hand));
        }
    }
}
