//! Per-variant move validation and resolution
//!
//! `Rules` is picked once when a game is created; everything variant-specific
//! (what a valid move is, what the house plays, who wins) goes through it.

use super::error::BetError;
use super::types::{BetMove, CoinSide, Hand, MoveInput, Outcome, Seat, Variant};
use crate::random::RandomSource;
use crate::wallet::UserId;
use serde::{Deserialize, Serialize};

pub const GUESS_MIN: u8 = 1;
pub const GUESS_MAX: u8 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Rules {
    Dice,
    Coin,
    /// `target` stays hidden until the game resolves
    NumberGuess { target: u8 },
    RockPaperScissors,
}

impl Rules {
    /// Rules for `variant`, drawing any hidden values from `rng`
    pub fn new(variant: Variant, rng: &dyn RandomSource) -> Self {
        match variant {
            Variant::Dice => Rules::Dice,
            Variant::Coin => Rules::Coin,
            Variant::NumberGuess => Rules::NumberGuess {
                target: rng.range_inclusive(GUESS_MIN as u32, GUESS_MAX as u32) as u8,
            },
            Variant::RockPaperScissors => Rules::RockPaperScissors,
        }
    }

    pub fn variant(&self) -> Variant {
        match self {
            Rules::Dice => Variant::Dice,
            Rules::Coin => Variant::Coin,
            Rules::NumberGuess { .. } => Variant::NumberGuess,
            Rules::RockPaperScissors => Variant::RockPaperScissors,
        }
    }

    pub fn target(&self) -> Option<u8> {
        match self {
            Rules::NumberGuess { target } => Some(*target),
            _ => None,
        }
    }

    /// Turn player input into a recorded move; dice are rolled here
    pub fn validate_move(&self, input: MoveInput, rng: &dyn RandomSource) -> Result<BetMove, BetError> {
        match (self, input) {
            (Rules::Dice, MoveInput::Roll) => Ok(BetMove::Dice(rng.die())),
            (Rules::Coin, MoveInput::Call(side)) => Ok(BetMove::Coin(side)),
            (Rules::NumberGuess { .. }, MoveInput::Guess(guess)) => {
                if (GUESS_MIN..=GUESS_MAX).contains(&guess) {
                    Ok(BetMove::Guess(guess))
                } else {
                    Err(BetError::GuessOutOfRange {
                        guess,
                        min: GUESS_MIN,
                        max: GUESS_MAX,
                    })
                }
            }
            (Rules::RockPaperScissors, MoveInput::Throw(hand)) => Ok(BetMove::Hand(hand)),
            _ => Err(BetError::WrongMoveKind(self.variant())),
        }
    }

    /// Random move for the house seat
    pub fn house_move(&self, rng: &dyn RandomSource) -> BetMove {
        match self {
            Rules::Dice => BetMove::Dice(rng.die()),
            Rules::Coin => BetMove::Coin(CoinSide::from_flip(rng.coin())),
            Rules::NumberGuess { .. } => {
                BetMove::Guess(rng.range_inclusive(GUESS_MIN as u32, GUESS_MAX as u32) as u8)
            }
            Rules::RockPaperScissors => BetMove::Hand(Hand::ALL[rng.index(Hand::ALL.len())]),
        }
    }

    /// Whether resolution needs a coin flip
    pub fn needs_flip(&self) -> bool {
        matches!(self, Rules::Coin)
    }

    /// Decide the outcome from the recorded seats.
    ///
    /// `flip` is the coin result and is only consulted by coin games. Seats
    /// without a matching move are ignored.
    pub fn resolve(&self, seats: &[Seat], flip: Option<CoinSide>) -> Outcome {
        match self {
            Rules::Dice => {
                let rolls: Vec<(UserId, u8)> = seats
                    .iter()
                    .filter_map(|seat| match seat.mv {
                        Some(BetMove::Dice(roll)) => Some((seat.user, roll)),
                        _ => None,
                    })
                    .collect();
                unique_best(&rolls, |&roll| roll as i32)
            }
            Rules::Coin => {
                let Some(flip) = flip else {
                    return Outcome::Tie;
                };
                let correct: Vec<UserId> = seats
                    .iter()
                    .filter(|seat| seat.mv == Some(BetMove::Coin(flip)))
                    .map(|seat| seat.user)
                    .collect();
                match correct.as_slice() {
                    [winner] => Outcome::Winner(*winner),
                    _ => Outcome::Tie,
                }
            }
            Rules::NumberGuess { target } => {
                let guesses: Vec<(UserId, u8)> = seats
                    .iter()
                    .filter_map(|seat| match seat.mv {
                        Some(BetMove::Guess(guess)) => Some((seat.user, guess)),
                        _ => None,
                    })
                    .collect();
                // Closest guess is the best, so rank by negated distance
                unique_best(&guesses, |&guess| -((guess as i32 - *target as i32).abs()))
            }
            Rules::RockPaperScissors => {
                let hands: Vec<(UserId, Hand)> = seats
                    .iter()
                    .filter_map(|seat| match seat.mv {
                        Some(BetMove::Hand(hand)) => Some((seat.user, hand)),
                        _ => None,
                    })
                    .collect();
                match hands.as_slice() {
                    [(a, hand_a), (b, hand_b)] if seats.len() == 2 => {
                        if hand_a.beats(*hand_b) {
                            Outcome::Winner(*a)
                        } else if hand_b.beats(*hand_a) {
                            Outcome::Winner(*b)
                        } else {
                            Outcome::Tie
                        }
                    }
                    _ => Outcome::Tie,
                }
            }
        }
    }
}

/// Sole holder of the highest score, or a tie
fn unique_best<T>(entries: &[(UserId, T)], score: impl Fn(&T) -> i32) -> Outcome {
    let Some(best) = entries.iter().map(|(_, value)| score(value)).max() else {
        return Outcome::Tie;
    };
    let mut leaders = entries.iter().filter(|(_, value)| score(value) == best);
    match (leaders.next(), leaders.next()) {
        (Some((user, _)), None) => Outcome::Winner(*user),
        _ => Outcome::Tie,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedRandom;

    fn seats(moves: &[(UserId, BetMove)]) -> Vec<Seat> {
        moves
            .iter()
            .map(|&(user, mv)| Seat { user, mv: Some(mv) })
            .collect()
    }

    #[test]
    fn test_dice_highest_roll_wins_and_ties_refund() {
        let rules = Rules::Dice;
        assert_eq!(
            rules.resolve(&seats(&[(1, BetMove::Dice(6)), (2, BetMove::Dice(3))]), None),
            Outcome::Winner(1)
        );
        assert_eq!(
            rules.resolve(&seats(&[(1, BetMove::Dice(6)), (2, BetMove::Dice(6))]), None),
            Outcome::Tie
        );
        assert_eq!(
            rules.resolve(
                &seats(&[(1, BetMove::Dice(2)), (2, BetMove::Dice(5)), (3, BetMove::Dice(5))]),
                None
            ),
            Outcome::Tie
        );
    }

    #[test]
    fn test_coin_needs_exactly_one_correct_caller() {
        let rules = Rules::Coin;
        let heads_tails = seats(&[
            (1, BetMove::Coin(CoinSide::Heads)),
            (2, BetMove::Coin(CoinSide::Tails)),
        ]);
        assert_eq!(rules.resolve(&heads_tails, Some(CoinSide::Tails)), Outcome::Winner(2));

        let both_heads = seats(&[
            (1, BetMove::Coin(CoinSide::Heads)),
            (2, BetMove::Coin(CoinSide::Heads)),
        ]);
        assert_eq!(rules.resolve(&both_heads, Some(CoinSide::Heads)), Outcome::Tie);
        assert_eq!(rules.resolve(&both_heads, Some(CoinSide::Tails)), Outcome::Tie);
    }

    #[test]
    fn test_number_guess_closest_wins() {
        let rules = Rules::NumberGuess { target: 7 };
        assert_eq!(
            rules.resolve(&seats(&[(1, BetMove::Guess(6)), (2, BetMove::Guess(9))]), None),
            Outcome::Winner(1)
        );
        assert_eq!(
            rules.resolve(&seats(&[(1, BetMove::Guess(5)), (2, BetMove::Guess(9))]), None),
            Outcome::Tie
        );
        assert_eq!(
            rules.resolve(&seats(&[(1, BetMove::Guess(1)), (2, BetMove::Guess(7))]), None),
            Outcome::Winner(2)
        );
    }

    #[test]
    fn test_rps_table() {
        let rules = Rules::RockPaperScissors;
        let play = |a: Hand, b: Hand| {
            rules.resolve(&seats(&[(1, BetMove::Hand(a)), (2, BetMove::Hand(b))]), None)
        };
        assert_eq!(play(Hand::Rock, Hand::Scissors), Outcome::Winner(1));
        assert_eq!(play(Hand::Rock, Hand::Paper), Outcome::Winner(2));
        assert_eq!(play(Hand::Paper, Hand::Paper), Outcome::Tie);

        let three = seats(&[
            (1, BetMove::Hand(Hand::Rock)),
            (2, BetMove::Hand(Hand::Scissors)),
            (3, BetMove::Hand(Hand::Scissors)),
        ]);
        assert_eq!(rules.resolve(&three, None), Outcome::Tie);
    }

    #[test]
    fn test_move_validation() {
        let rng = ScriptedRandom::new([4]);
        assert_eq!(Rules::Dice.validate_move(MoveInput::Roll, &rng).unwrap(), BetMove::Dice(4));
        assert!(matches!(
            Rules::Dice.validate_move(MoveInput::Guess(3), &rng),
            Err(BetError::WrongMoveKind(Variant::Dice))
        ));

        let guess = Rules::NumberGuess { target: 3 };
        assert!(matches!(
            guess.validate_move(MoveInput::Guess(11), &rng),
            Err(BetError::GuessOutOfRange { guess: 11, .. })
        ));
        assert!(guess.validate_move(MoveInput::Guess(0), &rng).is_err());
        assert_eq!(guess.validate_move(MoveInput::Guess(10), &rng).unwrap(), BetMove::Guess(10));
    }

    #[test]
    fn test_target_drawn_in_range() {
        let rng = ScriptedRandom::new([42]);
        let rules = Rules::new(Variant::NumberGuess, &rng);
        assert_eq!(rules.target(), Some(GUESS_MAX));
        assert_eq!(Rules::new(Variant::Coin, &rng).target(), None);
    }
}
