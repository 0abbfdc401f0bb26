//! Betting engine: the betting state machine wired to the ledger
//!
//! Every operation locks the game first and the ledger second. Money moves
//! before the game state changes, and the game state only changes if the
//! ledger accepted the transfer, so a refusal never leaves credits stranded.

use super::betting::{BettingGame, GameView};
use super::error::BetError;
use super::rules::Rules;
use super::types::{BetState, CoinSide, GameMode, MoveInput, Outcome, Variant, HOUSE_ID};
use crate::config::BettingConfig;
use crate::random::RandomSource;
use crate::registry::{lock_game, GameRegistry, SharedGame};
use crate::wallet::{Credits, Ledger, LedgerError, Settlement, UserId};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct BettingEngine {
    ledger: Arc<Ledger>,
    games: GameRegistry<String, BettingGame>,
    /// Terminal state of games removed from the registry
    finished: DashMap<String, BetState>,
    rng: Arc<dyn RandomSource>,
    ids: Arc<dyn RandomSource>,
    config: BettingConfig,
}

impl BettingEngine {
    pub fn new(ledger: Arc<Ledger>, config: BettingConfig, rng: Arc<dyn RandomSource>) -> Self {
        Self {
            ledger,
            games: GameRegistry::new(),
            finished: DashMap::new(),
            ids: rng.clone(),
            rng,
            config,
        }
    }

    /// Draw game ids from a separate source
    pub fn with_id_source(mut self, ids: Arc<dyn RandomSource>) -> Self {
        self.ids = ids;
        self
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    fn check_stake(&self, stake: Credits) -> Result<(), BetError> {
        let too_high = self.config.max_stake.map_or(false, |max| stake > max);
        if stake < self.config.min_stake || too_high {
            return Err(BetError::StakeOutOfRange {
                stake,
                min: self.config.min_stake,
                max: self.config.max_stake,
            });
        }
        Ok(())
    }

    /// Fresh id that is not an open escrow or a recently finished game
    /// One candidate id; `None` if it belonged to a finished game or still
    /// names an escrow
    fn draw_id(&self) -> Option<String> {
        let id = self.ids.id(self.config.game_id_length);
        let taken = self.finished.contains_key(&id) || self.ledger.escrow(&id).is_some();
        (!taken).then_some(id)
    }

    fn lookup(&self, id: &str) -> Result<SharedGame<BettingGame>, BetError> {
        let key = id.to_string();
        self.games.get(&key).ok_or_else(|| match self.finished.get(&key) {
            Some(state) => BetError::GameEnded {
                id: key.clone(),
                state: *state,
            },
            None => BetError::GameNotFound(key.clone()),
        })
    }

    /// Drop a terminal game from the registry, remembering how it ended
    fn retire(&self, id: &str, shared: &SharedGame<BettingGame>, state: BetState) {
        self.finished.insert(id.to_string(), state);
        self.games.remove_game(&id.to_string(), shared);
    }

    /// Create a game and take the creator's stake.
    ///
    /// Multiplayer stakes go into an escrow named after the game; solo stakes
    /// are withdrawn and the house moves immediately. Nothing is registered if
    /// the ledger refuses.
    pub fn create(
        &self,
        variant: Variant,
        creator: UserId,
        stake: Credits,
        mode: GameMode,
    ) -> Result<GameView, BetError> {
        self.check_stake(stake)?;
        let rules = Rules::new(variant, self.rng.as_ref());

        let (id, shared) = self.games.insert_with_fresh_id(
            || self.draw_id(),
            |id| -> Result<BettingGame, BetError> {
                let mut game = BettingGame::new(id.clone(), rules, creator, stake, mode);
                match mode {
                    GameMode::Multiplayer => {
                        self.ledger.open_escrow(id, creator, stake)?;
                    }
                    GameMode::Solo => {
                        self.ledger.withdraw(creator, stake)?;
                        game.record_move(HOUSE_ID, rules.house_move(self.rng.as_ref()))?;
                    }
                }
                Ok(game)
            },
        )?;

        info!(game = %id, %variant, creator, stake, ?mode, "Betting game created");
        let view = lock_game(&shared).view();
        Ok(view)
    }

    /// Seat `user` after moving their stake into the game's escrow
    pub fn join(&self, id: &str, user: UserId) -> Result<GameView, BetError> {
        let shared = self.lookup(id)?;
        let mut game = lock_game(&shared);

        game.check_join(user)?;
        self.ledger.join_escrow(id, user, game.stake())?;
        game.seat(user)?;

        info!(game = %id, user, "Player joined");
        Ok(game.view())
    }

    /// Record a move; the last move resolves and settles the game
    pub fn submit_move(&self, id: &str, user: UserId, input: MoveInput) -> Result<GameView, BetError> {
        let shared = self.lookup(id)?;
        let mut game = lock_game(&shared);

        game.check_move(user)?;
        let mv = game.rules().validate_move(input, self.rng.as_ref())?;

        let mut next = game.clone();
        if !next.record_move(user, mv)? {
            *game = next;
            debug!(game = %id, user, "Move recorded");
            return Ok(game.view());
        }

        let flip = next
            .rules()
            .needs_flip()
            .then(|| CoinSide::from_flip(self.rng.coin()));
        let outcome = next.resolve(flip);
        self.pay_out(&next, outcome)?;

        *game = next;
        let view = game.view();
        drop(game);

        self.retire(id, &shared, BetState::Resolved);
        info!(game = %id, ?outcome, "Betting game resolved");
        Ok(view)
    }

    fn pay_out(&self, game: &BettingGame, outcome: Outcome) -> Result<(), BetError> {
        let creator = game.creator_id();
        match (game.mode(), outcome) {
            (GameMode::Multiplayer, Outcome::Winner(winner)) => {
                self.ledger.settle_escrow(game.id(), Some(winner))?;
            }
            (GameMode::Multiplayer, Outcome::Tie) => {
                self.ledger.settle_escrow(game.id(), None)?;
            }
            (GameMode::Solo, Outcome::Winner(HOUSE_ID)) => {}
            (GameMode::Solo, Outcome::Winner(_)) => {
                let prize = game
                    .stake()
                    .checked_mul(2)
                    .ok_or(LedgerError::BalanceOverflow { user: creator })?;
                self.ledger.deposit(creator, prize)?;
            }
            (GameMode::Solo, Outcome::Tie) => {
                self.ledger.deposit(creator, game.stake())?;
            }
        }
        Ok(())
    }

    /// Creator cancels before resolution; stakes go back to their owners
    pub fn cancel(&self, id: &str, requester: UserId) -> Result<GameView, BetError> {
        let shared = self.lookup(id)?;
        let mut game = lock_game(&shared);

        if game.state().is_terminal() {
            return Err(BetError::GameEnded {
                id: id.to_string(),
                state: game.state(),
            });
        }
        if game.creator_id() != requester {
            return Err(BetError::NotCreator {
                id: id.to_string(),
                user: requester,
            });
        }

        match game.mode() {
            GameMode::Multiplayer => {
                self.ledger.cancel_escrow(id, requester)?;
            }
            GameMode::Solo => {
                self.ledger.deposit(requester, game.stake())?;
            }
        }

        game.cancel();
        let view = game.view();
        drop(game);

        self.retire(id, &shared, BetState::Cancelled);
        info!(game = %id, requester, "Betting game cancelled");
        Ok(view)
    }

    pub fn get(&self, id: &str) -> Result<GameView, BetError> {
        let shared = self.lookup(id)?;
        let view = lock_game(&shared).view();
        Ok(view)
    }

    pub fn active_games(&self) -> Vec<GameView> {
        self.games.collect(|game| Some(game.view()))
    }

    /// Live games in which `user` holds a seat
    pub fn games_for(&self, user: UserId) -> Vec<GameView> {
        self.games
            .collect(|game| game.is_seated(user).then(|| game.view()))
    }

    /// Refund escrows that have no live game, e.g. after a restart
    pub fn recover_orphaned_escrows(&self) -> Result<Vec<Settlement>, BetError> {
        let mut refunds = Vec::new();
        for escrow in self.ledger.open_escrows() {
            if self.games.contains(&escrow.id) {
                continue;
            }
            warn!(escrow = %escrow.id, pot = escrow.pot(), "Refunding escrow without a live game");
            refunds.push(self.ledger.settle_escrow(&escrow.id, None)?);
        }
        Ok(refunds)
    }
}
