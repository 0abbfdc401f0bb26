//! Checkers games keyed by chat, with the AI reply played under the game lock

use super::game::{ChatId, CheckersError, CheckersGame, CheckersState, CheckersView, Opponent, Winner};
use super::notation::parse_move;
use crate::config::CheckersConfig;
use crate::random::RandomSource;
use crate::registry::{lock_game, GameRegistry, RegistryError, SharedGame};
use crate::wallet::UserId;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of one `/move`
#[derive(Debug, Clone)]
pub struct PlayReport {
    pub view: CheckersView,
    /// Moves the AI answered with, chain included
    pub ai_moves: Vec<super::board::Move>,
    /// The player must jump again with the same piece
    pub continues_jump: bool,
}

pub struct CheckersEngine {
    games: GameRegistry<ChatId, CheckersGame>,
    /// How finished games ended, until a new game starts in that chat
    finished: DashMap<ChatId, Option<Winner>>,
    rng: Arc<dyn RandomSource>,
    config: CheckersConfig,
}

impl CheckersEngine {
    pub fn new(config: CheckersConfig, rng: Arc<dyn RandomSource>) -> Self {
        Self {
            games: GameRegistry::new(),
            finished: DashMap::new(),
            rng,
            config,
        }
    }

    fn lookup(&self, chat: ChatId) -> Result<SharedGame<CheckersGame>, CheckersError> {
        self.games.get(&chat).ok_or_else(|| self.missing(chat))
    }

    fn missing(&self, chat: ChatId) -> CheckersError {
        if self.finished.contains_key(&chat) {
            CheckersError::GameEnded(chat)
        } else {
            CheckersError::GameNotFound(chat)
        }
    }

    /// Start a game in `chat` with `user` on the light pieces
    pub fn start(&self, chat: ChatId, user: UserId, opponent: Opponent) -> Result<CheckersView, CheckersError> {
        let game = match opponent {
            Opponent::Ai => CheckersGame::vs_ai(user),
            Opponent::Human => CheckersGame::vs_human(user),
        }
        .with_draw_limit(self.config.quiet_move_draw_limit);

        let view = self.start_game(chat, game)?;
        info!(chat, user, ?opponent, "Checkers game started");
        Ok(view)
    }

    /// Register a prepared game, e.g. one set up from a custom position
    pub fn start_game(&self, chat: ChatId, game: CheckersGame) -> Result<CheckersView, CheckersError> {
        let shared = self.games.insert(chat, game).map_err(|e| match e {
            RegistryError::DuplicateKey(_) | RegistryError::IdSpaceExhausted(_) => {
                CheckersError::GameInProgress(chat)
            }
        })?;
        self.finished.remove(&chat);

        let view = lock_game(&shared).view();
        Ok(view)
    }

    pub fn join(&self, chat: ChatId, user: UserId) -> Result<CheckersView, CheckersError> {
        let shared = self.lookup(chat)?;
        let mut game = lock_game(&shared);
        game.join(user)?;

        info!(chat, user, "Checkers opponent joined");
        Ok(game.view())
    }

    /// Parse and play `text` for `user`, then let the AI answer
    pub fn play(&self, chat: ChatId, user: UserId, text: &str) -> Result<PlayReport, CheckersError> {
        let shared = self.lookup(chat)?;
        let mut game = lock_game(&shared);

        match game.state() {
            CheckersState::Over => return Err(CheckersError::GameOver),
            CheckersState::AwaitingOpponent => return Err(CheckersError::AwaitingOpponent),
            CheckersState::AwaitingMove => {}
        }
        let side = game.side_of(user).ok_or(CheckersError::NotAPlayer(user))?;
        if side != game.turn() {
            return Err(CheckersError::NotYourTurn(game.turn()));
        }

        let mv = parse_move(text)?;
        let outcome = game.apply_move(mv)?;
        debug!(chat, user, %mv, captured = outcome.captured.is_some(), "Checkers move");

        let ai_moves = game.ai_move(self.rng.as_ref())?;
        let view = game.view();

        // Retired under the game lock so the chat frees up exactly when the
        // game ends, and only this game is removed
        if view.state == CheckersState::Over {
            self.retire(chat, &shared, view.winner);
        }
        drop(game);

        Ok(PlayReport {
            view,
            ai_moves,
            continues_jump: outcome.continues_jump,
        })
    }

    fn retire(&self, chat: ChatId, shared: &SharedGame<CheckersGame>, winner: Option<Winner>) {
        // Recorded before the key frees up, so a new game's start clears it
        self.finished.insert(chat, winner);
        if !self.games.remove_game(&chat, shared) {
            // The chat already holds a newer game
            self.finished.remove(&chat);
            return;
        }
        info!(chat, ?winner, "Checkers game over");
    }

    /// Abandon the game in `chat`
    pub fn end(&self, chat: ChatId) -> Result<CheckersView, CheckersError> {
        let shared = self.lookup(chat)?;
        let game = lock_game(&shared);
        if !self.games.remove_game(&chat, &shared) {
            // Finished or ended by someone else while we waited for the lock
            return Err(self.missing(chat));
        }
        let view = game.view();
        drop(game);

        info!(chat, "Checkers game ended on request");
        Ok(view)
    }

    pub fn view(&self, chat: ChatId) -> Result<CheckersView, CheckersError> {
        let shared = self.lookup(chat)?;
        let view = lock_game(&shared).view();
        Ok(view)
    }

    /// Chats in which `user` holds a seat
    pub fn games_for(&self, user: UserId) -> Vec<(ChatId, CheckersView)> {
        let mut games: Vec<_> = self
            .games
            .keys()
            .into_iter()
            .filter_map(|chat| {
                self.games
                    .with(&chat, |game| game.is_player(user).then(|| game.view()))
                    .flatten()
                    .map(|view| (chat, view))
            })
            .collect();
        games.sort_by_key(|(chat, _)| *chat);
        games
    }

    pub fn active_count(&self) -> usize {
        self.games.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::random::ScriptedRandom;

    fn engine() -> CheckersEngine {
        CheckersEngine::new(CheckersConfig::default(), Arc::new(ScriptedRandom::default()))
    }

    #[test]
    fn test_one_game_per_chat() {
        let engine = engine();
        engine.start(10, 1, Opponent::Human).unwrap();
        assert!(matches!(
            engine.start(10, 2, Opponent::Ai),
            Err(CheckersError::GameInProgress(10))
        ));
        engine.start(11, 2, Opponent::Ai).unwrap();
        assert_eq!(engine.active_count(), 2);
    }

    #[test]
    fn test_turn_ownership() {
        let engine = engine();
        engine.start(10, 1, Opponent::Human).unwrap();
        engine.join(10, 2).unwrap();

        assert_eq!(engine.play(10, 2, "B6-A5").unwrap_err().kind(), ErrorKind::Authorization);
        assert_eq!(engine.play(10, 3, "B6-A5").unwrap_err().kind(), ErrorKind::Authorization);
        assert!(matches!(
            engine.play(10, 1, "B6A5"),
            Err(CheckersError::Notation(_))
        ));

        // Row 6 is index 5: light man on (5, 0) steps to (4, 1)
        let report = engine.play(10, 1, "A6-B5").unwrap();
        assert!(report.ai_moves.is_empty());
        assert_eq!(report.view.moves_played, 1);
        engine.play(10, 2, "B3-A4").unwrap();
    }

    #[test]
    fn test_ai_answers_in_same_call() {
        let engine = engine();
        engine.start(10, 1, Opponent::Ai).unwrap();
        let report = engine.play(10, 1, "A6-B5").unwrap();
        assert_eq!(report.ai_moves.len(), 1);
        assert_eq!(report.view.moves_played, 2);
        assert_eq!(report.view.turn, crate::checkers::board::Side::Light);
    }

    #[test]
    fn test_end_and_lookup_errors() {
        let engine = engine();
        assert_eq!(engine.view(10).unwrap_err().kind(), ErrorKind::NotFound);
        engine.start(10, 1, Opponent::Ai).unwrap();
        engine.end(10).unwrap();
        assert!(matches!(engine.view(10), Err(CheckersError::GameNotFound(10))));
        engine.start(10, 1, Opponent::Human).unwrap();
    }

    #[test]
    fn test_games_for_user() {
        let engine = engine();
        engine.start(20, 1, Opponent::Human).unwrap();
        engine.start(10, 1, Opponent::Ai).unwrap();
        engine.start(30, 2, Opponent::Human).unwrap();
        engine.join(30, 1).unwrap();

        let chats: Vec<ChatId> = engine.games_for(1).into_iter().map(|(chat, _)| chat).collect();
        assert_eq!(chats, vec![10, 20, 30]);
        assert!(engine.games_for(9).is_empty());
    }

    /// Light man on C4 about to take the last dark man on B3
    fn one_jump_from_victory(light: UserId) -> CheckersGame {
        use crate::checkers::board::{Board, Piece, Side, Square};

        let mut board = Board::empty();
        board.set(Square { row: 3, col: 2 }, Some(Piece::man(Side::Light)));
        board.set(Square { row: 2, col: 1 }, Some(Piece::man(Side::Dark)));
        CheckersGame::vs_ai(light).with_board(board, Side::Light)
    }

    #[test]
    fn test_finished_game_frees_the_chat_at_once() {
        let engine = engine();
        engine.start_game(10, one_jump_from_victory(1)).unwrap();

        let report = engine.play(10, 1, "C4-A2").unwrap();
        assert_eq!(report.view.state, CheckersState::Over);
        assert_eq!(report.view.winner, Some(Winner::Light));

        // Nothing lingers between the winning move and the next start
        assert_eq!(engine.active_count(), 0);
        assert!(matches!(engine.end(10), Err(CheckersError::GameEnded(10))));
        engine.start(10, 2, Opponent::Human).unwrap();
        assert_eq!(engine.view(10).unwrap().light, 2);
    }

    #[test]
    fn test_late_retirement_spares_a_new_game() {
        let engine = engine();
        engine.start_game(10, one_jump_from_victory(1)).unwrap();
        let stale = engine.games.get(&10).unwrap();

        // The chat was ended and restarted before the old game could retire
        engine.end(10).unwrap();
        engine.start(10, 2, Opponent::Human).unwrap();
        engine.retire(10, &stale, Some(Winner::Light));

        assert_eq!(engine.view(10).unwrap().light, 2);
        assert_eq!(engine.active_count(), 1);
        engine.end(10).unwrap();
        assert!(matches!(engine.view(10), Err(CheckersError::GameNotFound(10))));
    }
}
