//! Checkers through the engine: captures, turn passing and full AI games

use botarcade::{
    checkers::{CheckersEngine, CheckersError, CheckersState, Opponent, Side, Square},
    config::CheckersConfig,
    errors::ErrorKind,
    random::{RandomSource, SeededRandom, ThreadRandom},
};
use std::sync::Arc;

fn square(name: &str) -> Square {
    botarcade::checkers::notation::parse_square(name, name).unwrap()
}

#[tokio::test]
async fn test_exchange_of_captures_between_humans() {
    let engine = CheckersEngine::new(CheckersConfig::default(), Arc::new(ThreadRandom));
    engine.start(7, 1, Opponent::Human).unwrap();
    assert!(matches!(
        engine.play(7, 1, "C6-D5"),
        Err(CheckersError::AwaitingOpponent)
    ));
    engine.join(7, 2).unwrap();

    engine.play(7, 1, "C6-D5").unwrap();
    engine.play(7, 2, "F3-E4").unwrap();

    // Light jumps E4 and lands on the square dark just vacated
    let report = engine.play(7, 1, "D5-F3").unwrap();
    assert!(!report.continues_jump);
    assert_eq!(report.view.board.count(Side::Dark), 11);
    assert_eq!(report.view.board.get(square("E4")), None);
    assert_eq!(report.view.turn, Side::Dark);

    // Dark recaptures from G2 over F3
    let report = engine.play(7, 2, "G2-E4").unwrap();
    assert_eq!(report.view.board.count(Side::Light), 11);
    assert_eq!(report.view.turn, Side::Light);
    assert_eq!(report.view.moves_played, 4);

    assert!(matches!(
        engine.play(7, 1, "A6-A5"),
        Err(CheckersError::IllegalMove(_))
    ));
}

#[tokio::test]
async fn test_games_against_the_ai_always_finish() {
    let config = CheckersConfig {
        quiet_move_draw_limit: Some(40),
    };

    for seed in 0..5u64 {
        let rng = Arc::new(SeededRandom::new(seed));
        let engine = CheckersEngine::new(config.clone(), rng.clone());
        let chat = seed as i64;
        let mut view = engine.start(chat, 1, Opponent::Ai).unwrap();
        let mut pieces = view.board.count(Side::Light) + view.board.count(Side::Dark);

        for _ in 0..5000 {
            let candidates = match view.pending_jump {
                Some(from) => view.board.captures_from(from),
                None => view.board.legal_moves(Side::Light, false),
            };
            assert!(!candidates.is_empty(), "live game without a light move");
            let mv = candidates[rng.index(candidates.len())];

            let report = engine.play(chat, 1, &mv.to_string()).unwrap();
            view = report.view;

            let now = view.board.count(Side::Light) + view.board.count(Side::Dark);
            assert!(now <= pieces);
            pieces = now;

            if view.state == CheckersState::Over {
                break;
            }
            assert_eq!(view.turn, Side::Light);
        }

        assert_eq!(view.state, CheckersState::Over, "seed {} never finished", seed);
        assert!(view.winner.is_some());
        assert_eq!(engine.view(chat).unwrap_err().kind(), ErrorKind::Ended);
        engine.start(chat, 1, Opponent::Ai).unwrap();
    }
}
