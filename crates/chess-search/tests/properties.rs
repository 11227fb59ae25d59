//! Search invariants over random game positions.

use chess_engine::Position;
use chess_search::{
    extract_pv, is_mate_score, Engine, EngineConfig, NullSink, PieceSquareEvaluator, SearchLimits,
    INFINITE, MATE,
};
use proptest::prelude::*;

/// Plays `choices` as indexes into the legal move lists, stopping early when
/// the game ends.
fn playout(choices: &[usize]) -> Position<'static> {
    let mut position = Position::startpos();
    for &choice in choices {
        let moves = position.legal_moves();
        if moves.is_empty() {
            break;
        }
        let m = moves.as_slice()[choice % moves.len()];
        let Some(next) = position.play(m).map(|child| child.detached()) else {
            break;
        };
        position = next;
    }
    position
}

fn small_engine() -> Engine {
    let config = EngineConfig {
        hash_mb: 1,
        ..Default::default()
    };
    Engine::new(config, PieceSquareEvaluator::new())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn best_move_is_legal(choices in prop::collection::vec(0usize..256, 0..40)) {
        let position = playout(&choices);
        let legal = position.legal_moves();
        let result = small_engine().think(&position, &SearchLimits::depth(3), &NullSink);
        if legal.is_empty() {
            prop_assert!(result.best_move.is_null());
        } else {
            prop_assert!(legal.contains(result.best_move), "{}", position.fen());
            prop_assert!(result.score > -INFINITE && result.score < INFINITE);
        }
    }

    #[test]
    fn reported_line_replays(choices in prop::collection::vec(0usize..256, 0..40)) {
        let position = playout(&choices);
        let mut engine = small_engine();
        let result = engine.think(&position, &SearchLimits::depth(3), &NullSink);
        prop_assert!(result.pv.len() <= chess_search::PV_MAX_LENGTH);
        // Validation keeps an already legal line unchanged.
        let checked = extract_pv(&position, &result.pv, engine.tt());
        prop_assert!(checked.len() >= result.pv.len());
        prop_assert_eq!(&checked[..result.pv.len()], &result.pv[..]);
    }

    #[test]
    fn mate_scores_come_with_a_mating_line(choices in prop::collection::vec(0usize..256, 20..60)) {
        let position = playout(&choices);
        let result = small_engine().think(&position, &SearchLimits::depth(2), &NullSink);
        if !result.best_move.is_null() && is_mate_score(result.score) {
            prop_assert!(!result.pv.is_empty());
        }
        if result.score == MATE - 1 {
            let child = position.play(result.best_move).unwrap();
            prop_assert!(child.in_check() && child.legal_moves().is_empty());
        }
    }
}
