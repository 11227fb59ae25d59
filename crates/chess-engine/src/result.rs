//! Terminal-state classification: mate, draws, repetitions.

use std::fmt;

use crate::{Bitboard, Position};
use chess_core::Piece;

/// Outcome of a position as seen by the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    /// Play goes on.
    Open,
    /// The side to move is checkmated.
    Mate,
    Draw(DrawReason),
}

impl GameResult {
    #[inline]
    pub fn is_decided(self) -> bool {
        self != GameResult::Open
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    /// Neither side can mate.
    Material,
    /// 100 plies without a capture or pawn move.
    FiftyMoves,
    Stalemate,
    /// Third occurrence of the same position.
    Repetition,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameResult::Open => write!(f, "open"),
            GameResult::Mate => write!(f, "checkmate"),
            GameResult::Draw(reason) => write!(f, "draw ({})", reason),
        }
    }
}

impl fmt::Display for DrawReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DrawReason::Material => "insufficient material",
            DrawReason::FiftyMoves => "fifty-move rule",
            DrawReason::Stalemate => "stalemate",
            DrawReason::Repetition => "threefold repetition",
        };
        f.write_str(text)
    }
}

impl Position<'_> {
    /// Classifies the position. The answer is cached until the next move.
    pub fn result(&mut self) -> GameResult {
        if let Some(result) = self.result {
            return result;
        }
        let result = self.classify();
        self.result = Some(result);
        result
    }

    /// Uncached [`Position::result`].
    pub fn classify(&self) -> GameResult {
        if self.is_material_draw() {
            return GameResult::Draw(DrawReason::Material);
        }
        if self.repetitions() >= 2 {
            return GameResult::Draw(DrawReason::Repetition);
        }
        if !self.has_legal_move() {
            return if self.in_check() {
                GameResult::Mate
            } else {
                GameResult::Draw(DrawReason::Stalemate)
            };
        }
        if self.draw_plies() >= 100 {
            return GameResult::Draw(DrawReason::FiftyMoves);
        }
        GameResult::Open
    }

    /// Earlier occurrences of this position with the same side to move,
    /// looking back no further than the last irreversible move.
    pub fn repetitions(&self) -> usize {
        let hash = self.hash();
        self.same_side_ancestors()
            .filter(|&ancestor| ancestor == hash)
            .count()
    }

    fn same_side_ancestors(&self) -> impl Iterator<Item = u64> + '_ {
        self.ancestor_hashes()
            .take(self.draw_plies() as usize)
            .skip(1)
            .step_by(2)
    }

    /// Draw test for interior search nodes: one earlier occurrence is
    /// enough, and stalemate is left to the move loop. A mate delivered on
    /// the hundredth quiet ply is not a draw.
    pub fn is_draw_in_tree(&self) -> bool {
        if self.is_material_draw() {
            return true;
        }
        if self.draw_plies() >= 100 {
            return !self.in_check() || self.has_legal_move();
        }
        let hash = self.hash();
        self.same_side_ancestors().any(|ancestor| ancestor == hash)
    }

    /// Bare kings, or kings with minor pieces that can never mate: a single
    /// knight or bishop, or any number of bishops all on one square colour.
    pub fn is_material_draw(&self) -> bool {
        let heavy = self.pieces(Piece::Pawn) | self.pieces(Piece::Rook) | self.pieces(Piece::Queen);
        if heavy.is_not_empty() {
            return false;
        }
        let knights = self.pieces(Piece::Knight);
        let bishops = self.pieces(Piece::Bishop);
        let minors = knights | bishops;
        if !minors.more_than_one() {
            return true;
        }
        knights.is_empty()
            && ((bishops & Bitboard::DARK_SQUARES).is_empty()
                || (bishops & !Bitboard::DARK_SQUARES).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::Move;

    fn replay<'h>(fen: &str, moves: &[&str], history: &'h mut Vec<u64>) -> Position<'h> {
        let mut position = Position::from_fen(fen).unwrap();
        for text in moves {
            let m = position.parse_uci_move(text).unwrap();
            history.push(position.hash());
            let next = position.play(m).unwrap().detached();
            position = next;
        }
        position.with_history(history)
    }

    #[test]
    fn checkmate() {
        let mut position =
            Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
                .unwrap();
        assert_eq!(position.legal_moves().len(), 0);
        assert_eq!(position.result(), GameResult::Mate);
        assert!(position.result().is_decided());
    }

    #[test]
    fn stalemate() {
        let mut position = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(position.result(), GameResult::Draw(DrawReason::Stalemate));
    }

    #[test]
    fn insufficient_material() {
        for fen in [
            "8/8/4k3/8/8/3K4/8/8 w - - 0 1",
            "8/8/4k3/8/8/3KN3/8/8 w - - 0 1",
            "8/8/4k3/8/8/3KB3/8/8 w - - 0 1",
            "8/3b4/4k3/8/8/3K4/4B3/8 w - - 0 1",
        ] {
            let position = Position::from_fen(fen).unwrap();
            assert!(position.is_material_draw(), "{}", fen);
        }
        for fen in [
            "8/8/4k3/8/8/3KNN2/8/8 w - - 0 1",
            "8/2b5/4k3/8/8/3K4/4B3/8 w - - 0 1",
            "8/8/4k3/8/8/3KP3/8/8 w - - 0 1",
        ] {
            let position = Position::from_fen(fen).unwrap();
            assert!(!position.is_material_draw(), "{}", fen);
        }
    }

    #[test]
    fn fifty_move_rule() {
        let mut position = Position::from_fen("8/8/4k3/8/8/3K4/8/R7 w - - 100 80").unwrap();
        assert_eq!(position.result(), GameResult::Draw(DrawReason::FiftyMoves));
        let mut fresh = Position::from_fen("8/8/4k3/8/8/3K4/8/R7 w - - 99 80").unwrap();
        assert_eq!(fresh.result(), GameResult::Open);
    }

    #[test]
    fn mate_beats_fifty_move_rule() {
        let mut position =
            Position::from_fen("7k/6Q1/6K1/8/8/8/8/8 b - - 100 90").unwrap();
        assert_eq!(position.result(), GameResult::Mate);
    }

    #[test]
    fn fifty_move_draw_in_tree_spares_mate() {
        let mated = Position::from_fen("7k/6Q1/6K1/8/8/8/8/8 b - - 100 90").unwrap();
        assert!(!mated.is_draw_in_tree());

        let quiet = Position::from_fen("8/8/4k3/8/8/3K4/8/R7 w - - 100 80").unwrap();
        assert!(quiet.is_draw_in_tree());
        // In check with an escape is still a draw.
        let checked = Position::from_fen("8/8/4k3/8/8/3K4/8/4R3 b - - 100 80").unwrap();
        assert!(checked.in_check());
        assert!(checked.is_draw_in_tree());
    }

    #[test]
    fn threefold_repetition_on_third_occurrence() {
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
        let mut history = Vec::new();
        let mut position = replay(chess_core::Fen::STARTPOS, &shuffle, &mut history);
        // Second occurrence of the start position.
        assert_eq!(position.repetitions(), 1);
        assert_eq!(position.result(), GameResult::Open);
        assert!(position.is_draw_in_tree());

        let mut history = Vec::new();
        let twice: Vec<&str> = shuffle.iter().chain(shuffle.iter()).copied().collect();
        let mut position = replay(chess_core::Fen::STARTPOS, &twice, &mut history);
        assert_eq!(position.repetitions(), 2);
        assert_eq!(position.result(), GameResult::Draw(DrawReason::Repetition));
    }

    #[test]
    fn repetition_through_parent_chain() {
        let root = Position::startpos();
        let mut node = root.make_child();
        assert!(node.apply_move(Move::normal(
            chess_core::Square::G1,
            chess_core::Square::from_algebraic("f3").unwrap()
        )));
        let a = node;
        let b = a.play(a.parse_uci_move("g8f6").unwrap()).unwrap();
        let c = b.play(b.parse_uci_move("f3g1").unwrap()).unwrap();
        let d = c.play(c.parse_uci_move("f6g8").unwrap()).unwrap();
        assert_eq!(d.hash(), root.hash());
        assert!(d.is_draw_in_tree());
        assert!(!c.is_draw_in_tree());
    }

    #[test]
    fn irreversible_move_cuts_repetition_window() {
        let mut history = Vec::new();
        let position = replay(
            chess_core::Fen::STARTPOS,
            &["g1f3", "g8f6", "f3g1", "f6g8", "e2e4", "e7e5"],
            &mut history,
        );
        assert_eq!(position.draw_plies(), 0);
        assert_eq!(position.repetitions(), 0);
    }

    #[test]
    fn display() {
        assert_eq!(
            GameResult::Draw(DrawReason::Repetition).to_string(),
            "draw (threefold repetition)"
        );
        assert_eq!(GameResult::Mate.to_string(), "checkmate");
    }
}
