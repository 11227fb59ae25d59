//! Standard Algebraic Notation (SAN) rendering.
//!
//! Examples: "e4", "Nf3", "Bxc6", "O-O", "e8=Q", "Nbd2", "R1e1", "Qh4#".

use crate::{MoveList, Position};
use chess_core::{Move, MoveFlag, Piece};

/// Renders a legal move of `position` in SAN.
pub fn move_to_san(position: &Position<'_>, m: Move) -> String {
    let legal = position.legal_moves();
    move_to_san_with(position, m, &legal)
}

/// Like [`move_to_san`], reusing an already generated legal move list for
/// disambiguation.
pub fn move_to_san_with(position: &Position<'_>, m: Move, legal: &MoveList) -> String {
    let mut san = String::new();

    match m.flag() {
        MoveFlag::CastleKingside => san.push_str("O-O"),
        MoveFlag::CastleQueenside => san.push_str("O-O-O"),
        _ => {
            let Some((piece, _)) = position.piece_at(m.from()) else {
                return m.to_uci();
            };
            if let Some(letter) = piece.san_char() {
                san.push(letter);
                san.push_str(&disambiguation(position, m, piece, legal));
            }
            if position.is_capture(m) {
                if piece == Piece::Pawn {
                    san.push(m.from().file().to_char());
                }
                san.push('x');
            }
            san.push_str(&m.to().to_algebraic());
            if let Some(promoted) = m.flag().promotion_piece().and_then(Piece::san_char) {
                san.push('=');
                san.push(promoted);
            }
        }
    }

    if let Some(child) = position.play(m) {
        if child.in_check() {
            san.push(if child.has_legal_move() { '+' } else { '#' });
        }
    }
    san
}

/// Renders a line of moves starting at `position`, stopping at the first
/// move that is not legal.
pub fn line_to_san(position: &Position<'_>, moves: &[Move]) -> Vec<String> {
    let mut out = Vec::with_capacity(moves.len());
    let mut current = position.detached();
    for &m in moves {
        if !current.legal_moves().contains(m) {
            break;
        }
        out.push(move_to_san(&current, m));
        let next = match current.play(m) {
            Some(child) => child.detached(),
            None => break,
        };
        current = next;
    }
    out
}

/// File, rank or both, whichever tells `m` apart from other moves of the
/// same piece kind to the same square.
fn disambiguation(position: &Position<'_>, m: Move, piece: Piece, legal: &MoveList) -> String {
    let rivals: Vec<Move> = legal
        .iter()
        .copied()
        .filter(|&other| {
            other.to() == m.to()
                && other.from() != m.from()
                && !other.is_castling()
                && position.piece_at(other.from()).map(|(p, _)| p) == Some(piece)
        })
        .collect();

    if rivals.is_empty() {
        return String::new();
    }
    let from = m.from();
    let same_file = rivals.iter().any(|r| r.from().file() == from.file());
    let same_rank = rivals.iter().any(|r| r.from().rank() == from.rank());
    match (same_file, same_rank) {
        (false, _) => from.file().to_char().to_string(),
        (true, false) => from.rank().to_char().to_string(),
        (true, true) => from.to_algebraic(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn san(fen: &str, uci: &str) -> String {
        let position = Position::from_fen(fen).unwrap();
        let m = position.parse_uci_move(uci).unwrap();
        move_to_san(&position, m)
    }

    #[test]
    fn san_pawn_push_and_knight() {
        assert_eq!(san(chess_core::Fen::STARTPOS, "e2e4"), "e4");
        assert_eq!(san(chess_core::Fen::STARTPOS, "g1f3"), "Nf3");
    }

    #[test]
    fn san_pawn_captures() {
        assert_eq!(
            san("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2", "e4d5"),
            "exd5"
        );
        assert_eq!(san("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1", "e5d6"), "exd6");
    }

    #[test]
    fn san_castling() {
        let fen = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1";
        assert_eq!(san(fen, "e1g1"), "O-O");
        assert_eq!(san(fen, "e1c1"), "O-O-O");
    }

    #[test]
    fn san_promotion() {
        assert_eq!(san("8/P7/8/8/8/8/8/4K1k1 w - - 0 1", "a7a8q"), "a8=Q");
        assert_eq!(san("8/P7/8/8/8/8/8/4K1k1 w - - 0 1", "a7a8n"), "a8=N");
    }

    #[test]
    fn san_disambiguation() {
        assert_eq!(san("7k/8/8/8/8/8/8/1N1K1N2 w - - 0 1", "b1d2"), "Nbd2");
        assert_eq!(san("7k/8/8/R7/8/8/8/R3K3 w - - 0 1", "a1a3"), "R1a3");
        assert_eq!(
            san("8/7k/8/8/8/2Q1Q3/8/2Q1K3 w - - 0 1", "c3d2"),
            "Qc3d2"
        );
    }

    #[test]
    fn san_check_and_mate() {
        assert_eq!(san("7k/8/8/8/8/8/8/4K1Q1 w - - 0 1", "g1g7"), "Qg7+");
        assert_eq!(san("6k1/5ppp/8/8/8/8/8/R3K3 w Q - 0 1", "a1a8"), "Ra8#");
    }

    #[test]
    fn line_rendering_stops_at_illegal_moves() {
        let position = Position::startpos();
        let e4 = position.parse_uci_move("e2e4").unwrap();
        let after = position.play(e4).unwrap();
        let e5 = after.parse_uci_move("e7e5").unwrap();
        let line = line_to_san(&position, &[e4, e5, e4]);
        assert_eq!(line, vec!["e4", "e5"]);
    }

    #[test]
    fn every_start_move_renders_uniquely() {
        let position = Position::startpos();
        let legal = position.legal_moves();
        let mut rendered: Vec<String> = legal
            .iter()
            .map(|&m| move_to_san_with(&position, m, &legal))
            .collect();
        rendered.sort();
        rendered.dedup();
        assert_eq!(rendered.len(), 20);
    }
}
