//! Forsyth-Edwards Notation tokenising.
//!
//! Parsing is best-effort: only a piece placement that cannot describe an
//! 8x8 board is an error. Everything after the placement falls back to a
//! default when missing or malformed, and unknown placement characters are
//! skipped. Callers that need strict validation check the result themselves.

use thiserror::Error;

use crate::{Color, Piece, Square};

/// A FEN string that does not describe a board at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("empty FEN string")]
    Empty,

    #[error("expected 8 ranks in piece placement, got {0}")]
    RankCount(usize),

    #[error("rank {rank} describes more than 8 files")]
    RankOverflow { rank: u8 },
}

/// The fields of a FEN record.
///
/// Castling is kept as text because its letters can only be resolved to
/// rooks against the placement (`KQkq` or Chess960 file letters).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fen {
    pub board: [Option<(Piece, Color)>; 64],
    pub side_to_move: Color,
    pub castling: String,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl Fen {
    pub const STARTPOS: &'static str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    pub fn parse(fen: &str) -> Result<Self, FenError> {
        let mut fields = fen.split_whitespace();
        let placement = fields.next().ok_or(FenError::Empty)?;
        let board = parse_placement(placement)?;

        let side_to_move = match fields.next() {
            Some("b") | Some("B") => Color::Black,
            _ => Color::White,
        };
        let castling = fields
            .next()
            .filter(|c| c.chars().all(|ch| ch == '-' || ch.is_ascii_alphabetic()))
            .unwrap_or("-")
            .to_string();
        let en_passant = fields.next().and_then(Square::from_algebraic);
        let halfmove_clock = fields.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let fullmove_number = fields
            .next()
            .and_then(|s| s.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(1);

        Ok(Fen {
            board,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        })
    }

    /// Writes the placement field for `board`.
    pub fn placement(board: &[Option<(Piece, Color)>; 64]) -> String {
        let mut out = String::with_capacity(64);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                match board[Square::from_coords(file, rank).idx()] {
                    Some((piece, color)) => {
                        if empty > 0 {
                            out.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        out.push(piece.to_fen_char(color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out
    }
}

fn parse_placement(placement: &str) -> Result<[Option<(Piece, Color)>; 64], FenError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::RankCount(ranks.len()));
    }

    let mut board = [None; 64];
    for (i, text) in ranks.iter().enumerate() {
        let rank = 7 - i as u8;
        let mut file = 0u8;
        for c in text.chars() {
            if let Some(skip) = c.to_digit(10) {
                file += skip as u8;
                if file > 8 {
                    return Err(FenError::RankOverflow { rank: rank + 1 });
                }
            } else if let Some(piece) = Piece::from_fen_char(c) {
                if file >= 8 {
                    return Err(FenError::RankOverflow { rank: rank + 1 });
                }
                board[Square::from_coords(file, rank).idx()] = Some(piece);
                file += 1;
            }
        }
    }
    Ok(board)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_fields() {
        let fen = Fen::parse(Fen::STARTPOS).unwrap();
        assert_eq!(fen.side_to_move, Color::White);
        assert_eq!(fen.castling, "KQkq");
        assert_eq!(fen.en_passant, None);
        assert_eq!(fen.halfmove_clock, 0);
        assert_eq!(fen.fullmove_number, 1);
        assert_eq!(fen.board[Square::E1.idx()], Some((Piece::King, Color::White)));
        assert_eq!(fen.board[Square::D8.idx()], Some((Piece::Queen, Color::Black)));
    }

    #[test]
    fn placement_round_trips() {
        let text = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R";
        let fen = Fen::parse(text).unwrap();
        assert_eq!(Fen::placement(&fen.board), text);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let fen = Fen::parse("8/8/8/4k3/8/8/8/4K3").unwrap();
        assert_eq!(fen.side_to_move, Color::White);
        assert_eq!(fen.castling, "-");
        assert_eq!(fen.en_passant, None);
        assert_eq!(fen.fullmove_number, 1);
    }

    #[test]
    fn malformed_trailing_fields_are_tolerated() {
        let fen = Fen::parse("8/8/8/4k3/8/8/8/4K3 b ?? z9 abc -4").unwrap();
        assert_eq!(fen.side_to_move, Color::Black);
        assert_eq!(fen.castling, "-");
        assert_eq!(fen.en_passant, None);
        assert_eq!(fen.halfmove_clock, 0);
        assert_eq!(fen.fullmove_number, 1);
    }

    #[test]
    fn unknown_placement_characters_are_skipped() {
        let fen = Fen::parse("8/8/8/4k3/8/8/8/4Kx3 w - - 0 1").unwrap();
        assert_eq!(fen.board[Square::E1.idx()], Some((Piece::King, Color::White)));
    }

    #[test]
    fn chess960_castling_letters_are_kept() {
        let fen = Fen::parse("bqnbrkrn/pppppppp/8/8/8/8/PPPPPPPP/BQNBRKRN w GEge - 0 1").unwrap();
        assert_eq!(fen.castling, "GEge");
    }

    #[test]
    fn unusable_placements_are_errors() {
        assert_eq!(Fen::parse(""), Err(FenError::Empty));
        assert_eq!(
            Fen::parse("8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::RankCount(7))
        );
        assert_eq!(
            Fen::parse("rnbqkbnrr/8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::RankOverflow { rank: 8 })
        );
        assert_eq!(
            Fen::parse("8/8/8/8/8/8/8/45 w - - 0 1"),
            Err(FenError::RankOverflow { rank: 1 })
        );
    }

    #[test]
    fn error_messages_name_the_problem() {
        assert!(FenError::RankCount(3).to_string().contains('3'));
        assert!(FenError::RankOverflow { rank: 5 }.to_string().contains('5'));
    }
}
