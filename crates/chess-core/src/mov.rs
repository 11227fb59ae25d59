//! Compact move encoding.

use crate::{Piece, Square};
use std::fmt;

/// What kind of move a [`Move`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MoveFlag {
    Normal = 0,
    DoublePush = 1,
    /// King towards the h-side rook. The king lands on g1/g8.
    CastleKingside = 2,
    /// King towards the a-side rook. The king lands on c1/c8.
    CastleQueenside = 3,
    EnPassant = 4,
    PromoteKnight = 5,
    PromoteBishop = 6,
    PromoteRook = 7,
    PromoteQueen = 8,
}

impl MoveFlag {
    const fn from_bits(bits: u8) -> Option<MoveFlag> {
        match bits {
            0 => Some(MoveFlag::Normal),
            1 => Some(MoveFlag::DoublePush),
            2 => Some(MoveFlag::CastleKingside),
            3 => Some(MoveFlag::CastleQueenside),
            4 => Some(MoveFlag::EnPassant),
            5 => Some(MoveFlag::PromoteKnight),
            6 => Some(MoveFlag::PromoteBishop),
            7 => Some(MoveFlag::PromoteRook),
            8 => Some(MoveFlag::PromoteQueen),
            _ => None,
        }
    }

    #[inline]
    pub const fn promotion_piece(self) -> Option<Piece> {
        match self {
            MoveFlag::PromoteKnight => Some(Piece::Knight),
            MoveFlag::PromoteBishop => Some(Piece::Bishop),
            MoveFlag::PromoteRook => Some(Piece::Rook),
            MoveFlag::PromoteQueen => Some(Piece::Queen),
            _ => None,
        }
    }

    /// Flag for promoting to `piece`; `None` for pawns and kings.
    #[inline]
    pub const fn promotion(piece: Piece) -> Option<MoveFlag> {
        match piece {
            Piece::Knight => Some(MoveFlag::PromoteKnight),
            Piece::Bishop => Some(MoveFlag::PromoteBishop),
            Piece::Rook => Some(MoveFlag::PromoteRook),
            Piece::Queen => Some(MoveFlag::PromoteQueen),
            Piece::Pawn | Piece::King => None,
        }
    }

    #[inline]
    pub const fn is_promotion(self) -> bool {
        self.promotion_piece().is_some()
    }

    #[inline]
    pub const fn is_underpromotion(self) -> bool {
        matches!(
            self,
            MoveFlag::PromoteKnight | MoveFlag::PromoteBishop | MoveFlag::PromoteRook
        )
    }

    #[inline]
    pub const fn is_castling(self) -> bool {
        matches!(self, MoveFlag::CastleKingside | MoveFlag::CastleQueenside)
    }
}

/// A move packed into 16 bits: 6 bits origin, 6 bits destination, 4 bits flag.
///
/// Castling is stored as king origin to king destination. In Chess960 the two
/// may coincide; the flag alone then identifies the move.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Move(u16);

impl Move {
    /// "No move". Never produced by move generation (a1a1 with no flag).
    pub const NULL: Move = Move(0);

    #[inline]
    pub const fn new(from: Square, to: Square, flag: MoveFlag) -> Self {
        Move((from.index() as u16) | ((to.index() as u16) << 6) | ((flag as u16) << 12))
    }

    #[inline]
    pub const fn normal(from: Square, to: Square) -> Self {
        Self::new(from, to, MoveFlag::Normal)
    }

    /// Rebuilds a move from [`Move::raw`]. Unknown flag bits yield `None`.
    #[inline]
    pub const fn from_raw(raw: u16) -> Option<Self> {
        match MoveFlag::from_bits((raw >> 12) as u8) {
            Some(_) => Some(Move(raw)),
            None => None,
        }
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn from(self) -> Square {
        Square::from_index_masked((self.0 & 0x3F) as u8)
    }

    #[inline]
    pub const fn to(self) -> Square {
        Square::from_index_masked(((self.0 >> 6) & 0x3F) as u8)
    }

    #[inline]
    pub const fn flag(self) -> MoveFlag {
        match MoveFlag::from_bits((self.0 >> 12) as u8) {
            Some(flag) => flag,
            None => MoveFlag::Normal,
        }
    }

    #[inline]
    pub const fn is_promotion(self) -> bool {
        self.flag().is_promotion()
    }

    #[inline]
    pub const fn is_castling(self) -> bool {
        self.flag().is_castling()
    }

    /// Coordinate notation with the king's destination for castling (`e1g1`).
    pub fn to_uci(self) -> String {
        if self.is_null() {
            return "0000".to_string();
        }
        let mut s = format!("{}{}", self.from(), self.to());
        if let Some(piece) = self.flag().promotion_piece() {
            s.push(piece.to_fen_char(crate::Color::Black));
        }
        s
    }

    /// Parses coordinate notation without a position.
    ///
    /// Only the promotion flag can be inferred from text; callers resolve the
    /// remaining flags against the legal move list.
    pub fn from_uci(s: &str) -> Option<Self> {
        if !(4..=5).contains(&s.len()) || !s.is_ascii() {
            return None;
        }
        let from = Square::from_algebraic(&s[0..2])?;
        let to = Square::from_algebraic(&s[2..4])?;
        let flag = match s[4..].chars().next() {
            None => MoveFlag::Normal,
            Some(c) => {
                let (piece, _) = Piece::from_fen_char(c)?;
                MoveFlag::promotion(piece)?
            }
        };
        Some(Move::new(from, to, flag))
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({})", self.to_uci())
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}
