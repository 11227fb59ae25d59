//! Side to move.

use std::ops::Not;

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Table index: 0 for White, 1 for Black.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Square-index delta of a single pawn push (+8 or -8).
    #[inline]
    pub const fn forward(self) -> i8 {
        match self {
            Color::White => 8,
            Color::Black => -8,
        }
    }

    /// Rank index (0-7) of this side's first rank.
    #[inline]
    pub const fn back_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    /// Maps an absolute rank index (0-7) to this side's point of view.
    #[inline]
    pub const fn relative_rank(self, rank: u8) -> u8 {
        match self {
            Color::White => rank,
            Color::Black => 7 - rank,
        }
    }

    /// +1 for White, -1 for Black. Used to turn white-relative scores around.
    #[inline]
    pub const fn sign(self) -> i32 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// The FEN side-to-move token.
    #[inline]
    pub const fn to_fen_char(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }
}

impl Not for Color {
    type Output = Color;

    #[inline]
    fn not(self) -> Color {
        self.opposite()
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_and_not_agree() {
        for c in Color::ALL {
            assert_eq!(!c, c.opposite());
            assert_eq!(!!c, c);
        }
    }

    #[test]
    fn forward_matches_rank_direction() {
        assert_eq!(Color::White.forward(), 8);
        assert_eq!(Color::Black.forward(), -8);
    }

    #[test]
    fn relative_rank() {
        assert_eq!(Color::White.relative_rank(1), 1);
        assert_eq!(Color::Black.relative_rank(1), 6);
        assert_eq!(Color::Black.relative_rank(Color::Black.back_rank()), 0);
    }

    #[test]
    fn sign_and_fen() {
        assert_eq!(Color::White.sign(), 1);
        assert_eq!(Color::Black.sign(), -1);
        assert_eq!(Color::White.to_fen_char(), 'w');
        assert_eq!(Color::Black.to_fen_char(), 'b');
    }
}
