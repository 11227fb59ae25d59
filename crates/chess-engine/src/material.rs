//! Material signatures.
//!
//! Each side's piece counts are packed in a mixed radix (pawns 0-8, knights,
//! bishops and rooks 0-2, queen 0-1), giving 486 values per side and
//! 486 * 486 keys overall. Anything outside those ranges, such as a third
//! knight or a second queen after promotion, is `Unusual`.

use chess_core::{Color, Piece};

/// Number of distinct `Standard` keys.
pub const MATERIAL_KEYS: usize = 486 * 486;

const SIDE_KEYS: u32 = 486;

/// Largest count each piece kind can have and still be encoded.
const LIMITS: [u32; 5] = [8, 2, 2, 2, 1];

/// Weight of one piece of each kind inside a side's radix.
const WEIGHTS: [u32; 5] = [1, 9, 27, 81, 243];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialSignature {
    Standard(u32),
    /// Counts that do not fit the radix. Recomputed from scratch whenever
    /// material changes, until the counts fit again.
    Unusual,
}

impl MaterialSignature {
    /// Encodes `counts[color][piece]` (king counts ignored).
    pub fn from_counts(counts: &[[u32; 6]; 2]) -> Self {
        let mut key = 0;
        for color in Color::ALL {
            let mut side = 0;
            for piece in &Piece::ALL[..5] {
                let n = counts[color.index()][piece.index()];
                if n > LIMITS[piece.index()] {
                    return MaterialSignature::Unusual;
                }
                side += n * WEIGHTS[piece.index()];
            }
            key += side * side_multiplier(color);
        }
        MaterialSignature::Standard(key)
    }

    /// Incremental update for one piece of `color` added (`delta = 1`) or
    /// removed (`delta = -1`). Returns `None` when the result cannot be
    /// encoded incrementally and has to be recomputed.
    ///
    /// `count_after` is the number of such pieces once the change is applied.
    pub fn adjust(self, piece: Piece, color: Color, count_after: u32, delta: i32) -> Option<Self> {
        let MaterialSignature::Standard(key) = self else {
            return None;
        };
        if piece == Piece::King || count_after > LIMITS[piece.index()] {
            return None;
        }
        let step = WEIGHTS[piece.index()] * side_multiplier(color);
        let key = if delta > 0 {
            key + step
        } else {
            key.checked_sub(step)?
        };
        Some(MaterialSignature::Standard(key))
    }

    #[inline]
    pub fn key(self) -> Option<u32> {
        match self {
            MaterialSignature::Standard(key) => Some(key),
            MaterialSignature::Unusual => None,
        }
    }

    /// Piece counts encoded in a `Standard` key, as `[color][piece]`.
    pub fn decode(key: u32) -> [[u32; 6]; 2] {
        let mut counts = [[0; 6]; 2];
        for color in Color::ALL {
            let mut side = (key / side_multiplier(color)) % SIDE_KEYS;
            for piece in Piece::ALL[..5].iter().rev() {
                counts[color.index()][piece.index()] = side / WEIGHTS[piece.index()];
                side %= WEIGHTS[piece.index()];
            }
            counts[color.index()][Piece::King.index()] = 1;
        }
        counts
    }
}

#[inline]
const fn side_multiplier(color: Color) -> u32 {
    match color {
        Color::White => 1,
        Color::Black => SIDE_KEYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_counts() -> [[u32; 6]; 2] {
        [[8, 2, 2, 2, 1, 1], [8, 2, 2, 2, 1, 1]]
    }

    #[test]
    fn full_board_is_the_largest_key() {
        let sig = MaterialSignature::from_counts(&start_counts());
        assert_eq!(sig, MaterialSignature::Standard(MATERIAL_KEYS as u32 - 1));
    }

    #[test]
    fn bare_kings_are_zero() {
        let sig = MaterialSignature::from_counts(&[[0, 0, 0, 0, 0, 1], [0, 0, 0, 0, 0, 1]]);
        assert_eq!(sig.key(), Some(0));
    }

    #[test]
    fn second_queen_is_unusual() {
        let mut counts = start_counts();
        counts[0][Piece::Queen.index()] = 2;
        assert_eq!(MaterialSignature::from_counts(&counts), MaterialSignature::Unusual);
    }

    #[test]
    fn incremental_matches_recount() {
        let mut counts = start_counts();
        let sig = MaterialSignature::from_counts(&counts);

        counts[1][Piece::Knight.index()] -= 1;
        let adjusted = sig.adjust(Piece::Knight, Color::Black, 1, -1);
        assert_eq!(adjusted, Some(MaterialSignature::from_counts(&counts)));
    }

    #[test]
    fn overflowing_promotion_needs_recount() {
        let sig = MaterialSignature::from_counts(&start_counts());
        assert_eq!(sig.adjust(Piece::Queen, Color::White, 2, 1), None);
        assert_eq!(MaterialSignature::Unusual.adjust(Piece::Pawn, Color::White, 3, -1), None);
    }

    #[test]
    fn decode_inverts_encoding() {
        let counts = [[5, 1, 0, 2, 0, 1], [3, 0, 2, 1, 1, 1]];
        let key = MaterialSignature::from_counts(&counts).key().unwrap();
        assert_eq!(MaterialSignature::decode(key), counts);
    }
}
