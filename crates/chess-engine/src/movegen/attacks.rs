//! Precomputed attack tables.
//!
//! Leapers use direct lookups. Sliders use one ray per direction and square:
//! the ray is cut at the first blocker, found with lsb on rays that point to
//! higher square indices and msb on rays that point to lower ones.

use crate::Bitboard;
use chess_core::{Color, Square};

const KNIGHT_ATTACKS: [Bitboard; 64] = leaper_table(&[
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
]);

const KING_ATTACKS: [Bitboard; 64] = leaper_table(&[
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
]);

const PAWN_ATTACKS: [[Bitboard; 64]; 2] = [
    leaper_table(&[(-1, 1), (1, 1)]),
    leaper_table(&[(-1, -1), (1, -1)]),
];

/// (file step, rank step) per direction, clockwise from north.
const DIRECTIONS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

const NORTH: usize = 0;
const NORTH_EAST: usize = 1;
const EAST: usize = 2;
const SOUTH_EAST: usize = 3;
const SOUTH: usize = 4;
const SOUTH_WEST: usize = 5;
const WEST: usize = 6;
const NORTH_WEST: usize = 7;

static RAYS: [[Bitboard; 64]; 8] = ray_table();
static BETWEEN: [[Bitboard; 64]; 64] = between_table();
static LINE: [[Bitboard; 64]; 64] = line_table();

#[inline]
pub fn knight_attacks(sq: Square) -> Bitboard {
    KNIGHT_ATTACKS[sq.idx()]
}

#[inline]
pub fn king_attacks(sq: Square) -> Bitboard {
    KING_ATTACKS[sq.idx()]
}

/// Squares a pawn of `color` on `sq` captures on.
#[inline]
pub fn pawn_attacks(sq: Square, color: Color) -> Bitboard {
    PAWN_ATTACKS[color.index()][sq.idx()]
}

#[inline]
fn positive_ray(dir: usize, sq: Square, occupied: Bitboard) -> Bitboard {
    let ray = RAYS[dir][sq.idx()];
    match (ray & occupied).lsb() {
        Some(blocker) => ray ^ RAYS[dir][blocker.idx()],
        None => ray,
    }
}

#[inline]
fn negative_ray(dir: usize, sq: Square, occupied: Bitboard) -> Bitboard {
    let ray = RAYS[dir][sq.idx()];
    match (ray & occupied).msb() {
        Some(blocker) => ray ^ RAYS[dir][blocker.idx()],
        None => ray,
    }
}

#[inline]
pub fn bishop_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    positive_ray(NORTH_EAST, sq, occupied)
        | positive_ray(NORTH_WEST, sq, occupied)
        | negative_ray(SOUTH_EAST, sq, occupied)
        | negative_ray(SOUTH_WEST, sq, occupied)
}

#[inline]
pub fn rook_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    positive_ray(NORTH, sq, occupied)
        | positive_ray(EAST, sq, occupied)
        | negative_ray(SOUTH, sq, occupied)
        | negative_ray(WEST, sq, occupied)
}

#[inline]
pub fn queen_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    bishop_attacks(sq, occupied) | rook_attacks(sq, occupied)
}

/// Squares strictly between `a` and `b`; empty unless they share a line.
#[inline]
pub fn between(a: Square, b: Square) -> Bitboard {
    BETWEEN[a.idx()][b.idx()]
}

/// The whole rank, file or diagonal through `a` and `b`; empty unless aligned.
#[inline]
pub fn line(a: Square, b: Square) -> Bitboard {
    LINE[a.idx()][b.idx()]
}

const fn step(sq: u8, df: i8, dr: i8) -> Option<u8> {
    let file = (sq % 8) as i8 + df;
    let rank = (sq / 8) as i8 + dr;
    if file >= 0 && file < 8 && rank >= 0 && rank < 8 {
        Some((rank * 8 + file) as u8)
    } else {
        None
    }
}

const fn leaper_table(offsets: &[(i8, i8)]) -> [Bitboard; 64] {
    let mut table = [Bitboard::EMPTY; 64];
    let mut sq = 0u8;
    while sq < 64 {
        let mut bits = 0u64;
        let mut i = 0;
        while i < offsets.len() {
            if let Some(target) = step(sq, offsets[i].0, offsets[i].1) {
                bits |= 1u64 << target;
            }
            i += 1;
        }
        table[sq as usize] = Bitboard(bits);
        sq += 1;
    }
    table
}

const fn ray_table() -> [[Bitboard; 64]; 8] {
    let mut table = [[Bitboard::EMPTY; 64]; 8];
    let mut dir = 0;
    while dir < 8 {
        let mut sq = 0u8;
        while sq < 64 {
            let mut bits = 0u64;
            let mut cur = sq;
            while let Some(next) = step(cur, DIRECTIONS[dir].0, DIRECTIONS[dir].1) {
                bits |= 1u64 << next;
                cur = next;
            }
            table[dir][sq as usize] = Bitboard(bits);
            sq += 1;
        }
        dir += 1;
    }
    table
}

const fn between_table() -> [[Bitboard; 64]; 64] {
    let mut table = [[Bitboard::EMPTY; 64]; 64];
    let mut from = 0u8;
    while from < 64 {
        let mut dir = 0;
        while dir < 8 {
            let mut gap = 0u64;
            let mut cur = from;
            while let Some(next) = step(cur, DIRECTIONS[dir].0, DIRECTIONS[dir].1) {
                table[from as usize][next as usize] = Bitboard(gap);
                gap |= 1u64 << next;
                cur = next;
            }
            dir += 1;
        }
        from += 1;
    }
    table
}

const fn line_table() -> [[Bitboard; 64]; 64] {
    let rays = ray_table();
    let mut table = [[Bitboard::EMPTY; 64]; 64];
    let mut from = 0u8;
    while from < 64 {
        let mut dir = 0;
        while dir < 8 {
            let back = (dir + 4) % 8;
            let full = rays[dir][from as usize].0 | rays[back][from as usize].0 | (1u64 << from);
            let mut cur = from;
            while let Some(next) = step(cur, DIRECTIONS[dir].0, DIRECTIONS[dir].1) {
                table[from as usize][next as usize] = Bitboard(full);
                cur = next;
            }
            dir += 1;
        }
        from += 1;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    fn squares(names: &[&str]) -> Bitboard {
        names.iter().map(|n| sq(n)).collect()
    }

    #[test]
    fn leaper_counts() {
        assert_eq!(knight_attacks(sq("d4")).count(), 8);
        assert_eq!(knight_attacks(Square::A1).count(), 2);
        assert_eq!(knight_attacks(sq("a4")).count(), 4);
        assert_eq!(king_attacks(sq("d4")).count(), 8);
        assert_eq!(king_attacks(Square::A1).count(), 3);
        assert_eq!(king_attacks(sq("a4")).count(), 5);
    }

    #[test]
    fn pawn_captures_point_forward() {
        assert_eq!(pawn_attacks(sq("d4"), Color::White), squares(&["c5", "e5"]));
        assert_eq!(pawn_attacks(sq("d4"), Color::Black), squares(&["c3", "e3"]));
        assert_eq!(pawn_attacks(sq("a4"), Color::White), squares(&["b5"]));
        assert!(pawn_attacks(sq("d8"), Color::White).is_empty());
    }

    #[test]
    fn rook_stops_at_blockers() {
        let occupied = squares(&["d6", "b4", "d1"]);
        let attacks = rook_attacks(sq("d4"), occupied);
        assert_eq!(
            attacks,
            squares(&["d5", "d6", "c4", "b4", "e4", "f4", "g4", "h4", "d3", "d2", "d1"])
        );
    }

    #[test]
    fn bishop_stops_at_blockers() {
        let occupied = squares(&["f6", "b2"]);
        let attacks = bishop_attacks(sq("d4"), occupied);
        assert!(attacks.contains(sq("f6")));
        assert!(!attacks.contains(sq("g7")));
        assert!(attacks.contains(sq("b2")));
        assert!(!attacks.contains(Square::A1));
        assert!(attacks.contains(Square::G1));
        assert!(attacks.contains(sq("a7")));
        assert!(!attacks.contains(Square::A8));
    }

    #[test]
    fn empty_board_slider_counts() {
        assert_eq!(rook_attacks(sq("d4"), Bitboard::EMPTY).count(), 14);
        assert_eq!(bishop_attacks(sq("d4"), Bitboard::EMPTY).count(), 13);
        assert_eq!(queen_attacks(Square::A1, Bitboard::EMPTY).count(), 21);
    }

    #[test]
    fn between_and_line() {
        assert_eq!(between(Square::A1, sq("d4")), squares(&["b2", "c3"]));
        assert_eq!(between(sq("d4"), Square::A1), squares(&["b2", "c3"]));
        assert_eq!(between(Square::E1, Square::H1), squares(&["f1", "g1"]));
        assert!(between(Square::A1, sq("b3")).is_empty());
        assert!(between(Square::A1, Square::B1).is_empty());

        assert_eq!(line(Square::B1, sq("b5")), Bitboard::file(1));
        assert!(line(Square::A1, sq("c3")).contains(Square::H8));
        assert!(line(Square::A1, sq("b3")).is_empty());
    }
}
