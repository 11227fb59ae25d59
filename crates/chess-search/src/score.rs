//! Search score scale and reporting.

use std::fmt;

use chess_engine::MAX_PLY;

/// Score of delivering mate at the root.
pub const MATE: i32 = 32000;
/// Bound wider than any reachable score.
pub const INFINITE: i32 = 32001;
pub const DRAW: i32 = 0;
/// Scores at or beyond this magnitude are mate scores.
pub const MATE_BOUND: i32 = MATE - MAX_PLY as i32;

/// Score of the side to move when it is mated `ply` plies from the root.
#[inline]
pub const fn mated_in(ply: u32) -> i32 {
    -MATE + ply as i32
}

/// Score of the side to move when it mates `ply` plies from the root.
#[inline]
pub const fn mate_in(ply: u32) -> i32 {
    MATE - ply as i32
}

#[inline]
pub const fn is_mate_score(score: i32) -> bool {
    score.abs() >= MATE_BOUND && score.abs() <= MATE
}

/// Score in centipawns or mate distance, as reported to a front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Centipawn score (100 = 1 pawn advantage).
    Cp(i32),
    /// Mate in N moves (positive = side to move mates, negative = gets mated).
    Mate(i32),
}

impl Score {
    pub fn from_value(value: i32) -> Self {
        if !is_mate_score(value) {
            return Score::Cp(value);
        }
        let plies = MATE - value.abs();
        let moves = (plies + 1) / 2;
        Score::Mate(if value > 0 { moves } else { -moves })
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Cp(cp) => write!(f, "cp {}", cp),
            Score::Mate(moves) => write!(f, "mate {}", moves),
        }
    }
}
