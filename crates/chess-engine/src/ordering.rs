//! Quiet-move ordering tables.
//!
//! One [`HistoryTables`] belongs to each search thread. The tables learn
//! from beta cutoffs and are kept between searches of the same game, aged
//! rather than cleared.

use crate::{MoveList, Position};
use chess_core::{Color, Move, Piece, Square};

/// Deepest ply the search reaches.
pub const MAX_PLY: usize = 128;

/// Bound on any single history value.
const HISTORY_MAX: i32 = 16384;
const BONUS_MAX: i32 = 1200;

/// Score given to the counter move so it is tried first among quiets.
pub const COUNTER_MOVE_SCORE: i32 = i32::MAX / 2;

const PIECE_SQUARES: usize = Piece::COLORED_COUNT * 64;

/// Per king-distance step towards the enemy king.
const TROPISM_WEIGHT: i32 = 24;
const INTO_ATTACK_PENALTY: i32 = 512;
const ESCAPE_BONUS: i32 = 256;

pub struct HistoryTables {
    butterfly: Box<[[i16; 64]; Piece::COLORED_COUNT]>,
    counters: Box<[[Move; 64]; Piece::COLORED_COUNT]>,
    /// Indexed by the opponent's last move, then ours.
    continuation: Vec<i16>,
    /// Indexed by our own previous move, then ours.
    follow_up: Vec<i16>,
    killers: Box<[[Move; 2]; MAX_PLY]>,
}

/// Moving piece and destination as one index, 0..768.
#[inline]
fn piece_square(piece: Piece, color: Color, to: Square) -> usize {
    piece.colored_index(color) * 64 + to.idx()
}

#[inline]
fn pair_index(context: usize, current: usize) -> usize {
    context * PIECE_SQUARES + current
}

/// Gravity update: values saturate towards ±HISTORY_MAX.
#[inline]
fn apply_bonus(entry: &mut i16, bonus: i32) {
    let value = *entry as i32;
    let value = value + bonus - value * bonus.abs() / HISTORY_MAX;
    *entry = value.clamp(-HISTORY_MAX, HISTORY_MAX) as i16;
}

impl HistoryTables {
    pub fn new() -> Self {
        HistoryTables {
            butterfly: Box::new([[0; 64]; Piece::COLORED_COUNT]),
            counters: Box::new([[Move::NULL; 64]; Piece::COLORED_COUNT]),
            continuation: vec![0; PIECE_SQUARES * PIECE_SQUARES],
            follow_up: vec![0; PIECE_SQUARES * PIECE_SQUARES],
            killers: Box::new([[Move::NULL; 2]; MAX_PLY]),
        }
    }

    /// Forgets everything (new game).
    pub fn clear(&mut self) {
        for row in self.butterfly.iter_mut() {
            row.fill(0);
        }
        for row in self.counters.iter_mut() {
            row.fill(Move::NULL);
        }
        self.continuation.fill(0);
        self.follow_up.fill(0);
        self.clear_killers();
    }

    /// Halves every value and drops killers (between searches).
    pub fn age(&mut self) {
        for value in self.butterfly.iter_mut().flatten() {
            *value /= 2;
        }
        for value in self.continuation.iter_mut().chain(self.follow_up.iter_mut()) {
            *value /= 2;
        }
        self.clear_killers();
    }

    fn clear_killers(&mut self) {
        self.killers.fill([Move::NULL; 2]);
    }

    #[inline]
    pub fn killers(&self, ply: usize) -> [Move; 2] {
        self.killers[ply.min(MAX_PLY - 1)]
    }

    pub fn store_killer(&mut self, ply: usize, m: Move) {
        let slot = &mut self.killers[ply.min(MAX_PLY - 1)];
        if slot[0] != m {
            slot[1] = slot[0];
            slot[0] = m;
        }
    }

    /// Reply that last refuted the opponent's previous move.
    pub fn counter_move(&self, position: &Position<'_>) -> Move {
        match position.last_moved_piece() {
            Some((piece, color)) => {
                self.counters[piece.colored_index(color)][position.last_move().to().idx()]
            }
            None => Move::NULL,
        }
    }

    /// Index of the opponent's last move, if any.
    fn counter_context(position: &Position<'_>) -> Option<usize> {
        let (piece, color) = position.last_moved_piece()?;
        Some(piece_square(piece, color, position.last_move().to()))
    }

    /// Index of our own move before the opponent's last one.
    fn follow_up_context(position: &Position<'_>) -> Option<usize> {
        let previous = position.previous()?;
        let (piece, color) = previous.last_moved_piece()?;
        Some(piece_square(piece, color, previous.last_move().to()))
    }

    /// Ordering score of the quiet move `m`.
    pub fn quiet_score(&self, position: &Position<'_>, m: Move) -> i32 {
        let Some((piece, color)) = position.moved_piece(m) else {
            return 0;
        };
        if m == self.counter_move(position) {
            return COUNTER_MOVE_SCORE;
        }
        let current = piece_square(piece, color, m.to());
        let mut score = self.butterfly[piece.colored_index(color)][m.to().idx()] as i32;
        if let Some(context) = Self::counter_context(position) {
            score += self.continuation[pair_index(context, current)] as i32;
        }
        if let Some(context) = Self::follow_up_context(position) {
            score += self.follow_up[pair_index(context, current)] as i32;
        }

        let enemy_king = position.king_square(!color);
        let closer = m.from().distance(enemy_king) as i32 - m.to().distance(enemy_king) as i32;
        score += closer * TROPISM_WEIGHT;

        let theirs = position.attacked_by(!color);
        let ours = position.attacked_by(color);
        if piece != Piece::Pawn && theirs.contains(m.to()) && !ours.contains(m.to()) {
            score -= INTO_ATTACK_PENALTY;
        }
        if piece != Piece::King && theirs.contains(m.from()) && !theirs.contains(m.to()) {
            score += ESCAPE_BONUS;
        }
        score
    }

    /// Rewards the quiet move that caused a cutoff and penalises the quiets
    /// tried before it.
    pub fn update_quiet_cutoff(
        &mut self,
        position: &Position<'_>,
        best: Move,
        tried: &MoveList,
        depth: i32,
    ) {
        let bonus = (depth * depth).min(BONUS_MAX);
        let counter = Self::counter_context(position);
        let follow = Self::follow_up_context(position);

        self.store_killer(position.ply() as usize, best);
        if let Some((piece, color)) = position.last_moved_piece() {
            self.counters[piece.colored_index(color)][position.last_move().to().idx()] = best;
        }

        for &m in tried.iter() {
            let delta = if m == best { bonus } else { -bonus };
            let Some((piece, color)) = position.moved_piece(m) else {
                continue;
            };
            let current = piece_square(piece, color, m.to());
            apply_bonus(&mut self.butterfly[piece.colored_index(color)][m.to().idx()], delta);
            if let Some(context) = counter {
                apply_bonus(&mut self.continuation[pair_index(context, current)], delta);
            }
            if let Some(context) = follow {
                apply_bonus(&mut self.follow_up[pair_index(context, current)], delta);
            }
        }
    }

    /// Raw butterfly value, for inspection.
    pub fn butterfly(&self, piece: Piece, color: Color, to: Square) -> i16 {
        self.butterfly[piece.colored_index(color)][to.idx()]
    }
}

impl Default for HistoryTables {
    fn default() -> Self {
        Self::new()
    }
}
