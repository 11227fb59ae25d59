//! Static evaluation.
//!
//! The search only relies on the [`Evaluator`] contract: a score for the
//! side to move, split into material and positional parts that are each
//! interpolated between middlegame and endgame by the game phase.
//!
//! [`PieceSquareEvaluator`] is the default implementation: material plus
//! piece-square tables, with dedicated handling of a few endgames selected
//! by material signature.

use std::ops::{Add, AddAssign, Neg, Sub};
use std::sync::OnceLock;

use chess_core::{Color, Piece, Square};
use chess_engine::{MaterialSignature, Position, MATERIAL_KEYS};

/// Phase of a position with all minor and major pieces on the board.
pub const MAX_PHASE: i32 = 24;

const PHASE_WEIGHTS: [i32; 6] = [0, 1, 1, 2, 4, 0];

/// Piece values in centipawns, middlegame and endgame.
const PIECE_VALUES_MG: [i32; 6] = [80, 325, 325, 520, 950, 0];
const PIECE_VALUES_EG: [i32; 6] = [100, 325, 325, 520, 950, 0];

/// A middlegame/endgame pair of values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Phased {
    pub mg: i32,
    pub eg: i32,
}

impl Phased {
    pub const ZERO: Phased = Phased { mg: 0, eg: 0 };

    pub const fn new(mg: i32, eg: i32) -> Self {
        Phased { mg, eg }
    }

    /// Blends by `phase`, from `0` (pure endgame) to [`MAX_PHASE`].
    #[inline]
    pub fn interpolate(self, phase: i32) -> i32 {
        let phase = phase.clamp(0, MAX_PHASE);
        (self.mg * phase + self.eg * (MAX_PHASE - phase)) / MAX_PHASE
    }
}

impl Add for Phased {
    type Output = Phased;
    fn add(self, rhs: Phased) -> Phased {
        Phased::new(self.mg + rhs.mg, self.eg + rhs.eg)
    }
}

impl AddAssign for Phased {
    fn add_assign(&mut self, rhs: Phased) {
        self.mg += rhs.mg;
        self.eg += rhs.eg;
    }
}

impl Sub for Phased {
    type Output = Phased;
    fn sub(self, rhs: Phased) -> Phased {
        Phased::new(self.mg - rhs.mg, self.eg - rhs.eg)
    }
}

impl Neg for Phased {
    type Output = Phased;
    fn neg(self) -> Phased {
        Phased::new(-self.mg, -self.eg)
    }
}

/// Evaluation of one position from the side to move's point of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub material: Phased,
    pub positional: Phased,
    pub phase: i32,
}

impl Evaluation {
    pub const DRAW: Evaluation = Evaluation {
        material: Phased::ZERO,
        positional: Phased::ZERO,
        phase: 0,
    };

    #[inline]
    pub fn score(&self) -> i32 {
        (self.material + self.positional).interpolate(self.phase)
    }

    fn flipped(self) -> Evaluation {
        Evaluation {
            material: -self.material,
            positional: -self.positional,
            phase: self.phase,
        }
    }

    fn scaled(self, divisor: i32) -> Evaluation {
        let scale = |p: Phased| Phased::new(p.mg / divisor, p.eg / divisor);
        Evaluation {
            material: scale(self.material),
            positional: scale(self.positional),
            phase: self.phase,
        }
    }
}

/// Position-to-score mapping used by the search.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, position: &mut Position<'_>) -> Evaluation;

    /// Interpolated score for the side to move.
    fn value(&self, position: &mut Position<'_>) -> i32 {
        self.evaluate(position).score()
    }
}

/// Evaluation routine chosen by material signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndgameStrategy {
    /// Neither side can mate.
    Draw,
    /// Mating material against a bare king.
    Kxk,
    /// King and pawn against king.
    Kpk,
    Generic,
}

/// Strategy for every `Standard` material key, built on first use.
fn strategy_table() -> &'static [EndgameStrategy] {
    static TABLE: OnceLock<Vec<EndgameStrategy>> = OnceLock::new();
    TABLE.get_or_init(|| {
        (0..MATERIAL_KEYS as u32)
            .map(|key| classify(&MaterialSignature::decode(key)))
            .collect()
    })
}

pub fn strategy_for(material: MaterialSignature) -> EndgameStrategy {
    match material.key() {
        Some(key) => strategy_table()[key as usize],
        None => EndgameStrategy::Generic,
    }
}

fn classify(counts: &[[u32; 6]; 2]) -> EndgameStrategy {
    let side = |color: Color| {
        let c = &counts[color.index()];
        let pawns = c[Piece::Pawn.index()];
        let minors = c[Piece::Knight.index()] + c[Piece::Bishop.index()];
        let majors = c[Piece::Rook.index()] + c[Piece::Queen.index()];
        (pawns, minors, majors, c[Piece::Bishop.index()])
    };
    let (wp, wm, wj, wb) = side(Color::White);
    let (bp, bm, bj, bb) = side(Color::Black);

    if wp + bp == 0 && wj + bj == 0 && wm + bm <= 1 {
        return EndgameStrategy::Draw;
    }
    let bare = |p: u32, m: u32, j: u32| p + m + j == 0;
    let can_force_mate = |m: u32, j: u32, bishops: u32| j > 0 || (m >= 2 && bishops >= 1);
    if (bare(bp, bm, bj) && can_force_mate(wm, wj, wb))
        || (bare(wp, wm, wj) && can_force_mate(bm, bj, bb))
    {
        return EndgameStrategy::Kxk;
    }
    if (wp == 1 && wm + wj == 0 && bare(bp, bm, bj)) || (bp == 1 && bm + bj == 0 && bare(wp, wm, wj)) {
        return EndgameStrategy::Kpk;
    }
    EndgameStrategy::Generic
}

// Piece-square tables, laid out from White's side with rank 8 first.

const PAWN_PST: [i32; 64] = [
    0, 0, 0, 0, 0, 0, 0, 0, 50, 50, 50, 50, 50, 50, 50, 50, 10, 10, 20, 30, 30, 20, 10, 10, 5, 5,
    10, 25, 25, 10, 5, 5, 0, 0, 0, 20, 20, 0, 0, 0, 5, -5, -10, 0, 0, -10, -5, 5, 5, 10, 10, -20,
    -20, 10, 10, 5, 0, 0, 0, 0, 0, 0, 0, 0,
];

const KNIGHT_PST: [i32; 64] = [
    -50, -40, -30, -30, -30, -30, -40, -50, -40, -20, 0, 0, 0, 0, -20, -40, -30, 0, 10, 15, 15, 10,
    0, -30, -30, 5, 15, 20, 20, 15, 5, -30, -30, 0, 15, 20, 20, 15, 0, -30, -30, 5, 10, 15, 15, 10,
    5, -30, -40, -20, 0, 5, 5, 0, -20, -40, -50, -40, -30, -30, -30, -30, -40, -50,
];

const BISHOP_PST: [i32; 64] = [
    -20, -10, -10, -10, -10, -10, -10, -20, -10, 0, 0, 0, 0, 0, 0, -10, -10, 0, 5, 10, 10, 5, 0,
    -10, -10, 5, 5, 10, 10, 5, 5, -10, -10, 0, 10, 10, 10, 10, 0, -10, -10, 10, 10, 10, 10, 10, 10,
    -10, -10, 5, 0, 0, 0, 0, 5, -10, -20, -10, -10, -10, -10, -10, -10, -20,
];

const ROOK_PST: [i32; 64] = [
    0, 0, 0, 0, 0, 0, 0, 0, 5, 10, 10, 10, 10, 10, 10, 5, -5, 0, 0, 0, 0, 0, 0, -5, -5, 0, 0, 0, 0,
    0, 0, -5, -5, 0, 0, 0, 0, 0, 0, -5, -5, 0, 0, 0, 0, 0, 0, -5, -5, 0, 0, 0, 0, 0, 0, -5, 0, 0,
    0, 5, 5, 0, 0, 0,
];

const QUEEN_PST: [i32; 64] = [
    -20, -10, -10, -5, -5, -10, -10, -20, -10, 0, 0, 0, 0, 0, 0, -10, -10, 0, 5, 5, 5, 5, 0, -10,
    -5, 0, 5, 5, 5, 5, 0, -5, 0, 0, 5, 5, 5, 5, 0, -5, -10, 5, 5, 5, 5, 5, 0, -10, -10, 0, 5, 0, 0,
    0, 0, -10, -20, -10, -10, -5, -5, -10, -10, -20,
];

const KING_MIDDLEGAME_PST: [i32; 64] = [
    -30, -40, -40, -50, -50, -40, -40, -30, -30, -40, -40, -50, -50, -40, -40, -30, -30, -40, -40,
    -50, -50, -40, -40, -30, -30, -40, -40, -50, -50, -40, -40, -30, -20, -30, -30, -40, -40, -30,
    -30, -20, -10, -20, -20, -20, -20, -20, -20, -10, 20, 20, 0, 0, 0, 0, 20, 20, 20, 30, 10, 0, 0,
    10, 30, 20,
];

const KING_ENDGAME_PST: [i32; 64] = [
    -50, -40, -30, -20, -20, -30, -40, -50, -30, -20, -10, 0, 0, -10, -20, -30, -30, -10, 20, 30,
    30, 20, -10, -30, -30, -10, 30, 40, 40, 30, -10, -30, -30, -10, 30, 40, 40, 30, -10, -30, -30,
    -10, 20, 30, 30, 20, -10, -30, -30, -30, 0, 0, 0, 0, -30, -30, -50, -30, -30, -30, -30, -30,
    -30, -50,
];

/// Table index of `sq` for a piece of `color`.
#[inline]
fn pst_index(sq: Square, color: Color) -> usize {
    match color {
        Color::White => sq.flip().idx(),
        Color::Black => sq.idx(),
    }
}

fn piece_square(piece: Piece, color: Color, sq: Square) -> Phased {
    let i = pst_index(sq, color);
    match piece {
        Piece::Pawn => Phased::new(PAWN_PST[i], PAWN_PST[i]),
        Piece::Knight => Phased::new(KNIGHT_PST[i], KNIGHT_PST[i]),
        Piece::Bishop => Phased::new(BISHOP_PST[i], BISHOP_PST[i]),
        Piece::Rook => Phased::new(ROOK_PST[i], ROOK_PST[i]),
        Piece::Queen => Phased::new(QUEEN_PST[i], QUEEN_PST[i]),
        Piece::King => Phased::new(KING_MIDDLEGAME_PST[i], KING_ENDGAME_PST[i]),
    }
}

/// Bonus per step the bare king is pushed away from the centre.
const KXK_EDGE_WEIGHT: i32 = 20;
/// Bonus per step the attacking king closes in.
const KXK_PROXIMITY_WEIGHT: i32 = 10;
const KXK_BASE: i32 = 500;
/// Bonus per rank for a pawn the defending king cannot catch.
const KPK_RANK_WEIGHT: i32 = 20;
const KPK_UNSTOPPABLE: i32 = 600;

/// Material and piece-square evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PieceSquareEvaluator;

impl PieceSquareEvaluator {
    pub fn new() -> Self {
        PieceSquareEvaluator
    }

    /// Material, piece-square terms and phase, from White's point of view.
    fn generic(&self, position: &Position<'_>) -> Evaluation {
        let mut material = Phased::ZERO;
        let mut positional = Phased::ZERO;
        let mut phase = 0;
        for color in Color::ALL {
            let sign = color.sign();
            for piece in Piece::ALL {
                let squares = position.pieces_of(piece, color);
                let count = squares.count() as i32;
                phase += PHASE_WEIGHTS[piece.index()] * count;
                material += Phased::new(
                    sign * count * PIECE_VALUES_MG[piece.index()],
                    sign * count * PIECE_VALUES_EG[piece.index()],
                );
                for sq in squares {
                    let value = piece_square(piece, color, sq);
                    positional += Phased::new(sign * value.mg, sign * value.eg);
                }
            }
        }
        Evaluation {
            material,
            positional,
            phase: phase.min(MAX_PHASE),
        }
    }

    fn kxk(&self, position: &Position<'_>) -> Evaluation {
        let mut eval = self.generic(position);
        let strong = if position.color_pieces(Color::White).count() > 1 {
            Color::White
        } else {
            Color::Black
        };
        let weak_king = position.king_square(!strong);
        let strong_king = position.king_square(strong);
        let bonus = KXK_BASE
            + KXK_EDGE_WEIGHT * centre_distance(weak_king)
            + KXK_PROXIMITY_WEIGHT * (7 - strong_king.distance(weak_king) as i32);
        let bonus = strong.sign() * bonus;
        eval.positional += Phased::new(bonus, bonus);
        eval
    }

    fn kpk(&self, position: &Position<'_>) -> Evaluation {
        let eval = self.generic(position);
        let strong = if position.pieces_of(Piece::Pawn, Color::White).is_not_empty() {
            Color::White
        } else {
            Color::Black
        };
        let Some(pawn) = position.pieces_of(Piece::Pawn, strong).lsb() else {
            return eval;
        };

        // Rule of the square.
        let rank = pawn.relative_rank(strong) as i32;
        let steps = (7 - rank).min(5);
        let promotion = pawn.with_rank((!strong).back_rank());
        let tempo = i32::from(position.side_to_move() != strong);
        let defender = position.king_square(!strong).distance(promotion) as i32 - tempo;
        if defender > steps {
            let bonus = strong.sign() * (KPK_UNSTOPPABLE + KPK_RANK_WEIGHT * rank);
            let mut eval = eval;
            eval.positional += Phased::new(bonus, bonus);
            eval
        } else {
            eval.scaled(4)
        }
    }
}

/// Chebyshev distance from the nearest of the four centre squares.
fn centre_distance(sq: Square) -> i32 {
    let file = sq.file_index() as i32;
    let rank = sq.rank_index() as i32;
    let from_centre = |x: i32| if x < 4 { 3 - x } else { x - 4 };
    from_centre(file).max(from_centre(rank))
}

impl Evaluator for PieceSquareEvaluator {
    fn evaluate(&self, position: &mut Position<'_>) -> Evaluation {
        let white = match strategy_for(position.material()) {
            EndgameStrategy::Draw => return Evaluation::DRAW,
            EndgameStrategy::Kxk => self.kxk(position),
            EndgameStrategy::Kpk => self.kpk(position),
            EndgameStrategy::Generic => self.generic(position),
        };
        match position.side_to_move() {
            Color::White => white,
            Color::Black => white.flipped(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(fen: &str) -> i32 {
        let mut position = Position::from_fen(fen).unwrap();
        PieceSquareEvaluator.value(&mut position)
    }

    #[test]
    fn start_position_is_balanced() {
        assert_eq!(value(chess_core::Fen::STARTPOS), 0);
        let mut position = Position::startpos();
        assert_eq!(PieceSquareEvaluator.evaluate(&mut position).phase, MAX_PHASE);
    }

    #[test]
    fn score_is_from_the_side_to_move() {
        let white = value("4k3/8/8/8/8/8/8/3QK3 w - - 0 1");
        let black = value("4k3/8/8/8/8/8/8/3QK3 b - - 0 1");
        assert!(white > 800);
        assert_eq!(white, -black);
    }

    #[test]
    fn mirrored_positions_score_alike() {
        let white = value("r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 3");
        let black = value("rnbqkb1r/pppp1ppp/5n2/4p3/4P3/2N5/PPPP1PPP/R1BQKBNR b KQkq - 2 3");
        assert_eq!(white, black);
    }

    #[test]
    fn interpolation() {
        let p = Phased::new(100, 20);
        assert_eq!(p.interpolate(MAX_PHASE), 100);
        assert_eq!(p.interpolate(0), 20);
        assert_eq!(p.interpolate(12), 60);
    }

    #[test]
    fn strategies_by_material() {
        let strategy = |fen: &str| strategy_for(Position::from_fen(fen).unwrap().material());
        assert_eq!(strategy("4k3/8/8/8/8/8/8/4K3 w - - 0 1"), EndgameStrategy::Draw);
        assert_eq!(strategy("4k3/8/8/8/8/8/8/2N1K3 w - - 0 1"), EndgameStrategy::Draw);
        assert_eq!(strategy("4k3/8/8/8/8/8/8/R3K3 w - - 0 1"), EndgameStrategy::Kxk);
        assert_eq!(strategy("4k3/8/8/8/8/8/8/1BN1K3 b - - 0 1"), EndgameStrategy::Kxk);
        assert_eq!(strategy("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"), EndgameStrategy::Kpk);
        assert_eq!(strategy("4k3/4p3/8/8/8/8/8/4K3 w - - 0 1"), EndgameStrategy::Kpk);
        assert_eq!(strategy(chess_core::Fen::STARTPOS), EndgameStrategy::Generic);
        assert_eq!(strategy_for(MaterialSignature::Unusual), EndgameStrategy::Generic);
    }

    #[test]
    fn bare_king_is_driven_to_the_edge() {
        let centre = value("8/8/8/4k3/8/8/8/R3K3 w - - 0 1");
        let edge = value("7k/8/8/8/8/8/8/R3K3 w - - 0 1");
        assert!(edge > centre);
        assert!(centre > 500);
    }

    #[test]
    fn rule_of_the_square() {
        // Black king catches the a-pawn.
        let caught = value("8/8/8/8/8/2k5/P7/4K3 w - - 0 1");
        // Black king is far away on h8.
        let runs = value("7k/8/8/8/P7/8/8/4K3 w - - 0 1");
        assert!(runs > 600);
        assert!(caught < 100);
    }

    #[test]
    fn insufficient_material_is_zero() {
        assert_eq!(value("4k3/8/8/8/8/8/8/2B1K3 b - - 0 1"), 0);
    }
}
