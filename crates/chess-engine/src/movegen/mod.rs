//! Move generation.
//!
//! Moves are generated by category so the staged generator can produce each
//! category only when it is reached: captures (with queen promotions), quiet
//! moves (with castling), underpromotions, and check evasions. All of them are
//! pseudo-legal; legality is settled by applying the move.

mod attacks;
pub mod perft;

use crate::castling::{CastleSide, CastlingSetup};
use crate::{Bitboard, Position};
use chess_core::{Color, Move, MoveFlag, Piece, Square};

pub use attacks::{
    between, bishop_attacks, king_attacks, knight_attacks, line, pawn_attacks, queen_attacks,
    rook_attacks,
};

/// A list of moves with a fixed maximum capacity.
///
/// No legal chess position has more than 218 moves, so a fixed array avoids
/// heap allocation during move generation.
#[derive(Clone)]
pub struct MoveList {
    moves: [Move; Self::MAX_MOVES],
    len: usize,
}

impl MoveList {
    pub const MAX_MOVES: usize = 256;

    #[inline]
    pub const fn new() -> Self {
        MoveList {
            moves: [Move::NULL; Self::MAX_MOVES],
            len: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, m: Move) {
        debug_assert!(self.len < Self::MAX_MOVES);
        self.moves[self.len] = m;
        self.len += 1;
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[Move] {
        &self.moves[..self.len]
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.as_slice().iter()
    }

    #[inline]
    pub fn contains(&self, m: Move) -> bool {
        self.as_slice().contains(&m)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&Move) -> bool,
    {
        let mut write = 0;
        for read in 0..self.len {
            if f(&self.moves[read]) {
                self.moves[write] = self.moves[read];
                write += 1;
            }
        }
        self.len = write;
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<usize> for MoveList {
    type Output = Move;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        debug_assert!(index < self.len);
        &self.moves[index]
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl std::fmt::Debug for MoveList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

const UNDERPROMOTIONS: [MoveFlag; 3] = [
    MoveFlag::PromoteKnight,
    MoveFlag::PromoteBishop,
    MoveFlag::PromoteRook,
];

impl Position<'_> {
    /// Enemy pieces a capture may land on (everything but the king).
    #[inline]
    fn capture_targets(&self) -> Bitboard {
        let them = !self.side_to_move();
        self.color_pieces(them) & !self.pieces_of(Piece::King, them)
    }

    /// Squares a pawn of the side to move can be pushed to from `from`, with
    /// the matching flag for the double step.
    fn pawn_pushes(&self, from: Square) -> impl Iterator<Item = (Square, MoveFlag)> {
        let us = self.side_to_move();
        let occupied = self.occupied();
        let single = from.offset(us.forward()).filter(|&to| !occupied.contains(to));
        let double = single
            .filter(|_| from.relative_rank(us) == 1)
            .and_then(|to| to.offset(us.forward()))
            .filter(|&to| !occupied.contains(to));
        single
            .map(|to| (to, MoveFlag::Normal))
            .into_iter()
            .chain(double.map(|to| (to, MoveFlag::DoublePush)))
    }

    /// Captures, en passant and queen promotions (capturing or not).
    pub fn generate_captures(&self, moves: &mut MoveList) {
        let us = self.side_to_move();
        let targets = self.capture_targets();

        for from in self.pieces_of(Piece::Pawn, us) {
            let promoting = from.relative_rank(us) == 6;
            for to in pawn_attacks(from, us) & targets {
                let flag = if promoting {
                    MoveFlag::PromoteQueen
                } else {
                    MoveFlag::Normal
                };
                moves.push(Move::new(from, to, flag));
            }
            if promoting {
                for (to, _) in self.pawn_pushes(from) {
                    moves.push(Move::new(from, to, MoveFlag::PromoteQueen));
                }
            }
        }

        if let Some(ep) = self.en_passant() {
            for from in self.en_passant_capturers(ep) {
                moves.push(Move::new(from, ep, MoveFlag::EnPassant));
            }
        }

        for from in self.color_pieces(us) & !self.pieces(Piece::Pawn) {
            for to in self.attacks_from(from) & targets {
                moves.push(Move::normal(from, to));
            }
        }
    }

    /// Non-capturing, non-promoting moves including castling.
    pub fn generate_quiets(&self, moves: &mut MoveList) {
        self.generate_quiet_steps(moves);
        self.generate_castling(moves);
    }

    fn generate_quiet_steps(&self, moves: &mut MoveList) {
        let us = self.side_to_move();
        let empty = !self.occupied();

        for from in self.pieces_of(Piece::Pawn, us) {
            if from.relative_rank(us) == 6 {
                continue;
            }
            for (to, flag) in self.pawn_pushes(from) {
                moves.push(Move::new(from, to, flag));
            }
        }

        for from in self.color_pieces(us) & !self.pieces(Piece::Pawn) {
            for to in self.attacks_from(from) & empty {
                moves.push(Move::normal(from, to));
            }
        }
    }

    /// Knight, bishop and rook promotions.
    pub fn generate_underpromotions(&self, moves: &mut MoveList) {
        let us = self.side_to_move();
        let targets = self.capture_targets();
        let seventh = self.pieces_of(Piece::Pawn, us)
            & Bitboard::rank(us.relative_rank(6));

        for from in seventh {
            let pushes = self.pawn_pushes(from).map(|(to, _)| to);
            let captures = pawn_attacks(from, us) & targets;
            for to in pushes.chain(captures) {
                for flag in UNDERPROMOTIONS {
                    moves.push(Move::new(from, to, flag));
                }
            }
        }
    }

    pub fn generate_castling(&self, moves: &mut MoveList) {
        if self.in_check() {
            return;
        }
        let us = self.side_to_move();
        for side in CastleSide::ALL {
            if self.can_castle(side) {
                let (king_to, _) = CastlingSetup::destinations(us, side);
                moves.push(Move::new(self.king_square(us), king_to, side.flag()));
            }
        }
    }

    /// Castling right, pieces in place, path clear, no attacked square on the
    /// king's way. Being in check is tested by the caller. Attacks revealed
    /// by the rook leaving are caught when the move is applied.
    fn can_castle(&self, side: CastleSide) -> bool {
        let us = self.side_to_move();
        if !self.castling_rights().has(us, side) {
            return false;
        }
        let setup = self.castling_setup();
        let king_from = self.king_square(us);
        let rook_from = setup.rook(us, side);
        if king_from != setup.king(us) || self.piece_at(rook_from) != Some((Piece::Rook, us)) {
            return false;
        }

        let (king_to, rook_to) = CastlingSetup::destinations(us, side);
        let others = self.occupied().without(king_from).without(rook_from);
        let king_path = between(king_from, king_to).with(king_to);
        let rook_path = between(rook_from, rook_to).with(rook_to);
        if (king_path | rook_path).intersects(others) {
            return false;
        }
        !king_path.intersects(self.attacked_by(!us))
    }

    /// Pseudo-legal moves out of check. Castling is never included; in double
    /// check only king moves remain.
    pub fn generate_evasions(&self, moves: &mut MoveList) {
        let us = self.side_to_move();
        let king = self.king_square(us);
        let checkers = self.checkers();

        let mut all = MoveList::new();
        self.generate_captures(&mut all);
        self.generate_quiet_steps(&mut all);
        self.generate_underpromotions(&mut all);

        let blocks = match checkers.lsb() {
            Some(checker) if !checkers.more_than_one() => between(king, checker).with(checker),
            _ => Bitboard::EMPTY,
        };
        let ep_victim = self
            .en_passant()
            .and_then(|ep| ep.offset(-us.forward()))
            .filter(|&victim| checkers.contains(victim));

        for &m in all.iter() {
            let keep = m.from() == king
                || blocks.contains(m.to())
                || (m.flag() == MoveFlag::EnPassant && ep_victim.is_some());
            if keep {
                moves.push(m);
            }
        }
    }

    /// Quiet moves that give check.
    pub fn generate_quiet_checks(&self, moves: &mut MoveList) {
        let mut quiets = MoveList::new();
        self.generate_quiets(&mut quiets);
        for &m in quiets.iter() {
            if self.gives_check(m) {
                moves.push(m);
            }
        }
    }

    /// Every pseudo-legal move.
    pub fn pseudo_legal_moves(&self) -> MoveList {
        let mut moves = MoveList::new();
        if self.in_check() {
            self.generate_evasions(&mut moves);
        } else {
            self.generate_captures(&mut moves);
            self.generate_quiets(&mut moves);
            self.generate_underpromotions(&mut moves);
        }
        moves
    }

    pub fn legal_moves(&self) -> MoveList {
        let mut moves = self.pseudo_legal_moves();
        moves.retain(|&m| self.play(m).is_some());
        moves
    }

    /// Whether any legal move exists, stopping at the first one found.
    pub fn has_legal_move(&self) -> bool {
        self.pseudo_legal_moves()
            .iter()
            .any(|&m| self.play(m).is_some())
    }

    /// Whether `m` could have been generated here. Used to vet moves that
    /// come from tables filled in other positions.
    pub fn is_pseudo_legal(&self, m: Move) -> bool {
        if m.is_null() {
            return false;
        }
        let us = self.side_to_move();
        let (from, to) = (m.from(), m.to());
        let Some((piece, color)) = self.piece_at(from) else {
            return false;
        };
        if color != us {
            return false;
        }

        if let Some(side) = CastleSide::from_flag(m.flag()) {
            return piece == Piece::King
                && !self.in_check()
                && to == CastlingSetup::destinations(us, side).0
                && self.can_castle(side);
        }

        let landing_ok = !self.color_pieces(us).contains(to)
            && !self.pieces_of(Piece::King, !us).contains(to);
        if !landing_ok {
            return false;
        }

        if piece != Piece::Pawn {
            return m.flag() == MoveFlag::Normal && self.attacks_from(from).contains(to);
        }

        let capture = pawn_attacks(from, us).contains(to) && self.capture_targets().contains(to);
        let push = self
            .pawn_pushes(from)
            .any(|(sq, flag)| sq == to && (flag == MoveFlag::Normal || m.flag() == flag));
        let last_rank = to.relative_rank(us) == 7;
        match m.flag() {
            MoveFlag::EnPassant => {
                self.en_passant() == Some(to) && pawn_attacks(from, us).contains(to)
            }
            MoveFlag::DoublePush => {
                push && from.relative_rank(us) == 1 && to.relative_rank(us) == 3
            }
            MoveFlag::Normal => !last_rank && (push || capture),
            flag if flag.is_promotion() => last_rank && (push || capture),
            _ => false,
        }
    }

    /// Whether `by` attacks `sq`, from the cached attack sets.
    #[inline]
    pub fn is_square_attacked(&self, sq: Square, by: Color) -> bool {
        self.attacked_by(by).contains(sq)
    }

    /// Piece and colour making `m`.
    #[inline]
    pub fn moved_piece(&self, m: Move) -> Option<(Piece, Color)> {
        self.piece_at(m.from())
    }
}
