//! Static exchange evaluation.

use crate::movegen::{bishop_attacks, line, rook_attacks};
use crate::{Bitboard, Position};
use chess_core::{Color, Move, MoveFlag, Piece, Square};

/// Exchange values indexed by `Piece::index`.
pub const SEE_VALUES: [i32; 6] = [100, 325, 325, 520, 950, 20000];

#[inline]
pub fn see_value(piece: Piece) -> i32 {
    SEE_VALUES[piece.index()]
}

/// Longest possible exchange on one square: every piece on the board.
const MAX_EXCHANGE: usize = 32;

impl Position<'_> {
    /// Material balance for the side to move after the exchange `m` starts on
    /// its destination, both sides recapturing with their least valuable
    /// piece and stopping when continuing would lose.
    ///
    /// Pinned pieces only take part when the capture keeps them on the pin
    /// line; the pinner is not checked for being exchanged off first.
    pub fn see(&self, m: Move) -> i32 {
        if m.is_castling() {
            return 0;
        }
        let Some((mover, us)) = self.piece_at(m.from()) else {
            return 0;
        };
        let to = m.to();
        let mut occupied = self.occupied().without(m.from());

        let mut gain = [0i32; MAX_EXCHANGE];
        gain[0] = self.captured_by(m).map_or(0, see_value);
        if m.flag() == MoveFlag::EnPassant {
            if let Some(victim) = to.offset(-us.forward()) {
                occupied.clear(victim);
            }
        }
        let mut on_square = mover;
        if let Some(promoted) = m.flag().promotion_piece() {
            gain[0] += see_value(promoted) - see_value(Piece::Pawn);
            on_square = promoted;
        }

        let straight = self.pieces(Piece::Rook) | self.pieces(Piece::Queen);
        let diagonal = self.pieces(Piece::Bishop) | self.pieces(Piece::Queen);
        let pinned = self.pinned_off_line(to);
        let mut attackers = self.attackers_to(to, occupied) & occupied & !pinned;

        let mut side = !us;
        let mut depth = 0;
        loop {
            let ours = attackers & self.color_pieces(side);
            let Some((piece, from)) = least_valuable(self, ours) else {
                break;
            };
            if piece == Piece::King && (attackers & self.color_pieces(!side)).without(from).is_not_empty() {
                break;
            }
            depth += 1;
            if depth >= MAX_EXCHANGE {
                break;
            }

            gain[depth] = see_value(on_square) - gain[depth - 1];
            on_square = piece;
            if piece == Piece::Pawn && to.relative_rank(side) == 7 {
                gain[depth] += see_value(Piece::Queen) - see_value(Piece::Pawn);
                on_square = Piece::Queen;
            }

            occupied.clear(from);
            attackers.clear(from);
            attackers |= (bishop_attacks(to, occupied) & diagonal)
                | (rook_attacks(to, occupied) & straight);
            attackers &= occupied & !pinned;
            side = !side;
        }

        while depth > 0 {
            gain[depth - 1] = gain[depth - 1].min(-gain[depth]);
            depth -= 1;
        }
        gain[0]
    }

    /// Cheap sign test: capturing something at least as valuable as the
    /// capturer can never lose material.
    pub fn see_sign(&self, m: Move) -> i32 {
        if !m.is_promotion() {
            if let (Some(victim), Some((mover, _))) = (self.captured_by(m), self.piece_at(m.from())) {
                let balance = see_value(victim) - see_value(mover);
                if balance >= 0 {
                    return balance;
                }
            }
        }
        self.see(m)
    }

    /// Pinned pieces of either side that cannot reach `to` without leaving
    /// their pin line.
    fn pinned_off_line(&self, to: Square) -> Bitboard {
        let mut excluded = Bitboard::EMPTY;
        for color in Color::ALL {
            let king = self.king_square(color);
            for pinned in self.pins(color).pinned {
                if !line(king, pinned).contains(to) {
                    excluded.set(pinned);
                }
            }
        }
        excluded
    }
}

fn least_valuable(position: &Position<'_>, candidates: Bitboard) -> Option<(Piece, Square)> {
    Piece::ALL.iter().find_map(|&piece| {
        (candidates & position.pieces(piece))
            .lsb()
            .map(|sq| (piece, sq))
    })
}
