//! Board state for one ply.
//!
//! Positions are never unmade. Searching a move means copying the parent with
//! [`Position::make_child`] and applying the move to the copy; the child keeps
//! a borrowed link to its parent for repetition detection and for the
//! move-ordering heuristics that look one or two plies back.

use std::fmt;

use chess_core::{Color, Fen, FenError, Move, MoveFlag, Piece, Square};

use crate::castling::{CastleSide, CastlingRights, CastlingSetup};
use crate::material::MaterialSignature;
use crate::movegen::{
    bishop_attacks, between, king_attacks, knight_attacks, pawn_attacks, rook_attacks,
};
use crate::result::GameResult;
use crate::staged::MoveStager;
use crate::zobrist::ZOBRIST;
use crate::Bitboard;

/// Pieces of one side pinned against their own king.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinInfo {
    pub pinned: Bitboard,
    /// Enemy sliders doing the pinning.
    pub pinners: Bitboard,
}

#[derive(Clone)]
pub struct Position<'a> {
    board: [Option<(Piece, Color)>; 64],
    pieces: [Bitboard; 6],
    colors: [Bitboard; 2],
    side_to_move: Color,
    castling: CastlingRights,
    setup: CastlingSetup,
    /// Kept whenever the last move was a double push, even if no capture is
    /// possible; only capturable squares enter the hash.
    en_passant: Option<Square>,
    draw_plies: u32,
    fullmove_number: u32,
    ply: u32,
    hash: u64,
    pawn_hash: u64,
    material: MaterialSignature,
    kings: [Square; 2],
    attacks_from: [Bitboard; 64],
    attacked_by: [Bitboard; 2],
    attacked_by_piece: [[Bitboard; 6]; 2],
    pins: [Option<PinInfo>; 2],
    last_move: Move,
    captured: Option<Piece>,
    pub(crate) result: Option<GameResult>,
    pub(crate) stager: MoveStager,
    previous: Option<&'a Position<'a>>,
    history: &'a [u64],
}

impl Position<'static> {
    pub fn startpos() -> Self {
        match Self::from_fen(Fen::STARTPOS) {
            Ok(position) => position,
            Err(_) => unreachable!("the start position FEN is well formed"),
        }
    }

    /// Sets up a root position. See [`Fen::parse`] for what is tolerated.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fen = Fen::parse(fen)?;
        let (setup, castling) = CastlingSetup::from_fen(&fen.castling, &fen.board);

        let mut position = Position {
            board: [None; 64],
            pieces: [Bitboard::EMPTY; 6],
            colors: [Bitboard::EMPTY; 2],
            side_to_move: fen.side_to_move,
            castling,
            setup,
            en_passant: None,
            draw_plies: fen.halfmove_clock,
            fullmove_number: fen.fullmove_number,
            ply: 0,
            hash: 0,
            pawn_hash: 0,
            material: MaterialSignature::Unusual,
            kings: [Square::E1, Square::E8],
            attacks_from: [Bitboard::EMPTY; 64],
            attacked_by: [Bitboard::EMPTY; 2],
            attacked_by_piece: [[Bitboard::EMPTY; 6]; 2],
            pins: [None; 2],
            last_move: Move::NULL,
            captured: None,
            result: None,
            stager: MoveStager::default(),
            previous: None,
            history: &[],
        };

        for sq in Square::all() {
            if let Some((piece, color)) = fen.board[sq.idx()] {
                position.put_piece(piece, color, sq);
            }
        }

        // Only a square directly behind an enemy pawn that just double pushed.
        let us = position.side_to_move;
        position.en_passant = fen.en_passant.filter(|ep| {
            ep.relative_rank(us) == 5
                && ep
                    .offset(-us.forward())
                    .is_some_and(|pawn| position.board[pawn.idx()] == Some((Piece::Pawn, !us)))
        });

        for index in position.castling.indices() {
            position.hash ^= ZOBRIST.castling(index);
        }
        if us == Color::Black {
            position.hash ^= ZOBRIST.black_to_move();
        }
        position.hash ^= position.en_passant_key();
        position.material = position.count_material();
        position.compute_attacks();
        Ok(position)
    }
}

impl<'a> Position<'a> {
    /// Attaches hashes of the positions played before this one, oldest
    /// first, so repetitions of earlier game positions are seen.
    pub fn with_history(self, history: &'a [u64]) -> Position<'a> {
        Position { history, ..self }
    }

    /// A copy of this position to apply a move to, linked back to `self`.
    pub fn make_child(&self) -> Position<'_> {
        Position {
            board: self.board,
            pieces: self.pieces,
            colors: self.colors,
            side_to_move: self.side_to_move,
            castling: self.castling,
            setup: self.setup,
            en_passant: self.en_passant,
            draw_plies: self.draw_plies,
            fullmove_number: self.fullmove_number,
            ply: self.ply + 1,
            hash: self.hash,
            pawn_hash: self.pawn_hash,
            material: self.material,
            kings: self.kings,
            attacks_from: self.attacks_from,
            attacked_by: self.attacked_by,
            attacked_by_piece: self.attacked_by_piece,
            pins: [None; 2],
            last_move: self.last_move,
            captured: None,
            result: None,
            stager: MoveStager::default(),
            previous: Some(self),
            history: self.history,
        }
    }

    /// Applies `m` to a child copy, keeping it only when legal.
    pub fn play(&self, m: Move) -> Option<Position<'_>> {
        let mut child = self.make_child();
        child.apply_move(m).then_some(child)
    }

    /// A copy to start a search from: ply 0 and a fresh move generator, but
    /// the same ancestors and game history.
    pub fn search_root(&self) -> Position<'a> {
        Position {
            ply: 0,
            result: None,
            stager: MoveStager::default(),
            ..self.clone()
        }
    }

    /// Copies the board into a new root with no parent and no game history.
    pub fn detached(&self) -> Position<'static> {
        Position {
            board: self.board,
            pieces: self.pieces,
            colors: self.colors,
            side_to_move: self.side_to_move,
            castling: self.castling,
            setup: self.setup,
            en_passant: self.en_passant,
            draw_plies: self.draw_plies,
            fullmove_number: self.fullmove_number,
            ply: 0,
            hash: self.hash,
            pawn_hash: self.pawn_hash,
            material: self.material,
            kings: self.kings,
            attacks_from: self.attacks_from,
            attacked_by: self.attacked_by,
            attacked_by_piece: self.attacked_by_piece,
            pins: self.pins,
            last_move: self.last_move,
            captured: self.captured,
            result: None,
            stager: MoveStager::default(),
            previous: None,
            history: &[],
        }
    }

    /// Plays a pseudo-legal move on this position.
    ///
    /// Returns false when the mover's king is left attacked. The position is
    /// then inconsistent and must be thrown away.
    pub fn apply_move(&mut self, m: Move) -> bool {
        let us = self.side_to_move;
        let them = !us;
        let from = m.from();
        let to = m.to();
        let Some((piece, owner)) = self.board[from.idx()] else {
            return false;
        };
        if owner != us {
            return false;
        }

        self.hash ^= self.en_passant_key();
        for index in self.castling.indices() {
            self.hash ^= ZOBRIST.castling(index);
        }
        self.en_passant = None;
        self.last_move = m;
        self.captured = None;
        self.draw_plies += 1;

        if let Some(side) = CastleSide::from_flag(m.flag()) {
            let rook_from = self.setup.rook(us, side);
            let (king_to, rook_to) = CastlingSetup::destinations(us, side);
            self.remove_piece(from);
            self.remove_piece(rook_from);
            self.put_piece(Piece::King, us, king_to);
            self.put_piece(Piece::Rook, us, rook_to);
        } else {
            let victim_square = if m.flag() == MoveFlag::EnPassant {
                to.offset(-us.forward())
            } else {
                Some(to)
            };
            if let Some(sq) = victim_square {
                if let Some((victim, color)) = self.board[sq.idx()] {
                    if color == them {
                        self.remove_piece(sq);
                        self.captured = Some(victim);
                        self.draw_plies = 0;
                        self.update_material(victim, them, -1);
                    }
                }
            }

            self.remove_piece(from);
            match m.flag().promotion_piece() {
                Some(promoted) => {
                    self.put_piece(promoted, us, to);
                    self.update_material(Piece::Pawn, us, -1);
                    self.update_material(promoted, us, 1);
                }
                None => self.put_piece(piece, us, to),
            }

            if piece == Piece::Pawn {
                self.draw_plies = 0;
                if m.flag() == MoveFlag::DoublePush {
                    self.en_passant = from.offset(us.forward());
                }
            }
        }

        self.castling
            .revoke(self.setup.mask(from) | self.setup.mask(to));
        for index in self.castling.indices() {
            self.hash ^= ZOBRIST.castling(index);
        }

        self.side_to_move = them;
        self.hash ^= ZOBRIST.black_to_move();
        if us == Color::Black {
            self.fullmove_number += 1;
        }
        self.hash ^= self.en_passant_key();

        self.pins = [None; 2];
        self.result = None;
        self.compute_attacks();

        !self.attacked_by[them.index()].contains(self.kings[us.index()])
    }

    fn put_piece(&mut self, piece: Piece, color: Color, sq: Square) {
        self.board[sq.idx()] = Some((piece, color));
        self.pieces[piece.index()].set(sq);
        self.colors[color.index()].set(sq);
        let key = ZOBRIST.piece(piece, color, sq);
        self.hash ^= key;
        match piece {
            Piece::Pawn => self.pawn_hash ^= key,
            Piece::King => self.kings[color.index()] = sq,
            _ => {}
        }
    }

    fn remove_piece(&mut self, sq: Square) {
        if let Some((piece, color)) = self.board[sq.idx()].take() {
            self.pieces[piece.index()].clear(sq);
            self.colors[color.index()].clear(sq);
            let key = ZOBRIST.piece(piece, color, sq);
            self.hash ^= key;
            if piece == Piece::Pawn {
                self.pawn_hash ^= key;
            }
        }
    }

    fn update_material(&mut self, piece: Piece, color: Color, delta: i32) {
        let count = self.pieces_of(piece, color).count();
        self.material = self
            .material
            .adjust(piece, color, count, delta)
            .unwrap_or_else(|| self.count_material());
    }

    fn count_material(&self) -> MaterialSignature {
        let mut counts = [[0u32; 6]; 2];
        for color in Color::ALL {
            for piece in Piece::ALL {
                counts[color.index()][piece.index()] = self.pieces_of(piece, color).count();
            }
        }
        MaterialSignature::from_counts(&counts)
    }

    /// Hash term for the en-passant square: only when the side to move has a
    /// pawn that can take there.
    fn en_passant_key(&self) -> u64 {
        match self.en_passant {
            Some(ep) if self.en_passant_capturers(ep).is_not_empty() => ZOBRIST.en_passant(ep),
            _ => 0,
        }
    }

    /// Pawns of the side to move attacking `ep`.
    pub(crate) fn en_passant_capturers(&self, ep: Square) -> Bitboard {
        let us = self.side_to_move;
        pawn_attacks(ep, !us) & self.pieces_of(Piece::Pawn, us)
    }

    /// Recomputes every attack set from scratch.
    fn compute_attacks(&mut self) {
        let occupied = self.occupied();
        self.attacks_from = [Bitboard::EMPTY; 64];
        self.attacked_by = [Bitboard::EMPTY; 2];
        self.attacked_by_piece = [[Bitboard::EMPTY; 6]; 2];
        for sq in occupied {
            let Some((piece, color)) = self.board[sq.idx()] else {
                continue;
            };
            let attacks = piece_attacks(piece, color, sq, occupied);
            self.attacks_from[sq.idx()] = attacks;
            self.attacked_by[color.index()] |= attacks;
            self.attacked_by_piece[color.index()][piece.index()] |= attacks;
        }
    }

    /// Pins against `color`'s king, computed on first use and cached until
    /// the next move.
    pub fn pin_info(&mut self, color: Color) -> PinInfo {
        if let Some(info) = self.pins[color.index()] {
            return info;
        }
        let info = self.pins(color);
        self.pins[color.index()] = Some(info);
        info
    }

    /// Like [`Position::pin_info`], without filling the cache.
    pub fn pins(&self, color: Color) -> PinInfo {
        if let Some(info) = self.pins[color.index()] {
            return info;
        }
        let king = self.kings[color.index()];
        let them = !color;
        let occupied = self.occupied();
        let straight = self.pieces_of(Piece::Rook, them) | self.pieces_of(Piece::Queen, them);
        let diagonal = self.pieces_of(Piece::Bishop, them) | self.pieces_of(Piece::Queen, them);
        let snipers = (rook_attacks(king, Bitboard::EMPTY) & straight)
            | (bishop_attacks(king, Bitboard::EMPTY) & diagonal);

        let mut info = PinInfo::default();
        for sniper in snipers {
            let blockers = between(king, sniper) & occupied;
            if blockers.is_not_empty()
                && !blockers.more_than_one()
                && blockers.intersects(self.colors[color.index()])
            {
                info.pinned |= blockers;
                info.pinners.set(sniper);
            }
        }
        info
    }

    /// Pieces of both colours attacking `sq` given `occupied`.
    pub fn attackers_to(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        let straight = self.pieces[Piece::Rook.index()] | self.pieces[Piece::Queen.index()];
        let diagonal = self.pieces[Piece::Bishop.index()] | self.pieces[Piece::Queen.index()];
        (pawn_attacks(sq, Color::Black) & self.pieces_of(Piece::Pawn, Color::White))
            | (pawn_attacks(sq, Color::White) & self.pieces_of(Piece::Pawn, Color::Black))
            | (knight_attacks(sq) & self.pieces[Piece::Knight.index()])
            | (king_attacks(sq) & self.pieces[Piece::King.index()])
            | (rook_attacks(sq, occupied) & straight & occupied)
            | (bishop_attacks(sq, occupied) & diagonal & occupied)
    }

    /// Enemy pieces giving check.
    pub fn checkers(&self) -> Bitboard {
        let us = self.side_to_move;
        self.attackers_to(self.kings[us.index()], self.occupied()) & self.colors[(!us).index()]
    }

    #[inline]
    pub fn in_check(&self) -> bool {
        let us = self.side_to_move;
        self.attacked_by[(!us).index()].contains(self.kings[us.index()])
    }

    /// Whether `m` (assumed pseudo-legal) attacks the enemy king once played,
    /// directly or by discovery.
    pub fn gives_check(&self, m: Move) -> bool {
        let us = self.side_to_move;
        let them = !us;
        let target = self.kings[them.index()];
        let Some((moving, _)) = self.board[m.from().idx()] else {
            return false;
        };

        let mut pieces = self.pieces;
        let mut ours = self.colors[us.index()];
        let mut occupied = self.occupied();

        let mut relocate = |piece: Piece, landed: Piece, from: Square, to: Square| {
            pieces[piece.index()].clear(from);
            ours.clear(from);
            occupied.clear(from);
            pieces[landed.index()].set(to);
            ours.set(to);
            occupied.set(to);
        };

        if let Some(side) = CastleSide::from_flag(m.flag()) {
            let rook_from = self.setup.rook(us, side);
            let (king_to, rook_to) = CastlingSetup::destinations(us, side);
            relocate(Piece::Rook, Piece::Rook, rook_from, rook_to);
            relocate(Piece::King, Piece::King, m.from(), king_to);
            // The rook may have landed where the king started.
            pieces[Piece::Rook.index()].set(rook_to);
            ours.set(rook_to);
            occupied.set(rook_to);
        } else {
            let landed = m.flag().promotion_piece().unwrap_or(moving);
            relocate(moving, landed, m.from(), m.to());
            if m.flag() == MoveFlag::EnPassant {
                if let Some(victim) = m.to().offset(-us.forward()) {
                    occupied.clear(victim);
                }
            }
        }

        let straight = (pieces[Piece::Rook.index()] | pieces[Piece::Queen.index()]) & ours;
        let diagonal = (pieces[Piece::Bishop.index()] | pieces[Piece::Queen.index()]) & ours;
        let attackers = (pawn_attacks(target, them) & pieces[Piece::Pawn.index()] & ours)
            | (knight_attacks(target) & pieces[Piece::Knight.index()] & ours)
            | (rook_attacks(target, occupied) & straight)
            | (bishop_attacks(target, occupied) & diagonal);
        attackers.is_not_empty()
    }

    pub fn fen(&self) -> String {
        let ep = self
            .en_passant
            .map_or_else(|| "-".to_string(), |sq| sq.to_algebraic());
        format!(
            "{} {} {} {} {} {}",
            Fen::placement(&self.board),
            self.side_to_move.to_fen_char(),
            self.setup.to_fen(self.castling, &self.board),
            ep,
            self.draw_plies,
            self.fullmove_number
        )
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<(Piece, Color)> {
        self.board[sq.idx()]
    }

    #[inline]
    pub fn pieces(&self, piece: Piece) -> Bitboard {
        self.pieces[piece.index()]
    }

    #[inline]
    pub fn color_pieces(&self, color: Color) -> Bitboard {
        self.colors[color.index()]
    }

    #[inline]
    pub fn pieces_of(&self, piece: Piece, color: Color) -> Bitboard {
        self.pieces[piece.index()] & self.colors[color.index()]
    }

    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.colors[0] | self.colors[1]
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    #[inline]
    pub fn castling_setup(&self) -> &CastlingSetup {
        &self.setup
    }

    #[inline]
    pub fn is_chess960(&self) -> bool {
        self.setup.is_chess960()
    }

    /// Forces Chess960 move text and castling letters.
    pub fn set_chess960(&mut self, chess960: bool) {
        self.setup.set_chess960(chess960);
    }

    #[inline]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    /// Plies since the last capture or pawn move.
    #[inline]
    pub fn draw_plies(&self) -> u32 {
        self.draw_plies
    }

    #[inline]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Distance from the search root.
    #[inline]
    pub fn ply(&self) -> u32 {
        self.ply
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn pawn_hash(&self) -> u64 {
        self.pawn_hash
    }

    #[inline]
    pub fn material(&self) -> MaterialSignature {
        self.material
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.kings[color.index()]
    }

    /// Squares the piece on `sq` attacks (empty when `sq` is empty).
    #[inline]
    pub fn attacks_from(&self, sq: Square) -> Bitboard {
        self.attacks_from[sq.idx()]
    }

    #[inline]
    pub fn attacked_by(&self, color: Color) -> Bitboard {
        self.attacked_by[color.index()]
    }

    #[inline]
    pub fn attacked_by_piece(&self, color: Color, piece: Piece) -> Bitboard {
        self.attacked_by_piece[color.index()][piece.index()]
    }

    /// The move that produced this position, or `Move::NULL` at a root.
    #[inline]
    pub fn last_move(&self) -> Move {
        self.last_move
    }

    /// What the last move captured.
    #[inline]
    pub fn captured_piece(&self) -> Option<Piece> {
        self.captured
    }

    /// Piece standing where the last move landed (the mover, after any promotion).
    pub fn last_moved_piece(&self) -> Option<(Piece, Color)> {
        if self.last_move.is_null() {
            return None;
        }
        let to = match CastleSide::from_flag(self.last_move.flag()) {
            Some(side) => CastlingSetup::destinations(!self.side_to_move, side).0,
            None => self.last_move.to(),
        };
        self.board[to.idx()]
    }

    #[inline]
    pub fn previous(&self) -> Option<&'a Position<'a>> {
        self.previous
    }

    #[inline]
    pub fn game_history(&self) -> &'a [u64] {
        self.history
    }

    /// Hashes of earlier positions, most recent first: the parent chain, then
    /// the game history before the root.
    pub fn ancestor_hashes(&self) -> impl Iterator<Item = u64> + '_ {
        std::iter::successors(self.previous, |p| p.previous)
            .map(|p| p.hash)
            .chain(self.history.iter().rev().copied())
    }

    #[inline]
    pub fn is_capture(&self, m: Move) -> bool {
        m.flag() == MoveFlag::EnPassant
            || (!m.is_castling() && self.colors[(!self.side_to_move).index()].contains(m.to()))
    }

    /// Captures and promotions.
    #[inline]
    pub fn is_tactical(&self, m: Move) -> bool {
        m.is_promotion() || self.is_capture(m)
    }

    /// Piece a capture takes (a pawn for en passant).
    #[inline]
    pub fn captured_by(&self, m: Move) -> Option<Piece> {
        if m.flag() == MoveFlag::EnPassant {
            Some(Piece::Pawn)
        } else if m.is_castling() {
            None
        } else {
            self.board[m.to().idx()]
                .filter(|&(_, c)| c != self.side_to_move)
                .map(|(p, _)| p)
        }
    }

    /// Move text for the protocol layer; Chess960 castles are written as the
    /// king taking its own rook.
    pub fn move_to_uci(&self, m: Move) -> String {
        match CastleSide::from_flag(m.flag()) {
            Some(side) if self.is_chess960() => {
                let rook = self.setup.rook(self.side_to_move, side);
                format!("{}{}", m.from(), rook)
            }
            _ => m.to_uci(),
        }
    }

    /// Resolves coordinate text against the legal moves. Castling is accepted
    /// both as the king's destination and as king-takes-rook.
    pub fn parse_uci_move(&self, text: &str) -> Option<Move> {
        let wanted = Move::from_uci(text)?;
        self.legal_moves().iter().copied().find(|&m| {
            if m.from() != wanted.from() {
                return false;
            }
            match CastleSide::from_flag(m.flag()) {
                Some(side) => {
                    let rook = self.setup.rook(self.side_to_move, side);
                    (wanted.to() == rook || (!self.is_chess960() && wanted.to() == m.to()))
                        && wanted.flag() == MoveFlag::Normal
                }
                None => {
                    m.to() == wanted.to()
                        && m.flag().promotion_piece() == wanted.flag().promotion_piece()
                }
            }
        })
    }
}

#[inline]
pub(crate) fn piece_attacks(piece: Piece, color: Color, sq: Square, occupied: Bitboard) -> Bitboard {
    match piece {
        Piece::Pawn => pawn_attacks(sq, color),
        Piece::Knight => knight_attacks(sq),
        Piece::Bishop => bishop_attacks(sq, occupied),
        Piece::Rook => rook_attacks(sq, occupied),
        Piece::Queen => bishop_attacks(sq, occupied) | rook_attacks(sq, occupied),
        Piece::King => king_attacks(sq),
    }
}

impl Default for Position<'static> {
    fn default() -> Self {
        Self::startpos()
    }
}

impl fmt::Debug for Position<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("fen", &self.fen())
            .field("hash", &format_args!("{:#018x}", self.hash))
            .field("ply", &self.ply)
            .field("last_move", &self.last_move)
            .finish()
    }
}

impl fmt::Display for Position<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8u8 {
                let c = self.board[Square::from_coords(file, rank).idx()]
                    .map_or('.', |(p, c)| p.to_fen_char(c));
                write!(f, "{} ", c)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "  a b c d e f g h")?;
        write!(f, "{}", self.fen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    fn uci<'p>(position: &'p Position<'_>, text: &str) -> Position<'p> {
        let m = position.parse_uci_move(text).unwrap();
        position.play(m).unwrap()
    }

    /// Hash built from scratch by reparsing the FEN.
    fn fresh_hash(position: &Position<'_>) -> u64 {
        Position::from_fen(&position.fen()).unwrap().hash()
    }

    #[test]
    fn startpos_round_trips() {
        let position = Position::startpos();
        assert_eq!(position.fen(), Fen::STARTPOS);
        assert_eq!(position.occupied().count(), 32);
        assert_eq!(position.king_square(Color::White), Square::E1);
        assert_eq!(position.king_square(Color::Black), Square::E8);
        assert!(!position.in_check());
    }

    #[test]
    fn incremental_hash_matches_scratch() {
        let root = Position::startpos();
        let a = uci(&root, "e2e4");
        let b = uci(&a, "d7d5");
        let c = uci(&b, "e4d5");
        let d = uci(&c, "g8f6");
        let e = uci(&d, "f1b5");
        let f = uci(&e, "c7c6");
        let g = uci(&f, "d5c6");
        for p in [&a, &b, &c, &d, &e, &f, &g] {
            assert_eq!(p.hash(), fresh_hash(p), "{}", p.fen());
        }
    }

    #[test]
    fn pawn_hash_ignores_pieces() {
        let root = Position::startpos();
        let knight = uci(&root, "g1f3");
        assert_eq!(knight.pawn_hash(), root.pawn_hash());
        let pawn = uci(&root, "e2e3");
        assert_ne!(pawn.pawn_hash(), root.pawn_hash());
    }

    #[test]
    fn uncapturable_en_passant_square_is_not_hashed() {
        let root = Position::startpos();
        let after = uci(&root, "e2e4");
        assert_eq!(after.en_passant(), Some(sq("e3")));
        let without = Position::from_fen(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(after.hash(), without.hash());
    }

    #[test]
    fn capturable_en_passant_square_is_hashed() {
        let with = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        let without = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(with.en_passant(), Some(sq("d6")));
        assert_ne!(with.hash(), without.hash());
    }

    #[test]
    fn en_passant_from_fen_is_kept_and_cleared_after_any_move() {
        let fen = "rnb1kbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 3";
        let position = Position::from_fen(fen).unwrap();
        assert_eq!(position.en_passant(), Some(sq("e6")));
        assert_eq!(position.fen(), fen);
        for m in position.legal_moves().iter() {
            let child = position.play(*m).unwrap();
            assert_ne!(child.en_passant(), Some(sq("e6")));
        }
    }

    #[test]
    fn implausible_en_passant_square_is_dropped() {
        let position =
            Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e3 0 1")
                .unwrap();
        assert_eq!(position.en_passant(), None);
    }

    #[test]
    fn en_passant_capture_removes_the_pawn() {
        let position = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        let after = uci(&position, "e5d6");
        assert_eq!(after.piece_at(sq("d5")), None);
        assert_eq!(after.piece_at(sq("d6")), Some((Piece::Pawn, Color::White)));
        assert_eq!(after.captured_piece(), Some(Piece::Pawn));
        assert_eq!(after.hash(), fresh_hash(&after));
    }

    #[test]
    fn illegal_move_is_reported() {
        // The e-pawn is pinned by the rook on e8.
        let position = Position::from_fen("4r1k1/8/8/8/8/8/4P3/4K3 w - - 0 1").unwrap();
        let mut child = position.make_child();
        let pinned_push = Move::new(sq("e2"), sq("d3"), MoveFlag::Normal);
        assert!(!child.apply_move(pinned_push));
        let king_step = Move::normal(Square::E1, Square::D1);
        assert!(position.play(king_step).is_some());
    }

    #[test]
    fn castling_moves_king_and_rook() {
        let position = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let after = uci(&position, "e1g1");
        assert_eq!(after.piece_at(Square::G1), Some((Piece::King, Color::White)));
        assert_eq!(after.piece_at(Square::F1), Some((Piece::Rook, Color::White)));
        assert_eq!(after.piece_at(Square::H1), None);
        assert!(!after.castling_rights().has_any(Color::White));
        assert!(after.castling_rights().has_any(Color::Black));
        assert_eq!(after.fen(), "r3k2r/8/8/8/8/8/8/R4RK1 b kq - 1 1");
        assert_eq!(after.hash(), fresh_hash(&after));
    }

    #[test]
    fn capturing_a_rook_revokes_its_right() {
        let position = Position::from_fen("r3k2r/8/8/8/8/8/6B1/R3K2R w KQkq - 0 1").unwrap();
        let after = uci(&position, "g2a8");
        assert_eq!(after.fen(), "B3k2r/8/8/8/8/8/8/R3K2R b KQk - 0 1");
    }

    #[test]
    fn chess960_castle_with_king_on_destination_file() {
        // King already on g1, rook on h1.
        let position = Position::from_fen("6kr/8/8/8/8/8/8/6KR w Hh - 0 1").unwrap();
        assert!(position.is_chess960());
        let castle = position.parse_uci_move("g1h1").unwrap();
        assert_eq!(castle.flag(), MoveFlag::CastleKingside);
        assert_eq!(position.move_to_uci(castle), "g1h1");
        let after = position.play(castle).unwrap();
        assert_eq!(after.piece_at(Square::G1), Some((Piece::King, Color::White)));
        assert_eq!(after.piece_at(Square::F1), Some((Piece::Rook, Color::White)));
        assert_eq!(after.hash(), fresh_hash(&after));
    }

    #[test]
    fn promotion_updates_material() {
        let position = Position::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let before = position.material();
        let after = uci(&position, "a7a8q");
        assert_eq!(after.piece_at(Square::A8), Some((Piece::Queen, Color::White)));
        assert_ne!(after.material(), before);
        assert_eq!(
            after.material(),
            Position::from_fen(&after.fen()).unwrap().material()
        );
    }

    #[test]
    fn second_queen_makes_material_unusual() {
        let position = Position::from_fen("4k3/P7/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        let after = uci(&position, "a7a8q");
        assert_eq!(after.material(), MaterialSignature::Unusual);
        let recaptured = Position::from_fen("q3k3/8/8/8/8/8/8/Q3K3 b - - 0 1").unwrap();
        let back = uci(&recaptured, "a8a1");
        assert!(matches!(back.material(), MaterialSignature::Standard(_)));
    }

    #[test]
    fn pins_are_found_and_cached() {
        let mut position = Position::from_fen("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
        let info = position.pin_info(Color::White);
        assert_eq!(info.pinned, Bitboard::from_square(sq("e2")));
        assert_eq!(info.pinners, Bitboard::from_square(sq("e8")));
        assert_eq!(position.pins(Color::White), info);
        assert!(position.pin_info(Color::Black).pinned.is_empty());
    }

    #[test]
    fn gives_check_direct_and_discovered() {
        let position = Position::from_fen("4k3/8/8/8/8/8/4N3/4RK2 w - - 0 1").unwrap();
        // Knight leaves the e-file: discovered check from the rook.
        assert!(position.gives_check(Move::normal(sq("e2"), sq("c3"))));
        // Knight to d4 is not a check, but still discovers the rook.
        assert!(position.gives_check(Move::normal(sq("e2"), sq("d4"))));
        let quiet = Position::from_fen("4k3/8/8/8/8/8/8/4RK2 w - - 0 1").unwrap();
        assert!(!quiet.gives_check(Move::normal(Square::F1, Square::G1)));
        let direct = Position::from_fen("4k3/8/8/8/8/8/8/3R1K2 w - - 0 1").unwrap();
        assert!(direct.gives_check(Move::normal(Square::D1, Square::E1)));
        assert!(!direct.gives_check(Move::normal(Square::D1, Square::C1)));
    }

    #[test]
    fn gives_check_agrees_with_playing_the_move() {
        let position = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        for &m in position.legal_moves().iter() {
            let child = position.play(m).unwrap();
            assert_eq!(position.gives_check(m), child.in_check(), "{}", m);
        }
    }

    #[test]
    fn parent_chain_and_history() {
        let root = Position::startpos();
        let history = [1u64, 2, 3];
        let root = root.with_history(&history);
        let a = uci(&root, "g1f3");
        let b = uci(&a, "g8f6");
        assert_eq!(b.ply(), 2);
        assert_eq!(b.previous().map(|p| p.hash()), Some(a.hash()));
        let hashes: Vec<u64> = b.ancestor_hashes().collect();
        assert_eq!(hashes, vec![a.hash(), root.hash(), 3, 2, 1]);
        assert_eq!(b.last_moved_piece(), Some((Piece::Knight, Color::Black)));
        assert!(b.detached().previous().is_none());
    }

    #[test]
    fn fullmove_and_draw_plies() {
        let root = Position::startpos();
        let a = uci(&root, "g1f3");
        assert_eq!(a.draw_plies(), 1);
        assert_eq!(a.fullmove_number(), 1);
        let b = uci(&a, "e7e5");
        assert_eq!(b.draw_plies(), 0);
        assert_eq!(b.fullmove_number(), 2);
    }

    #[test]
    fn search_root_keeps_ancestors() {
        let root = Position::startpos();
        let a = uci(&root, "g1f3");
        let b = uci(&a, "g8f6");
        let copy = b.search_root();
        assert_eq!(copy.ply(), 0);
        assert_eq!(copy.hash(), b.hash());
        assert_eq!(copy.ancestor_hashes().count(), 2);
    }
}
