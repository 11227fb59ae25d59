//! Castling rights, including Chess960 rook placement.

use chess_core::{Color, File, MoveFlag, Piece, Square};

/// Which rook the king castles with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastleSide {
    King = 0,
    Queen = 1,
}

impl CastleSide {
    pub const ALL: [CastleSide; 2] = [CastleSide::King, CastleSide::Queen];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// File the king ends on (g or c), whatever its origin.
    #[inline]
    pub const fn king_file(self) -> u8 {
        match self {
            CastleSide::King => 6,
            CastleSide::Queen => 2,
        }
    }

    /// File the rook ends on (f or d).
    #[inline]
    pub const fn rook_file(self) -> u8 {
        match self {
            CastleSide::King => 5,
            CastleSide::Queen => 3,
        }
    }

    #[inline]
    pub const fn flag(self) -> MoveFlag {
        match self {
            CastleSide::King => MoveFlag::CastleKingside,
            CastleSide::Queen => MoveFlag::CastleQueenside,
        }
    }

    #[inline]
    pub const fn from_flag(flag: MoveFlag) -> Option<CastleSide> {
        match flag {
            MoveFlag::CastleKingside => Some(CastleSide::King),
            MoveFlag::CastleQueenside => Some(CastleSide::Queen),
            _ => None,
        }
    }
}

/// Four rights packed as bits `color * 2 + side`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const ALL: CastlingRights = CastlingRights(0b1111);

    #[inline]
    pub const fn index(color: Color, side: CastleSide) -> usize {
        color.index() * 2 + side.index()
    }

    #[inline]
    const fn bit(color: Color, side: CastleSide) -> u8 {
        1 << Self::index(color, side)
    }

    #[inline]
    pub const fn has(self, color: Color, side: CastleSide) -> bool {
        self.0 & Self::bit(color, side) != 0
    }

    #[inline]
    pub const fn has_any(self, color: Color) -> bool {
        self.0 & (0b11 << (color.index() * 2)) != 0
    }

    #[inline]
    pub fn insert(&mut self, color: Color, side: CastleSide) {
        self.0 |= Self::bit(color, side);
    }

    #[inline]
    pub fn remove(&mut self, color: Color, side: CastleSide) {
        self.0 &= !Self::bit(color, side);
    }

    /// Clears every right whose bit is set in `mask`.
    #[inline]
    pub fn revoke(&mut self, mask: u8) {
        self.0 &= !mask;
    }

    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Indices (0-3) of the rights held.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..4).filter(move |i| self.0 & (1 << i) != 0)
    }
}

/// Rook and king origins for a game, fixed once the position is set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastlingSetup {
    rooks: [[Square; 2]; 2],
    kings: [Square; 2],
    /// Rights revoked when a piece leaves or is captured on the square.
    masks: [u8; 64],
    chess960: bool,
}

impl Default for CastlingSetup {
    fn default() -> Self {
        CastlingSetup {
            rooks: [[Square::H1, Square::A1], [Square::H8, Square::A8]],
            kings: [Square::E1, Square::E8],
            masks: [0; 64],
            chess960: false,
        }
    }
}

impl CastlingSetup {
    /// Resolves a FEN castling field against the board.
    ///
    /// `K`/`Q` pick the outermost rook on that side of the king; file letters
    /// name the rook directly. Letters that do not match a rook next to a king
    /// on its back rank are ignored.
    pub fn from_fen(
        field: &str,
        board: &[Option<(Piece, Color)>; 64],
    ) -> (CastlingSetup, CastlingRights) {
        let mut setup = CastlingSetup::default();
        let mut rights = CastlingRights::NONE;

        for c in field.chars() {
            let color = if c.is_ascii_uppercase() {
                Color::White
            } else {
                Color::Black
            };
            let rank = color.back_rank();
            let Some(king) = (0..8)
                .map(|f| Square::from_coords(f, rank))
                .find(|sq| board[sq.idx()] == Some((Piece::King, color)))
            else {
                continue;
            };
            let is_rook = |file: u8| board[Square::from_coords(file, rank).idx()] == Some((Piece::Rook, color));

            let found = match c.to_ascii_lowercase() {
                'k' => (king.file_index() + 1..8)
                    .rev()
                    .find(|&f| is_rook(f))
                    .map(|f| (CastleSide::King, f)),
                'q' => (0..king.file_index())
                    .find(|&f| is_rook(f))
                    .map(|f| (CastleSide::Queen, f)),
                letter => File::from_char(letter)
                    .map(File::index)
                    .filter(|&f| f != king.file_index() && is_rook(f))
                    .map(|f| {
                        setup.chess960 = true;
                        if f > king.file_index() {
                            (CastleSide::King, f)
                        } else {
                            (CastleSide::Queen, f)
                        }
                    }),
            };

            if let Some((side, file)) = found {
                let rook = Square::from_coords(file, rank);
                setup.rooks[color.index()][side.index()] = rook;
                setup.kings[color.index()] = king;
                rights.insert(color, side);
                if king.file_index() != 4 || (file != 0 && file != 7) {
                    setup.chess960 = true;
                }
            }
        }

        setup.rebuild_masks(rights);
        (setup, rights)
    }

    fn rebuild_masks(&mut self, rights: CastlingRights) {
        self.masks = [0; 64];
        for color in Color::ALL {
            for side in CastleSide::ALL {
                if rights.has(color, side) {
                    let bit = 1u8 << CastlingRights::index(color, side);
                    self.masks[self.rook(color, side).idx()] |= bit;
                    self.masks[self.king(color).idx()] |= bit;
                }
            }
        }
    }

    #[inline]
    pub fn rook(&self, color: Color, side: CastleSide) -> Square {
        self.rooks[color.index()][side.index()]
    }

    #[inline]
    pub fn king(&self, color: Color) -> Square {
        self.kings[color.index()]
    }

    #[inline]
    pub fn mask(&self, sq: Square) -> u8 {
        self.masks[sq.idx()]
    }

    #[inline]
    pub fn is_chess960(&self) -> bool {
        self.chess960
    }

    pub fn set_chess960(&mut self, chess960: bool) {
        self.chess960 = chess960;
    }

    /// Where king and rook land.
    #[inline]
    pub fn destinations(color: Color, side: CastleSide) -> (Square, Square) {
        let rank = color.back_rank();
        (
            Square::from_coords(side.king_file(), rank),
            Square::from_coords(side.rook_file(), rank),
        )
    }

    /// FEN castling field. `KQkq` letters are used for outermost rooks,
    /// file letters otherwise.
    pub fn to_fen(&self, rights: CastlingRights, board: &[Option<(Piece, Color)>; 64]) -> String {
        let mut out = String::new();
        for color in Color::ALL {
            for side in CastleSide::ALL {
                if !rights.has(color, side) {
                    continue;
                }
                let rook = self.rook(color, side);
                let rank = color.back_rank();
                let outward: Vec<u8> = match side {
                    CastleSide::King => (rook.file_index() + 1..8).collect(),
                    CastleSide::Queen => (0..rook.file_index()).collect(),
                };
                let outermost = outward.iter().all(|&f| {
                    board[Square::from_coords(f, rank).idx()] != Some((Piece::Rook, color))
                });
                let letter = if outermost {
                    match side {
                        CastleSide::King => 'k',
                        CastleSide::Queen => 'q',
                    }
                } else {
                    rook.file().to_char()
                };
                out.push(match color {
                    Color::White => letter.to_ascii_uppercase(),
                    Color::Black => letter,
                });
            }
        }
        if out.is_empty() {
            out.push('-');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::Fen;

    fn setup(fen: &str) -> (CastlingSetup, CastlingRights, [Option<(Piece, Color)>; 64]) {
        let parsed = Fen::parse(fen).unwrap();
        let (setup, rights) = CastlingSetup::from_fen(&parsed.castling, &parsed.board);
        (setup, rights, parsed.board)
    }

    #[test]
    fn standard_rights() {
        let (setup, rights, board) = setup(Fen::STARTPOS);
        assert_eq!(rights, CastlingRights::ALL);
        assert!(!setup.is_chess960());
        assert_eq!(setup.rook(Color::White, CastleSide::King), Square::H1);
        assert_eq!(setup.rook(Color::Black, CastleSide::Queen), Square::A8);
        assert_eq!(setup.to_fen(rights, &board), "KQkq");
    }

    #[test]
    fn masks_cover_king_and_rooks() {
        let (setup, _, _) = setup(Fen::STARTPOS);
        assert_eq!(setup.mask(Square::E1), 0b0011);
        assert_eq!(setup.mask(Square::H1), 0b0001);
        assert_eq!(setup.mask(Square::A8), 0b1000);
        assert_eq!(setup.mask(Square::D1), 0);
    }

    #[test]
    fn shredder_letters_resolve_rooks() {
        let (setup, rights, board) =
            setup("bqnbrkrn/pppppppp/8/8/8/8/PPPPPPPP/BQNBRKRN w GEge - 0 1");
        assert!(setup.is_chess960());
        assert!(rights.has(Color::White, CastleSide::King));
        assert!(rights.has(Color::Black, CastleSide::Queen));
        assert_eq!(setup.rook(Color::White, CastleSide::King), Square::G1);
        assert_eq!(setup.rook(Color::White, CastleSide::Queen), Square::E1);
        assert_eq!(setup.king(Color::Black), Square::F8);
        assert_eq!(setup.to_fen(rights, &board), "KQkq");
    }

    #[test]
    fn inner_rook_keeps_its_file_letter() {
        // Two rooks on the king side: the right belongs to the inner one.
        let (setup, rights, board) = setup("4k3/8/8/8/8/8/8/R3KR1R w FA - 0 1");
        assert_eq!(setup.rook(Color::White, CastleSide::King), Square::F1);
        assert_eq!(setup.to_fen(rights, &board), "FQ");
    }

    #[test]
    fn letters_without_rooks_are_ignored() {
        let (_, rights, board) = setup("4k3/8/8/8/8/8/8/4K3 w KQkq - 0 1");
        assert!(rights.is_empty());
        assert_eq!(CastlingSetup::default().to_fen(rights, &board), "-");
    }

    #[test]
    fn revoke_by_mask() {
        let mut rights = CastlingRights::ALL;
        rights.revoke(0b0011);
        assert!(!rights.has_any(Color::White));
        assert!(rights.has(Color::Black, CastleSide::King));
        assert_eq!(rights.indices().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn destinations() {
        assert_eq!(
            CastlingSetup::destinations(Color::Black, CastleSide::Queen),
            (Square::C8, Square::D8)
        );
        assert_eq!(
            CastlingSetup::destinations(Color::White, CastleSide::King),
            (Square::G1, Square::F1)
        );
    }
}
