//! Zobrist keys.
//!
//! A position hash is the XOR of one key per occupied (piece, color, square),
//! the side-to-move key when Black is to move, one key per castling right
//! held, and the en-passant file key when a capture there is possible.

use chess_core::{Color, Piece, Square};

pub struct ZobristKeys {
    pieces: [[[u64; 64]; 2]; 6],
    black_to_move: u64,
    castling: [u64; 4],
    en_passant: [u64; 8],
}

impl ZobristKeys {
    /// Fills the tables from a xorshift64 stream with a fixed seed.
    const fn generate() -> Self {
        const fn next(state: u64) -> u64 {
            let mut x = state;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            x
        }

        let mut state = 0x9E37_79B9_7F4A_7C15u64;
        let mut pieces = [[[0u64; 64]; 2]; 6];
        let mut piece = 0;
        while piece < 6 {
            let mut color = 0;
            while color < 2 {
                let mut sq = 0;
                while sq < 64 {
                    state = next(state);
                    pieces[piece][color][sq] = state;
                    sq += 1;
                }
                color += 1;
            }
            piece += 1;
        }

        state = next(state);
        let black_to_move = state;

        let mut castling = [0u64; 4];
        let mut i = 0;
        while i < 4 {
            state = next(state);
            castling[i] = state;
            i += 1;
        }

        let mut en_passant = [0u64; 8];
        let mut i = 0;
        while i < 8 {
            state = next(state);
            en_passant[i] = state;
            i += 1;
        }

        ZobristKeys {
            pieces,
            black_to_move,
            castling,
            en_passant,
        }
    }

    #[inline]
    pub fn piece(&self, piece: Piece, color: Color, sq: Square) -> u64 {
        self.pieces[piece.index()][color.index()][sq.idx()]
    }

    #[inline]
    pub fn black_to_move(&self) -> u64 {
        self.black_to_move
    }

    /// Key for castling right `index` (see `CastlingRights::index`).
    #[inline]
    pub fn castling(&self, index: usize) -> u64 {
        self.castling[index]
    }

    #[inline]
    pub fn en_passant(&self, sq: Square) -> u64 {
        self.en_passant[sq.file_index() as usize]
    }
}

pub static ZOBRIST: ZobristKeys = ZobristKeys::generate();
