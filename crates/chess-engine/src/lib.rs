//! Bitboard position core for an alpha-beta chess engine.
//!
//! This crate provides:
//! - [`Bitboard`] - 64-bit square sets
//! - [`Position`] - copy-make position with incremental hashing, material
//!   signatures and cached attack maps
//! - [`MoveList`] and full/legal move generation, plus [`perft`](movegen::perft)
//! - staged move generation ([`GenerationKind`], [`MoveStager`]) driven by
//!   [`HistoryTables`] and static exchange evaluation
//! - [`GameResult`] classification and [`GameHistory`] for replaying games
//! - SAN rendering for principal variations
//!
//! # Architecture
//!
//! A child position is built by copying its parent and applying one move. The
//! child keeps a reference to its parent, so repetition detection walks the
//! chain of ancestors and then the game history slice, without any undo
//! stack.
//!
//! # Example
//!
//! ```
//! use chess_engine::Position;
//!
//! let root = Position::startpos();
//! let moves = root.legal_moves();
//! assert_eq!(moves.len(), 20);
//!
//! let e4 = root.parse_uci_move("e2e4").unwrap();
//! let child = root.play(e4).unwrap();
//! assert_eq!(child.ply(), 1);
//! assert_eq!(child.previous().map(|p| p.hash()), Some(root.hash()));
//! ```

mod bitboard;
mod castling;
mod history;
mod material;
pub mod movegen;
mod ordering;
mod position;
mod result;
pub mod san;
mod see;
mod staged;
mod zobrist;

pub use bitboard::{Bitboard, BitboardIter};
pub use castling::{CastleSide, CastlingRights, CastlingSetup};
pub use history::{GameError, GameHistory, GameMove};
pub use material::{MaterialSignature, MATERIAL_KEYS};
pub use movegen::perft::{perft, perft_divide, perft_staged};
pub use movegen::{
    between, bishop_attacks, king_attacks, knight_attacks, line, pawn_attacks, queen_attacks,
    rook_attacks, MoveList,
};
pub use ordering::{HistoryTables, COUNTER_MOVE_SCORE, MAX_PLY};
pub use position::{PinInfo, Position};
pub use result::{DrawReason, GameResult};
pub use san::{line_to_san, move_to_san};
pub use see::{see_value, SEE_VALUES};
pub use staged::{GenerationKind, MoveStager, ValuatedMove};
pub use zobrist::{ZobristKeys, ZOBRIST};
