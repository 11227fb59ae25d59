//! Core chess vocabulary shared by the engine crates.
//!
//! - [`Piece`] and [`Color`]
//! - [`Square`], [`File`] and [`Rank`]
//! - [`Move`], a 16-bit move encoding
//! - [`Fen`], lenient FEN tokenising

mod color;
mod fen;
mod mov;
mod piece;
mod square;

pub use color::Color;
pub use fen::{Fen, FenError};
pub use mov::{Move, MoveFlag};
pub use piece::Piece;
pub use square::{File, Rank, Square};
