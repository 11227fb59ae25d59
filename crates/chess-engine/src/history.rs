//! Game replay with history tracking.
//!
//! [`GameHistory`] applies a sequence of moves to a starting position and
//! keeps the hash of every position passed through, so that a search started
//! from the current position detects repetitions of earlier game positions.

use thiserror::Error;

use crate::result::GameResult;
use crate::san::move_to_san;
use crate::Position;
use chess_core::{FenError, Move};

/// A move that has been played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMove {
    pub mv: Move,
    pub san: String,
    /// Hash of the position the move was played in.
    pub hash_before: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("illegal move: {0}")]
    IllegalMove(String),
    #[error("game is over: {0}")]
    GameOver(GameResult),
}

#[derive(Debug)]
pub struct GameHistory {
    start: Position<'static>,
    current: Position<'static>,
    hashes: Vec<u64>,
    moves: Vec<GameMove>,
}

impl Default for GameHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl GameHistory {
    pub fn new() -> Self {
        Self::from_position(Position::startpos())
    }

    pub fn from_position(position: Position<'static>) -> Self {
        GameHistory {
            start: position.detached(),
            current: position,
            hashes: Vec::new(),
            moves: Vec::new(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        Ok(Self::from_position(Position::from_fen(fen)?))
    }

    /// Current position, linked to the game so far for repetition checks.
    pub fn position(&self) -> Position<'_> {
        self.current.detached().with_history(&self.hashes)
    }

    pub fn start_position(&self) -> &Position<'static> {
        &self.start
    }

    /// Hashes of the positions before the current one, oldest first.
    pub fn hashes(&self) -> &[u64] {
        &self.hashes
    }

    pub fn moves(&self) -> &[GameMove] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn fen(&self) -> String {
        self.current.fen()
    }

    pub fn result(&self) -> GameResult {
        self.position().classify()
    }

    /// Plays `m` if it is legal and the game is still open.
    pub fn push(&mut self, m: Move) -> Result<(), GameError> {
        let position = self.position();
        let result = position.classify();
        if result.is_decided() {
            return Err(GameError::GameOver(result));
        }
        if !position.legal_moves().contains(m) {
            return Err(GameError::IllegalMove(position.move_to_uci(m)));
        }
        let san = move_to_san(&position, m);
        let next = position
            .play(m)
            .map(|child| child.detached())
            .ok_or_else(|| GameError::IllegalMove(m.to_uci()))?;
        let hash_before = position.hash();
        drop(position);

        self.hashes.push(hash_before);
        self.moves.push(GameMove {
            mv: m,
            san,
            hash_before,
        });
        self.current = next;
        Ok(())
    }

    /// Plays a move given in coordinate notation.
    pub fn push_uci(&mut self, text: &str) -> Result<(), GameError> {
        let m = self
            .current
            .parse_uci_move(text)
            .ok_or_else(|| GameError::IllegalMove(text.to_string()))?;
        self.push(m)
    }

    /// Takes back the last move.
    pub fn pop(&mut self) -> Option<GameMove> {
        let last = self.moves.pop()?;
        self.hashes.pop();
        let mut position = self.start.detached();
        for played in &self.moves {
            let next = position.play(played.mv).map(|child| child.detached());
            match next {
                Some(next) => position = next,
                None => break,
            }
        }
        self.current = position;
        Some(last)
    }
}
