//! Search layer of the engine.
//!
//! This crate provides:
//! - [`Engine`] - iterative deepening with aspiration windows, principal
//!   variation search, quiescence and lazy SMP helper threads
//! - [`TranspositionTable`] - lock-free, shared by all search threads
//! - [`Evaluator`] and the material-keyed [`PieceSquareEvaluator`]
//! - [`TimeManager`] and [`SearchLimits`] for clock handling
//! - [`SearchSignals`] for stop and ponder-hit from another thread
//! - [`InfoSink`] for UCI-style progress output
//! - [`EngineConfig`] loaded from TOML
//!
//! # Example
//!
//! ```
//! use chess_engine::Position;
//! use chess_search::{Engine, NullSink, SearchLimits};
//!
//! let mut engine = Engine::default();
//! let root = Position::startpos();
//! let result = engine.think(&root, &SearchLimits::depth(3), &NullSink);
//! assert_eq!(result.depth, 3);
//! assert!(root.legal_moves().contains(result.best_move));
//! ```

mod config;
mod eval;
mod info;
mod score;
mod search;
mod signals;
mod time;
mod tt;

pub use config::{ConfigError, EngineConfig};
pub use eval::{
    strategy_for, EndgameStrategy, Evaluation, Evaluator, Phased, PieceSquareEvaluator, MAX_PHASE,
};
pub use info::{
    bestmove_line, currmove_line, write_line, CollectingSink, InfoLine, InfoSink, NullSink,
    StdoutSink,
};
pub use score::{is_mate_score, mate_in, mated_in, Score, DRAW, INFINITE, MATE, MATE_BOUND};
pub use search::{
    extract_pv, line_to_uci, Engine, SearchResult, PV_MAX_LENGTH, TIME_CHECK_MASK,
};
pub use signals::SearchSignals;
pub use time::{SearchLimits, StandardTimeManager, TimeManager};
pub use tt::{Bound, TranspositionTable, TtEntry};
