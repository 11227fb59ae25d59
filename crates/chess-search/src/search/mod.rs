//! Parallel iterative-deepening search.
//!
//! [`Engine::think`] runs one master thread and `threads - 1` helpers over a
//! shared transposition table (lazy SMP). Helpers start at staggered depths
//! and only feed the table; the answer is the master's. The master alone
//! reads the clock, prints progress and decides when to stop.

mod pv;
mod root;
mod thread;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread as std_thread;
use std::time::{Duration, Instant};

use chess_core::Move;
use chess_engine::{HistoryTables, Position};
use tracing::{debug, error, info, warn};

pub use pv::{extract_pv, line_to_uci, PV_MAX_LENGTH};
pub use thread::TIME_CHECK_MASK;

use crate::config::EngineConfig;
use crate::eval::{Evaluator, PieceSquareEvaluator};
use crate::info::InfoSink;
use crate::score::{mated_in, DRAW, INFINITE};
use crate::signals::SearchSignals;
use crate::time::{SearchLimits, StandardTimeManager, TimeManager};
use crate::tt::TranspositionTable;
use root::{root_moves, Completed, RootMove};
use thread::{Master, SearchContext, SearchThread, SharedState};

/// Stack of every search thread; the recursion copies a full position per ply.
const STACK_SIZE: usize = 64 * 1024 * 1024;
/// How long one wait for the end of pondering lasts before looking again.
const PONDER_POLL: Duration = Duration::from_millis(50);

/// Outcome of [`Engine::think`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// `Move::NULL` when the root has no legal move.
    pub best_move: Move,
    pub ponder_move: Option<Move>,
    /// Score from the root side's point of view.
    pub score: i32,
    /// Last fully searched depth.
    pub depth: u32,
    pub seldepth: u32,
    /// Nodes of all threads.
    pub nodes: u64,
    pub pv: Vec<Move>,
    pub elapsed: Duration,
}

pub struct Engine {
    config: EngineConfig,
    evaluator: Box<dyn Evaluator>,
    tt: TranspositionTable,
    /// Ordering tables, one per thread, kept across searches.
    tables: Vec<HistoryTables>,
    signals: Arc<SearchSignals>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineConfig::default(), PieceSquareEvaluator::new())
    }
}

impl Engine {
    pub fn new(mut config: EngineConfig, evaluator: impl Evaluator + 'static) -> Self {
        config.validate();
        let tables = (0..config.threads).map(|_| HistoryTables::new()).collect();
        Engine {
            tt: TranspositionTable::new(config.hash_mb),
            tables,
            evaluator: Box::new(evaluator),
            signals: Arc::new(SearchSignals::new()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Applies a new configuration, resizing the table and the per-thread
    /// tables when their settings changed.
    pub fn set_config(&mut self, mut config: EngineConfig) {
        config.validate();
        if config.hash_mb != self.config.hash_mb {
            self.tt.resize(config.hash_mb);
        }
        self.tables.resize_with(config.threads, HistoryTables::new);
        self.config = config;
    }

    /// Handle for stopping a running search or signalling a ponder hit from
    /// another thread.
    pub fn signals(&self) -> Arc<SearchSignals> {
        Arc::clone(&self.signals)
    }

    pub fn tt(&self) -> &TranspositionTable {
        &self.tt
    }

    /// Forgets everything learned from the previous game.
    pub fn new_game(&mut self) {
        self.tt.clear();
        for tables in &mut self.tables {
            tables.clear();
        }
        debug!("engine state cleared for a new game");
    }

    /// Searches `root` within `limits`, reporting progress to `sink`, and
    /// finishes with the `bestmove` line.
    pub fn think(
        &mut self,
        root: &Position<'_>,
        limits: &SearchLimits,
        sink: &dyn InfoSink,
    ) -> SearchResult {
        let start = Instant::now();
        let pondering = limits.ponder && self.config.ponder;
        if limits.ponder && !self.config.ponder {
            warn!("ponder search requested with pondering disabled, searching normally");
        }
        self.signals.reset(pondering);
        self.tt.new_search();
        for tables in &mut self.tables {
            tables.age();
        }

        let mut root = root.search_root();
        if self.config.chess960 {
            root.set_chess960(true);
        }
        let moves = root_moves(&root);
        info!(
            fen = %root.fen(),
            threads = self.config.threads,
            legal_moves = moves.len(),
            "search started"
        );

        if moves.is_empty() {
            let score = if root.in_check() { mated_in(0) } else { DRAW };
            warn!(score, "no legal move at the root");
            sink.best_move(&Move::NULL.to_uci(), None);
            return SearchResult {
                best_move: Move::NULL,
                ponder_move: None,
                score,
                depth: 0,
                seldepth: 0,
                nodes: 0,
                pv: Vec::new(),
                elapsed: start.elapsed(),
            };
        }

        let mut clock = StandardTimeManager::new(
            limits,
            root.side_to_move(),
            self.config.move_overhead(),
            self.config.emergency_time(),
            start,
        );
        let max_depth = if moves.len() == 1 { 1 } else { clock.max_depth() };

        let shared = SharedState::default();
        self.tables
            .resize_with(self.config.threads.max(1), HistoryTables::new);
        let ctx = SearchContext {
            config: &self.config,
            evaluator: self.evaluator.as_ref(),
            tt: &self.tt,
            signals: &self.signals,
            shared: &shared,
        };
        let (master_tables, helper_tables) = self.tables.split_at_mut(1);
        let master_tables = &mut master_tables[0];
        let master_clock: &mut dyn TimeManager = &mut clock;
        let root_ref = &root;
        let first_move = moves[0].clone();

        let (completed, fallback, seldepth) = std_thread::scope(move |scope| {
            for (index, tables) in helper_tables.into_iter().enumerate() {
                let moves = moves.clone();
                let spawned = std_thread::Builder::new()
                    .name(format!("search-helper-{}", index + 1))
                    .stack_size(STACK_SIZE)
                    .spawn_scoped(scope, move || {
                        let mut helper = SearchThread::new(ctx, tables, None, moves, start);
                        helper.iterate(root_ref, 1 + (index as u32 + 1) % 2, max_depth);
                        helper.flush_nodes();
                    });
                if let Err(err) = spawned {
                    warn!(%err, "failed to start search helper");
                }
            }

            let run_master = move || {
                let master = Master {
                    clock: master_clock,
                    sink,
                    pondering,
                };
                let mut thread = SearchThread::new(ctx, master_tables, Some(master), moves, start);
                let completed = thread.iterate(root_ref, 1, max_depth);
                wait_for_ponder_end(ctx.signals);
                ctx.shared.done.store(true, Ordering::Relaxed);
                thread.flush_nodes();
                let fallback = thread.root_moves[0].clone();
                (completed, fallback, thread.seldepth)
            };
            let spawned = std_thread::Builder::new()
                .name("search-master".to_string())
                .stack_size(STACK_SIZE)
                .spawn_scoped(scope, run_master);
            match spawned {
                Ok(handle) => match handle.join() {
                    Ok(outcome) => outcome,
                    Err(panic) => {
                        ctx.shared.done.store(true, Ordering::Relaxed);
                        std::panic::resume_unwind(panic)
                    }
                },
                Err(err) => {
                    error!(%err, "failed to start the search master thread");
                    ctx.shared.done.store(true, Ordering::Relaxed);
                    (None, first_move, 0)
                }
            }
        });

        let nodes = shared.nodes.load(Ordering::Relaxed);
        let result = self.finish(&root, completed, fallback, seldepth, nodes, start);
        let ponder = result.ponder_move.map(|m| root_ponder_text(&root, result.best_move, m));
        sink.best_move(&root.move_to_uci(result.best_move), ponder.as_deref());
        info!(
            best = %root.move_to_uci(result.best_move),
            score = result.score,
            depth = result.depth,
            nodes = result.nodes,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "search finished"
        );
        result
    }

    fn finish(
        &self,
        root: &Position<'_>,
        completed: Option<Completed>,
        fallback: RootMove,
        seldepth: u32,
        nodes: u64,
        start: Instant,
    ) -> SearchResult {
        let (depth, score, line) = match completed {
            Some(Completed { depth, mut lines, .. }) => {
                let line = lines.swap_remove(0);
                (depth, line.score, line)
            }
            None => {
                let score = if fallback.score > -INFINITE {
                    fallback.score
                } else {
                    DRAW
                };
                let line = RootMove {
                    pv: extract_pv(root, &fallback.pv, &self.tt),
                    ..fallback
                };
                (0, score, line)
            }
        };
        SearchResult {
            best_move: line.mv,
            ponder_move: line.pv.get(1).copied(),
            score,
            depth,
            seldepth,
            nodes,
            pv: line.pv,
            elapsed: start.elapsed(),
        }
    }
}

/// Text of the expected reply, rendered in the position after `best`.
fn root_ponder_text(root: &Position<'_>, best: Move, reply: Move) -> String {
    match root.play(best) {
        Some(next) => next.move_to_uci(reply),
        None => reply.to_uci(),
    }
}

/// A pondering search that ran out of depth still may not answer before
/// the ponder hit or the stop.
fn wait_for_ponder_end(signals: &SearchSignals) {
    while !signals.is_stopped() && signals.wait_while_pondering(PONDER_POLL) {}
}
