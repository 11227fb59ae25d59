//! Alpha-beta and quiescence search run by every thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use chess_core::Move;
use chess_engine::{GenerationKind, HistoryTables, MoveList, Position, MAX_PLY};
use tracing::debug;

use super::pv::PvLine;
use super::root::RootMove;
use crate::config::EngineConfig;
use crate::eval::Evaluator;
use crate::info::InfoSink;
use crate::score::{mate_in, mated_in, DRAW, INFINITE};
use crate::signals::SearchSignals;
use crate::time::TimeManager;
use crate::tt::{Bound, TranspositionTable};

/// The master looks at the clock when its node count has these bits clear.
pub const TIME_CHECK_MASK: u64 = 0x3FFF;
/// Thread-local node counts are published this often.
const NODE_FLUSH_MASK: u64 = 0x3FF;
/// Table depth of quiescence results; below every full-width entry.
const QUIESCENCE_DEPTH: i32 = -1;

/// Counters shared by all threads of one search.
#[derive(Debug, Default)]
pub(crate) struct SharedState {
    /// Set once the master has finished; helpers unwind on it.
    pub(crate) done: AtomicBool,
    pub(crate) nodes: AtomicU64,
}

/// Everything a thread reads but never owns.
#[derive(Clone, Copy)]
pub(crate) struct SearchContext<'e> {
    pub(crate) config: &'e EngineConfig,
    pub(crate) evaluator: &'e dyn Evaluator,
    pub(crate) tt: &'e TranspositionTable,
    pub(crate) signals: &'e SearchSignals,
    pub(crate) shared: &'e SharedState,
}

/// Duties of the master thread: the clock and the output.
pub(crate) struct Master<'e> {
    pub(crate) clock: &'e mut dyn TimeManager,
    pub(crate) sink: &'e dyn InfoSink,
    /// Still searching on the opponent's time.
    pub(crate) pondering: bool,
}

pub(crate) struct SearchThread<'e> {
    pub(crate) ctx: SearchContext<'e>,
    pub(crate) tables: &'e mut HistoryTables,
    pub(crate) master: Option<Master<'e>>,
    pub(crate) start: Instant,
    pub(crate) nodes: u64,
    flushed: u64,
    pub(crate) seldepth: u32,
    pub(crate) root_moves: Vec<RootMove>,
}

impl<'e> SearchThread<'e> {
    pub(crate) fn new(
        ctx: SearchContext<'e>,
        tables: &'e mut HistoryTables,
        master: Option<Master<'e>>,
        root_moves: Vec<RootMove>,
        start: Instant,
    ) -> Self {
        SearchThread {
            ctx,
            tables,
            master,
            start,
            nodes: 0,
            flushed: 0,
            seldepth: 0,
            root_moves,
        }
    }

    #[inline]
    pub(crate) fn is_master(&self) -> bool {
        self.master.is_some()
    }

    /// Whether the current iteration must be abandoned.
    #[inline]
    pub(crate) fn aborted(&self) -> bool {
        self.ctx.signals.is_stopped()
            || (self.master.is_none() && self.ctx.shared.done.load(Ordering::Relaxed))
    }

    /// Nodes of every thread published so far plus this thread's remainder.
    pub(crate) fn total_nodes(&self) -> u64 {
        self.ctx.shared.nodes.load(Ordering::Relaxed) + (self.nodes - self.flushed)
    }

    pub(crate) fn flush_nodes(&mut self) {
        self.ctx
            .shared
            .nodes
            .fetch_add(self.nodes - self.flushed, Ordering::Relaxed);
        self.flushed = self.nodes;
    }

    /// Counts a node. Returns true when the search has to unwind.
    #[inline]
    fn visit(&mut self) -> bool {
        self.nodes += 1;
        if self.nodes & NODE_FLUSH_MASK == 0 {
            self.flush_nodes();
        }
        if self.nodes & TIME_CHECK_MASK == 0 {
            self.check_limits();
        }
        self.aborted()
    }

    /// Master only: notices a ponder hit and stops the search once the hard
    /// deadline or the node budget is reached.
    pub(crate) fn check_limits(&mut self) {
        let total = self.total_nodes();
        let signals = self.ctx.signals;
        let Some(master) = self.master.as_mut() else {
            return;
        };
        let now = Instant::now();
        if master.pondering {
            if signals.is_pondering() {
                return;
            }
            master.pondering = false;
            master.clock.ponder_hit(now);
            debug!("ponder hit, clock started");
        }
        let out_of_time = master
            .clock
            .hard_deadline()
            .is_some_and(|deadline| now >= deadline);
        let out_of_nodes = master.clock.node_limit().is_some_and(|limit| total >= limit);
        if out_of_time || out_of_nodes {
            debug!(out_of_time, out_of_nodes, nodes = total, "search limit reached");
            signals.stop();
        }
    }

    /// Principal variation search of a non-root node.
    ///
    /// Scores are from the side to move. An aborted search returns a
    /// meaningless value that callers discard.
    pub(crate) fn search(
        &mut self,
        position: &mut Position<'_>,
        mut alpha: i32,
        mut beta: i32,
        depth: i32,
        pv: &mut PvLine,
        pv_node: bool,
    ) -> i32 {
        pv.clear();
        if depth <= 0 {
            return self.quiescence(position, alpha, beta, 0);
        }
        if self.visit() {
            return DRAW;
        }

        let ply = position.ply();
        self.seldepth = self.seldepth.max(ply);
        if position.is_draw_in_tree() {
            return DRAW;
        }
        if ply as usize >= MAX_PLY - 1 {
            return self.ctx.evaluator.value(position);
        }

        // Mate distance pruning.
        alpha = alpha.max(mated_in(ply));
        beta = beta.min(mate_in(ply + 1));
        if alpha >= beta {
            return alpha;
        }

        let hash = position.hash();
        let mut hash_move = Move::NULL;
        if let Some(entry) = self.ctx.tt.probe(hash) {
            hash_move = entry.mv;
            let score = entry.score_at(ply);
            if !pv_node && entry.depth >= depth && entry.cuts_off(score, alpha, beta) {
                return score;
            }
        }

        let in_check = position.in_check();
        let depth = if in_check { depth + 1 } else { depth };
        let original_alpha = alpha;
        let killers = self.tables.killers(ply as usize);
        position.start_moves(hash_move, killers, GenerationKind::Main);

        let mut best_score = -INFINITE;
        let mut best_move = Move::NULL;
        let mut legal = 0;
        let mut quiets = MoveList::new();
        let mut child_pv = PvLine::new();

        while let Some(m) = position.next_move(&*self.tables) {
            let quiet = !position.is_tactical(m);
            let mut child = position.make_child();
            if !child.apply_move(m) {
                continue;
            }
            legal += 1;
            self.ctx.tt.prefetch(child.hash());

            let score = if legal == 1 {
                -self.search(&mut child, -beta, -alpha, depth - 1, &mut child_pv, pv_node)
            } else {
                let score =
                    -self.search(&mut child, -alpha - 1, -alpha, depth - 1, &mut child_pv, false);
                if pv_node && score > alpha && score < beta {
                    -self.search(&mut child, -beta, -alpha, depth - 1, &mut child_pv, true)
                } else {
                    score
                }
            };
            if self.aborted() {
                return DRAW;
            }
            if quiet {
                quiets.push(m);
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    best_move = m;
                    if score >= beta {
                        if quiet {
                            self.tables.update_quiet_cutoff(position, m, &quiets, depth);
                        }
                        self.ctx.tt.store(hash, score, depth, Bound::Lower, m, ply);
                        return score;
                    }
                    alpha = score;
                    pv.update(m, &child_pv);
                }
            }
        }

        if legal == 0 {
            return if in_check { mated_in(ply) } else { DRAW };
        }
        let bound = if best_score > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.ctx.tt.store(hash, best_score, depth, bound, best_move, ply);
        best_score
    }

    /// Captures (and at the first ply, quiet checks) until the position is
    /// quiet. All evasions are searched when in check.
    fn quiescence(
        &mut self,
        position: &mut Position<'_>,
        mut alpha: i32,
        beta: i32,
        qdepth: i32,
    ) -> i32 {
        if self.visit() {
            return DRAW;
        }

        let ply = position.ply();
        self.seldepth = self.seldepth.max(ply);
        if position.is_draw_in_tree() {
            return DRAW;
        }
        if ply as usize >= MAX_PLY - 1 || qdepth >= self.ctx.config.max_quiescence_depth {
            return self.ctx.evaluator.value(position);
        }

        let hash = position.hash();
        let mut hash_move = Move::NULL;
        if let Some(entry) = self.ctx.tt.probe(hash) {
            hash_move = entry.mv;
            let score = entry.score_at(ply);
            if entry.cuts_off(score, alpha, beta) {
                return score;
            }
        }

        let in_check = position.in_check();
        let original_alpha = alpha;
        let mut best_score = -INFINITE;
        if !in_check {
            let stand_pat = self.ctx.evaluator.value(position);
            if stand_pat >= beta {
                return stand_pat;
            }
            alpha = alpha.max(stand_pat);
            best_score = stand_pat;
        }

        let quiet_checks = self.ctx.config.quiet_checks && qdepth == 0;
        position.start_moves(
            hash_move,
            [Move::NULL; 2],
            GenerationKind::Quiescence { quiet_checks },
        );

        let mut best_move = Move::NULL;
        let mut legal = 0;
        while let Some(m) = position.next_move(&*self.tables) {
            let mut child = position.make_child();
            if !child.apply_move(m) {
                continue;
            }
            legal += 1;
            let score = -self.quiescence(&mut child, -beta, -alpha, qdepth + 1);
            if self.aborted() {
                return DRAW;
            }
            if score > best_score {
                best_score = score;
                if score > alpha {
                    best_move = m;
                    if score >= beta {
                        self.ctx
                            .tt
                            .store(hash, score, QUIESCENCE_DEPTH, Bound::Lower, m, ply);
                        return score;
                    }
                    alpha = score;
                }
            }
        }

        if in_check && legal == 0 {
            return mated_in(ply);
        }
        let bound = if best_score > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        self.ctx
            .tt
            .store(hash, best_score, QUIESCENCE_DEPTH, bound, best_move, ply);
        best_score
    }
}
