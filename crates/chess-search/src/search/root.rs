//! Iterative deepening, aspiration windows and multi-PV at the root.

use std::time::{Duration, Instant};

use chess_core::Move;
use chess_engine::Position;
use tracing::debug;

use super::pv::{extract_pv, line_to_uci, PvLine};
use super::thread::SearchThread;
use crate::info::InfoLine;
use crate::score::{is_mate_score, Score, INFINITE};

/// Aspiration windows are used from this depth on.
const ASPIRATION_MIN_DEPTH: u32 = 4;
/// `currmove` lines start after this much search time.
const CURRMOVE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RootMove {
    pub(crate) mv: Move,
    /// Score of the iteration in progress, `-INFINITE` until searched.
    pub(crate) score: i32,
    pub(crate) previous_score: i32,
    pub(crate) pv: Vec<Move>,
}

impl RootMove {
    pub(crate) fn new(mv: Move) -> Self {
        RootMove {
            mv,
            score: -INFINITE,
            previous_score: -INFINITE,
            pv: vec![mv],
        }
    }
}

/// Legal root moves, captures first by static exchange value.
pub(crate) fn root_moves(root: &Position<'_>) -> Vec<RootMove> {
    let mut moves: Vec<RootMove> = root.legal_moves().iter().map(|&m| RootMove::new(m)).collect();
    moves.sort_by_key(|rm| {
        if root.is_tactical(rm.mv) {
            -root.see(rm.mv)
        } else {
            INFINITE
        }
    });
    moves
}

/// Lines of the last fully searched depth.
#[derive(Debug, Clone)]
pub(crate) struct Completed {
    pub(crate) depth: u32,
    pub(crate) seldepth: u32,
    pub(crate) lines: Vec<RootMove>,
}

impl SearchThread<'_> {
    /// Deepens from `start_depth` until the limits say stop. Returns the
    /// last depth that finished; an interrupted depth is discarded.
    pub(crate) fn iterate(
        &mut self,
        root: &Position<'_>,
        start_depth: u32,
        max_depth: u32,
    ) -> Option<Completed> {
        let multi_pv = if self.is_master() {
            self.ctx.config.multi_pv.min(self.root_moves.len())
        } else {
            1
        };
        let mut completed: Option<Completed> = None;
        let mut reported_depth = 0;
        let mut depth = start_depth.clamp(1, max_depth.max(1));

        loop {
            for rm in &mut self.root_moves {
                rm.previous_score = rm.score;
                rm.score = -INFINITE;
            }
            for pv_index in 0..multi_pv {
                self.aspiration(root, depth, pv_index);
                if self.aborted() {
                    break;
                }
            }
            if self.aborted() {
                break;
            }

            let lines = self.root_moves[..multi_pv]
                .iter()
                .map(|rm| RootMove {
                    pv: extract_pv(root, &rm.pv, self.ctx.tt),
                    ..rm.clone()
                })
                .collect();
            let finished = Completed {
                depth,
                seldepth: self.seldepth,
                lines,
            };

            if !self.is_master() {
                completed = Some(finished);
                if depth >= max_depth {
                    break;
                }
                depth += 1;
                continue;
            }

            if self.start.elapsed() >= self.ctx.config.info_interval() {
                self.report(root, &finished);
                reported_depth = depth;
            }
            let best = finished.lines[0].mv;
            completed = Some(finished);
            self.check_limits();
            if self.aborted() || !self.keep_iterating(depth, best) {
                break;
            }
            depth += 1;
        }

        if let Some(finished) = &completed {
            if self.is_master() && finished.depth != reported_depth {
                self.report(root, finished);
            }
        }
        completed
    }

    fn keep_iterating(&self, depth: u32, best: Move) -> bool {
        let nodes = self.total_nodes();
        match &self.master {
            Some(master) => {
                master
                    .clock
                    .continue_search(depth, best, nodes, Instant::now(), master.pondering)
            }
            None => true,
        }
    }

    /// Searches one root line, widening the window until the score fits.
    fn aspiration(&mut self, root: &Position<'_>, depth: u32, pv_index: usize) {
        let config = self.ctx.config;
        let previous = self.root_moves[pv_index].previous_score;
        let mut delta = config.aspiration_window;
        let (mut alpha, mut beta) = if depth >= ASPIRATION_MIN_DEPTH
            && previous > -INFINITE
            && !is_mate_score(previous)
        {
            ((previous - delta).max(-INFINITE), (previous + delta).min(INFINITE))
        } else {
            (-INFINITE, INFINITE)
        };
        let mut failures = 0;

        loop {
            let score = self.search_root(root, depth, alpha, beta, pv_index);
            if self.aborted() {
                return;
            }
            self.root_moves[pv_index..].sort_by(|a, b| b.score.cmp(&a.score));

            if score <= alpha && alpha > -INFINITE {
                alpha = (score - delta).max(-INFINITE);
            } else if score >= beta && beta < INFINITE {
                beta = (score + delta).min(INFINITE);
            } else {
                return;
            }
            failures += 1;
            delta = delta.saturating_mul(2).saturating_add(1);
            if failures >= config.aspiration_max_failures || is_mate_score(score) {
                alpha = -INFINITE;
                beta = INFINITE;
            }
            debug!(depth, failures, alpha, beta, "aspiration re-search");
        }
    }

    /// Searches the root moves from `pv_index` on. Earlier lines of a
    /// multi-PV search are excluded.
    fn search_root(
        &mut self,
        root: &Position<'_>,
        depth: u32,
        mut alpha: i32,
        beta: i32,
        pv_index: usize,
    ) -> i32 {
        let remaining = depth as i32 - 1;
        let mut best_score = -INFINITE;
        let mut child_pv = PvLine::new();
        self.nodes += 1;

        for i in pv_index..self.root_moves.len() {
            let m = self.root_moves[i].mv;
            if let Some(master) = &self.master {
                if self.start.elapsed() >= CURRMOVE_DELAY {
                    master.sink.current_move(depth, &root.move_to_uci(m), i + 1);
                }
            }
            let mut child = root.make_child();
            if !child.apply_move(m) {
                continue;
            }
            self.ctx.tt.prefetch(child.hash());

            let score = if i == pv_index {
                -self.search(&mut child, -beta, -alpha, remaining, &mut child_pv, true)
            } else {
                let score =
                    -self.search(&mut child, -alpha - 1, -alpha, remaining, &mut child_pv, false);
                if score > alpha && score < beta {
                    -self.search(&mut child, -beta, -alpha, remaining, &mut child_pv, true)
                } else {
                    score
                }
            };
            if self.aborted() {
                return best_score;
            }

            let rm = &mut self.root_moves[i];
            rm.score = score;
            if score > best_score {
                best_score = score;
                if score > alpha {
                    rm.pv.clear();
                    rm.pv.push(m);
                    rm.pv.extend_from_slice(child_pv.as_slice());
                    if score >= beta {
                        return score;
                    }
                    alpha = score;
                }
            }
        }
        best_score
    }

    /// One `info` line per searched line of `finished`.
    fn report(&self, root: &Position<'_>, finished: &Completed) {
        let Some(master) = &self.master else {
            return;
        };
        let elapsed = self.start.elapsed();
        let nodes = self.total_nodes();
        let time_ms = elapsed.as_millis() as u64;
        let nps = nodes * 1000 / time_ms.max(1);
        let hashfull = self.ctx.tt.hashfull();
        let multi_pv = finished.lines.len() > 1;

        for (index, line) in finished.lines.iter().enumerate() {
            master.sink.info(&InfoLine {
                depth: finished.depth,
                seldepth: finished.seldepth,
                multipv: multi_pv.then_some(index + 1),
                score: Some(Score::from_value(line.score)),
                nodes,
                nps,
                time_ms,
                hashfull: Some(hashfull),
                pv: line_to_uci(root, &line.pv),
            });
        }
    }
}
