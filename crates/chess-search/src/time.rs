//! Search limits and time management.

use std::time::{Duration, Instant};

use chess_core::{Color, Move};
use chess_engine::MAX_PLY;

/// What bounds one search, as given by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchLimits {
    /// Search to this depth.
    pub depth: Option<u32>,
    /// Stop after about this many nodes.
    pub nodes: Option<u64>,
    /// Search for exactly this time in milliseconds.
    pub movetime: Option<u64>,
    /// White time remaining in milliseconds.
    pub wtime: Option<u64>,
    /// Black time remaining in milliseconds.
    pub btime: Option<u64>,
    /// White increment per move in milliseconds.
    pub winc: Option<u64>,
    /// Black increment per move in milliseconds.
    pub binc: Option<u64>,
    /// Moves to go until next time control.
    pub movestogo: Option<u32>,
    /// Search until stopped.
    pub infinite: bool,
    /// Search on the opponent's time until a ponder hit or stop.
    pub ponder: bool,
}

impl SearchLimits {
    pub fn depth(depth: u32) -> Self {
        SearchLimits {
            depth: Some(depth),
            ..Default::default()
        }
    }

    pub fn movetime(ms: u64) -> Self {
        SearchLimits {
            movetime: Some(ms),
            ..Default::default()
        }
    }

    pub fn nodes(nodes: u64) -> Self {
        SearchLimits {
            nodes: Some(nodes),
            ..Default::default()
        }
    }

    pub fn infinite() -> Self {
        SearchLimits {
            infinite: true,
            ..Default::default()
        }
    }

    fn clock(&self, side: Color) -> (Option<u64>, u64) {
        match side {
            Color::White => (self.wtime, self.winc.unwrap_or(0)),
            Color::Black => (self.btime, self.binc.unwrap_or(0)),
        }
    }
}

/// Decides how deep and how long the search runs.
pub trait TimeManager: Send {
    fn max_depth(&self) -> u32;

    /// Whether to start another iteration after finishing `depth`.
    fn continue_search(
        &self,
        depth: u32,
        best: Move,
        nodes: u64,
        now: Instant,
        pondering: bool,
    ) -> bool;

    fn start_time(&self) -> Instant;

    fn soft_deadline(&self) -> Option<Instant>;

    /// Past this instant the search is aborted mid-iteration.
    fn hard_deadline(&self) -> Option<Instant>;

    /// Node budget, if any.
    fn node_limit(&self) -> Option<u64> {
        None
    }

    /// The opponent played the expected move; the clock starts now.
    fn ponder_hit(&mut self, now: Instant);
}

/// Moves assumed left when the clock gives no `movestogo`.
const DEFAULT_MOVES_TO_GO: u64 = 30;
/// Hard budget as a multiple of the soft one.
const HARD_FACTOR: u32 = 5;

#[derive(Debug, Clone)]
pub struct StandardTimeManager {
    start: Instant,
    max_depth: u32,
    nodes: Option<u64>,
    soft: Option<Duration>,
    hard: Option<Duration>,
    /// Infinite searches never stop on time.
    unbounded: bool,
}

impl StandardTimeManager {
    pub fn new(
        limits: &SearchLimits,
        side: Color,
        move_overhead: Duration,
        emergency: Duration,
        start: Instant,
    ) -> Self {
        let max_depth = limits
            .depth
            .map_or(MAX_PLY as u32 - 1, |d| d.clamp(1, MAX_PLY as u32 - 1));
        let (soft, hard) = if limits.infinite {
            (None, None)
        } else if let Some(ms) = limits.movetime {
            let budget = Duration::from_millis(ms)
                .saturating_sub(move_overhead)
                .max(Duration::from_millis(1));
            (Some(budget), Some(budget))
        } else if let (Some(remaining), increment) = limits.clock(side) {
            let remaining = Duration::from_millis(remaining).saturating_sub(move_overhead);
            let increment = Duration::from_millis(increment);
            let moves_to_go = limits
                .movestogo
                .map_or(DEFAULT_MOVES_TO_GO, |m| u64::from(m.max(1)));
            let hard = (remaining.saturating_sub(emergency)).max(Duration::from_millis(1));
            let soft = (remaining / moves_to_go as u32 + increment * 3 / 4).min(hard);
            (Some(soft), Some((soft * HARD_FACTOR).min(hard)))
        } else {
            (None, None)
        };

        StandardTimeManager {
            start,
            max_depth,
            nodes: limits.nodes,
            soft,
            hard,
            unbounded: limits.infinite,
        }
    }

    pub fn soft_budget(&self) -> Option<Duration> {
        self.soft
    }

    pub fn hard_budget(&self) -> Option<Duration> {
        self.hard
    }
}

impl TimeManager for StandardTimeManager {
    fn max_depth(&self) -> u32 {
        self.max_depth
    }

    fn continue_search(
        &self,
        depth: u32,
        best: Move,
        nodes: u64,
        now: Instant,
        pondering: bool,
    ) -> bool {
        if depth >= self.max_depth {
            return false;
        }
        if self.nodes.is_some_and(|limit| nodes >= limit) {
            return false;
        }
        if best.is_null() || pondering || self.unbounded {
            return true;
        }
        match self.soft {
            // The next iteration takes about twice as long as all before it.
            Some(soft) => now.saturating_duration_since(self.start) * 3 <= soft,
            None => true,
        }
    }

    fn start_time(&self) -> Instant {
        self.start
    }

    fn soft_deadline(&self) -> Option<Instant> {
        self.soft.map(|d| self.start + d)
    }

    fn hard_deadline(&self) -> Option<Instant> {
        self.hard.map(|d| self.start + d)
    }

    fn node_limit(&self) -> Option<u64> {
        self.nodes
    }

    fn ponder_hit(&mut self, now: Instant) {
        self.start = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::Square;

    const OVERHEAD: Duration = Duration::from_millis(30);
    const EMERGENCY: Duration = Duration::from_millis(100);

    fn manager(limits: &SearchLimits, side: Color) -> StandardTimeManager {
        StandardTimeManager::new(limits, side, OVERHEAD, EMERGENCY, Instant::now())
    }

    fn some_move() -> Move {
        Move::normal(Square::A1, Square::A8)
    }

    #[test]
    fn fixed_move_time() {
        let tm = manager(&SearchLimits::movetime(1000), Color::White);
        assert_eq!(tm.soft_budget(), Some(Duration::from_millis(970)));
        assert_eq!(tm.hard_budget(), Some(Duration::from_millis(970)));
        assert_eq!(tm.hard_deadline(), tm.soft_deadline());
    }

    #[test]
    fn clock_budget() {
        let limits = SearchLimits {
            wtime: Some(60_030),
            winc: Some(1000),
            btime: Some(1000),
            ..Default::default()
        };
        let tm = manager(&limits, Color::White);
        // 60000 / 30 + 750.
        assert_eq!(tm.soft_budget(), Some(Duration::from_millis(2750)));
        assert_eq!(tm.hard_budget(), Some(Duration::from_millis(13_750)));

        let tm = manager(&limits, Color::Black);
        let soft = tm.soft_budget().unwrap();
        let hard = tm.hard_budget().unwrap();
        assert!(hard <= Duration::from_millis(870));
        assert!(soft <= hard);
    }

    #[test]
    fn moves_to_go() {
        let limits = SearchLimits {
            btime: Some(10_030),
            movestogo: Some(10),
            ..Default::default()
        };
        let tm = manager(&limits, Color::Black);
        assert_eq!(tm.soft_budget(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn depth_and_node_limits_stop_iterating() {
        let tm = manager(&SearchLimits::depth(4), Color::White);
        let now = Instant::now();
        assert_eq!(tm.max_depth(), 4);
        assert!(tm.continue_search(3, some_move(), 0, now, false));
        assert!(!tm.continue_search(4, some_move(), 0, now, false));

        let tm = manager(&SearchLimits::nodes(500), Color::White);
        assert!(tm.continue_search(3, some_move(), 499, now, false));
        assert!(!tm.continue_search(3, some_move(), 500, now, false));
    }

    #[test]
    fn no_new_iteration_after_a_third_of_the_budget() {
        let start = Instant::now();
        let tm = StandardTimeManager::new(&SearchLimits::movetime(330), Color::White, OVERHEAD, EMERGENCY, start);
        assert!(tm.continue_search(5, some_move(), 0, start + Duration::from_millis(90), false));
        assert!(!tm.continue_search(5, some_move(), 0, start + Duration::from_millis(120), false));
        // Pondering ignores the clock.
        assert!(tm.continue_search(5, some_move(), 0, start + Duration::from_millis(120), true));
    }

    #[test]
    fn ponder_hit_restarts_the_clock() {
        let start = Instant::now();
        let mut tm = StandardTimeManager::new(&SearchLimits::movetime(100), Color::White, OVERHEAD, EMERGENCY, start);
        let later = start + Duration::from_secs(5);
        tm.ponder_hit(later);
        assert_eq!(tm.start_time(), later);
        assert_eq!(tm.hard_deadline(), Some(later + Duration::from_millis(70)));
    }

    #[test]
    fn infinite_has_no_deadline() {
        let tm = manager(&SearchLimits::infinite(), Color::White);
        assert!(tm.hard_deadline().is_none());
        let far = Instant::now() + Duration::from_secs(3600);
        assert!(tm.continue_search(10, some_move(), 1 << 40, far, false));
    }
}
