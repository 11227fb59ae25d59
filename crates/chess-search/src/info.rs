//! Search progress lines in UCI `info` form.
//!
//! These are protocol output, not logs: an [`InfoSink`] decides where they
//! go. [`StdoutSink`] writes whole lines behind one process-wide lock so
//! that output from several threads never interleaves.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::score::Score;

/// One progress report of the search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfoLine {
    /// Search depth in plies.
    pub depth: u32,
    /// Selective search depth.
    pub seldepth: u32,
    /// 1-based index of the line when several are searched.
    pub multipv: Option<usize>,
    pub score: Option<Score>,
    /// Nodes searched.
    pub nodes: u64,
    /// Nodes per second.
    pub nps: u64,
    /// Time spent in milliseconds.
    pub time_ms: u64,
    /// Hash table usage (per mille).
    pub hashfull: Option<u32>,
    /// Principal variation (best line found).
    pub pv: Vec<String>,
}

impl InfoLine {
    /// Format as UCI info string.
    pub fn to_uci(&self) -> String {
        let mut parts = vec!["info".to_string()];

        parts.push(format!("depth {}", self.depth));
        if self.seldepth > 0 {
            parts.push(format!("seldepth {}", self.seldepth));
        }
        if let Some(index) = self.multipv {
            parts.push(format!("multipv {}", index));
        }
        if let Some(score) = self.score {
            parts.push(format!("score {}", score));
        }
        parts.push(format!("nodes {}", self.nodes));
        parts.push(format!("nps {}", self.nps));
        parts.push(format!("time {}", self.time_ms));
        if let Some(h) = self.hashfull {
            parts.push(format!("hashfull {}", h));
        }
        if !self.pv.is_empty() {
            parts.push(format!("pv {}", self.pv.join(" ")));
        }

        parts.join(" ")
    }
}

pub fn currmove_line(depth: u32, mv: &str, number: usize) -> String {
    format!("info depth {} currmove {} currmovenumber {}", depth, mv, number)
}

pub fn bestmove_line(best: &str, ponder: Option<&str>) -> String {
    match ponder {
        Some(ponder) => format!("bestmove {} ponder {}", best, ponder),
        None => format!("bestmove {}", best),
    }
}

/// Receiver of search output. Only the master search thread reports.
pub trait InfoSink: Send + Sync {
    fn info(&self, line: &InfoLine);

    fn current_move(&self, _depth: u32, _mv: &str, _number: usize) {}

    fn best_move(&self, best: &str, ponder: Option<&str>);
}

static OUTPUT: Mutex<()> = Mutex::new(());

/// Writes one line to stdout while holding the global output lock.
pub fn write_line(line: &str) {
    let _guard = OUTPUT.lock().unwrap_or_else(PoisonError::into_inner);
    let mut out = io::stdout().lock();
    if let Err(err) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
        warn!(%err, "failed to write search output");
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink {
    /// Also print `currmove` lines.
    pub current_moves: bool,
}

impl InfoSink for StdoutSink {
    fn info(&self, line: &InfoLine) {
        write_line(&line.to_uci());
    }

    fn current_move(&self, depth: u32, mv: &str, number: usize) {
        if self.current_moves {
            write_line(&currmove_line(depth, mv, number));
        }
    }

    fn best_move(&self, best: &str, ponder: Option<&str>) {
        write_line(&bestmove_line(best, ponder));
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl InfoSink for NullSink {
    fn info(&self, _line: &InfoLine) {}

    fn best_move(&self, _best: &str, _ponder: Option<&str>) {}
}

/// Keeps every line, for tests and tools.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, line: String) {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).push(line);
    }
}

impl InfoSink for CollectingSink {
    fn info(&self, line: &InfoLine) {
        self.push(line.to_uci());
    }

    fn current_move(&self, depth: u32, mv: &str, number: usize) {
        self.push(currmove_line(depth, mv, number));
    }

    fn best_move(&self, best: &str, ponder: Option<&str>) {
        self.push(bestmove_line(best, ponder));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_to_uci() {
        let info = InfoLine {
            depth: 10,
            seldepth: 14,
            score: Some(Score::Cp(35)),
            nodes: 50000,
            nps: 250000,
            time_ms: 200,
            hashfull: Some(12),
            pv: vec!["e2e4".to_string(), "e7e5".to_string()],
            ..Default::default()
        };

        assert_eq!(
            info.to_uci(),
            "info depth 10 seldepth 14 score cp 35 nodes 50000 nps 250000 time 200 hashfull 12 pv e2e4 e7e5"
        );
    }

    #[test]
    fn multipv_and_mate() {
        let info = InfoLine {
            depth: 3,
            multipv: Some(2),
            score: Some(Score::Mate(-2)),
            ..Default::default()
        };
        let uci = info.to_uci();
        assert!(uci.contains("multipv 2"));
        assert!(uci.contains("score mate -2"));
        assert!(!uci.contains("pv e"));
    }

    #[test]
    fn bestmove_formatting() {
        assert_eq!(bestmove_line("e2e4", None), "bestmove e2e4");
        assert_eq!(bestmove_line("e2e4", Some("e7e5")), "bestmove e2e4 ponder e7e5");
    }

    #[test]
    fn collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        sink.current_move(1, "e2e4", 1);
        sink.info(&InfoLine {
            depth: 1,
            ..Default::default()
        });
        sink.best_move("e2e4", None);
        let lines = sink.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "info depth 1 currmove e2e4 currmovenumber 1");
        assert!(lines[1].starts_with("info depth 1 nodes 0"));
        assert_eq!(lines[2], "bestmove e2e4");
    }
}
