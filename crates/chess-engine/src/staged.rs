//! Staged move generation.
//!
//! A node rarely looks at all of its moves: a cutoff on the hash move or the
//! first good capture ends the loop. Moves are therefore produced in phases,
//! each generated and scored only when reached and handed out best first by
//! repeated max-extraction.
//!
//! Normal nodes: hash move, killers, winning captures, equal captures, quiets
//! with a non-negative history score, the other quiets, losing captures,
//! underpromotions. In check: hash move, then all evasions. Quiescence: hash
//! move, captures that do not lose material, optionally quiet checks.

use std::cmp::Ordering;

use crate::ordering::HistoryTables;
use crate::{MoveList, Position};
use chess_core::{Move, Piece};

/// A move with an ordering or search score. Equality looks at the move only.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValuatedMove {
    pub mv: Move,
    pub score: i32,
}

impl ValuatedMove {
    #[inline]
    pub const fn new(mv: Move, score: i32) -> Self {
        ValuatedMove { mv, score }
    }

    /// Comparator that puts higher scores first.
    #[inline]
    pub fn by_score_descending(a: &ValuatedMove, b: &ValuatedMove) -> Ordering {
        b.score.cmp(&a.score)
    }
}

impl PartialEq for ValuatedMove {
    fn eq(&self, other: &Self) -> bool {
        self.mv == other.mv
    }
}

impl Eq for ValuatedMove {}

/// Which phase sequence to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationKind {
    #[default]
    Main,
    Quiescence {
        quiet_checks: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Stage {
    HashMove,
    Killers,
    WinningCaptures,
    EqualCaptures,
    QuietsPositive,
    QuietsNegative,
    LosingCaptures,
    Underpromotions,
    Evasions,
    QuiescenceCaptures,
    QuietChecks,
    #[default]
    Done,
}

/// Offset lifting tactical evasions above every quiet history score.
const TACTICAL_EVASION: i32 = 1 << 24;

/// Cursor state of the staged generator. Lives inside its [`Position`].
#[derive(Clone)]
pub struct MoveStager {
    stage: Stage,
    kind: GenerationKind,
    hash_move: Move,
    /// Killers actually handed out, NULL otherwise.
    killers: [Move; 2],
    killer_index: usize,
    moves: [ValuatedMove; MoveList::MAX_MOVES],
    cursor: usize,
    end: usize,
    winning_end: usize,
    equal_end: usize,
    captures_end: usize,
    quiets_end: usize,
}

impl Default for MoveStager {
    fn default() -> Self {
        MoveStager {
            stage: Stage::Done,
            kind: GenerationKind::Main,
            hash_move: Move::NULL,
            killers: [Move::NULL; 2],
            killer_index: 0,
            moves: [ValuatedMove::default(); MoveList::MAX_MOVES],
            cursor: 0,
            end: 0,
            winning_end: 0,
            equal_end: 0,
            captures_end: 0,
            quiets_end: 0,
        }
    }
}

impl MoveStager {
    #[inline]
    fn already_returned(&self, m: Move) -> bool {
        m == self.hash_move || m == self.killers[0] || m == self.killers[1]
    }

    /// Hands out the best remaining move of `[cursor, end)`.
    fn select_best(&mut self) -> Option<Move> {
        while self.cursor < self.end {
            let mut best = self.cursor;
            for i in self.cursor + 1..self.end {
                if self.moves[i].score > self.moves[best].score {
                    best = i;
                }
            }
            self.moves.swap(self.cursor, best);
            let m = self.moves[self.cursor].mv;
            self.cursor += 1;
            if !self.already_returned(m) {
                return Some(m);
            }
        }
        None
    }

    /// Hands out `[cursor, end)` in stored order.
    fn select_next(&mut self) -> Option<Move> {
        while self.cursor < self.end {
            let m = self.moves[self.cursor].mv;
            self.cursor += 1;
            if !self.already_returned(m) {
                return Some(m);
            }
        }
        None
    }

    fn enter(&mut self, stage: Stage, start: usize, end: usize) {
        self.stage = stage;
        self.cursor = start;
        self.end = end;
    }

    /// Moves `[start, end)` matching `first` to the front; returns the split.
    fn partition(&mut self, start: usize, end: usize, first: impl Fn(&ValuatedMove) -> bool) -> usize {
        let mut split = start;
        for i in start..end {
            if first(&self.moves[i]) {
                self.moves.swap(split, i);
                split += 1;
            }
        }
        split
    }

    fn insertion_sort(&mut self, start: usize, end: usize) {
        for i in start + 1..end {
            let item = self.moves[i];
            let mut j = i;
            while j > start && self.moves[j - 1].score < item.score {
                self.moves[j] = self.moves[j - 1];
                j -= 1;
            }
            self.moves[j] = item;
        }
    }
}

impl Position<'_> {
    /// Resets the staged generator for a new pass over this position's moves.
    pub fn start_moves(&mut self, hash_move: Move, killers: [Move; 2], kind: GenerationKind) {
        let stager = &mut self.stager;
        stager.stage = Stage::HashMove;
        stager.kind = kind;
        stager.hash_move = hash_move;
        stager.killers = killers;
        stager.killer_index = 0;
        stager.cursor = 0;
        stager.end = 0;
    }

    /// Next pseudo-legal move, or `None` once every phase is exhausted.
    pub fn next_move(&mut self, tables: &HistoryTables) -> Option<Move> {
        loop {
            match self.stager.stage {
                Stage::HashMove => {
                    let hash_move = self.stager.hash_move;
                    let fits = self.hash_move_fits(hash_move);
                    if !fits {
                        self.stager.hash_move = Move::NULL;
                    }
                    self.after_hash_move();
                    if fits {
                        return Some(hash_move);
                    }
                }
                Stage::Killers => {
                    while self.stager.killer_index < 2 {
                        let index = self.stager.killer_index;
                        self.stager.killer_index += 1;
                        let killer = self.stager.killers[index];
                        let duplicate = index == 1 && killer == self.stager.killers[0];
                        if !duplicate
                            && killer != self.stager.hash_move
                            && self.is_pseudo_legal(killer)
                            && !self.is_tactical(killer)
                        {
                            return Some(killer);
                        }
                        self.stager.killers[index] = Move::NULL;
                    }
                    self.prepare_captures();
                    self.stager.enter(Stage::WinningCaptures, 0, self.stager.winning_end);
                }
                Stage::WinningCaptures => {
                    if let Some(m) = self.stager.select_best() {
                        return Some(m);
                    }
                    let (start, end) = (self.stager.winning_end, self.stager.equal_end);
                    self.stager.enter(Stage::EqualCaptures, start, end);
                }
                Stage::EqualCaptures => {
                    if let Some(m) = self.stager.select_best() {
                        return Some(m);
                    }
                    let positive_end = self.prepare_quiets(tables);
                    let start = self.stager.captures_end;
                    self.stager.enter(Stage::QuietsPositive, start, positive_end);
                }
                Stage::QuietsPositive => {
                    if let Some(m) = self.stager.select_best() {
                        return Some(m);
                    }
                    let end = self.stager.quiets_end;
                    self.stager.stage = Stage::QuietsNegative;
                    self.stager.end = end;
                }
                Stage::QuietsNegative => {
                    if let Some(m) = self.stager.select_best() {
                        return Some(m);
                    }
                    let (start, end) = (self.stager.equal_end, self.stager.captures_end);
                    self.stager.enter(Stage::LosingCaptures, start, end);
                }
                Stage::LosingCaptures => {
                    if let Some(m) = self.stager.select_best() {
                        return Some(m);
                    }
                    let end = self.prepare_underpromotions();
                    let start = self.stager.quiets_end;
                    self.stager.enter(Stage::Underpromotions, start, end);
                }
                Stage::Underpromotions => {
                    if let Some(m) = self.stager.select_next() {
                        return Some(m);
                    }
                    self.stager.stage = Stage::Done;
                }
                Stage::Evasions => {
                    if let Some(m) = self.stager.select_next() {
                        return Some(m);
                    }
                    self.stager.stage = Stage::Done;
                }
                Stage::QuiescenceCaptures => {
                    if let Some(m) = self.stager.select_best() {
                        return Some(m);
                    }
                    match self.stager.kind {
                        GenerationKind::Quiescence { quiet_checks: true } => {
                            let end = self.prepare_quiet_checks();
                            let start = self.stager.captures_end;
                            self.stager.enter(Stage::QuietChecks, start, end);
                        }
                        _ => self.stager.stage = Stage::Done,
                    }
                }
                Stage::QuietChecks => {
                    if let Some(m) = self.stager.select_next() {
                        return Some(m);
                    }
                    self.stager.stage = Stage::Done;
                }
                Stage::Done => return None,
            }
        }
    }

    fn hash_move_fits(&self, m: Move) -> bool {
        if !self.is_pseudo_legal(m) {
            return false;
        }
        match self.stager.kind {
            GenerationKind::Quiescence { .. } if !self.in_check() => {
                self.is_tactical(m) && !m.flag().is_underpromotion()
            }
            _ => true,
        }
    }

    fn after_hash_move(&mut self) {
        if self.stager.kind != GenerationKind::Main || self.in_check() {
            self.stager.killers = [Move::NULL; 2];
        }
        if self.in_check() {
            let end = self.prepare_evasions();
            self.stager.enter(Stage::Evasions, 0, end);
            return;
        }
        match self.stager.kind {
            GenerationKind::Main => self.stager.stage = Stage::Killers,
            GenerationKind::Quiescence { .. } => {
                let end = self.prepare_quiescence_captures();
                self.stager.enter(Stage::QuiescenceCaptures, 0, end);
            }
        }
    }

    /// Most valuable victim, least valuable attacker, in piece indices.
    pub fn mvv_lva(&self, m: Move) -> i32 {
        let victim = self.captured_by(m).map_or(0, |p| p.index() as i32 * 10);
        let attacker = self.moved_piece(m).map_or(0, |(p, _)| p.index() as i32);
        let promotion = m
            .flag()
            .promotion_piece()
            .map_or(0, |p| p.index() as i32 * 10);
        victim + promotion - attacker
    }

    /// Generates and scores captures into `[0, captures_end)`, split into
    /// winning, equal and losing by exchange value.
    fn prepare_captures(&mut self) {
        let mut list = MoveList::new();
        self.generate_captures(&mut list);
        let count = list.len();

        if count == 1 {
            let m = list[0];
            let score = self.mvv_lva(m);
            self.stager.moves[0] = ValuatedMove::new(m, score);
            self.stager.winning_end = 1;
            self.stager.equal_end = 1;
            self.stager.captures_end = 1;
            return;
        }

        let mut exchange = [0i32; MoveList::MAX_MOVES];
        for i in 0..count {
            let m = list[i];
            let see = self.see_sign(m);
            exchange[i] = see;
            let score = see * 64 + self.mvv_lva(m);
            self.stager.moves[i] = ValuatedMove::new(m, score);
        }

        // Group by sign, keeping `exchange` aligned with the moves.
        let mut sizes = [0usize; 3];
        for &see in &exchange[..count] {
            sizes[sign_class(see)] += 1;
        }
        let winning_end = sizes[0];
        let equal_end = winning_end + sizes[1];
        let mut slots = [0, winning_end, equal_end];
        let mut sorted = [ValuatedMove::default(); MoveList::MAX_MOVES];
        for i in 0..count {
            let class = sign_class(exchange[i]);
            sorted[slots[class]] = self.stager.moves[i];
            slots[class] += 1;
        }
        self.stager.moves[..count].copy_from_slice(&sorted[..count]);
        self.stager.winning_end = winning_end;
        self.stager.equal_end = equal_end;
        self.stager.captures_end = count;
    }

    /// Quiets into `[captures_end, quiets_end)`, non-negative scores first.
    /// Returns the end of the non-negative part.
    fn prepare_quiets(&mut self, tables: &HistoryTables) -> usize {
        let mut list = MoveList::new();
        self.generate_quiets(&mut list);
        let start = self.stager.captures_end;
        for i in 0..list.len() {
            let m = list[i];
            let score = tables.quiet_score(self, m);
            self.stager.moves[start + i] = ValuatedMove::new(m, score);
        }
        let end = start + list.len();
        self.stager.quiets_end = end;
        self.stager.partition(start, end, |vm| vm.score >= 0)
    }

    fn prepare_underpromotions(&mut self) -> usize {
        let mut list = MoveList::new();
        self.generate_underpromotions(&mut list);
        let start = self.stager.quiets_end;
        for i in 0..list.len() {
            self.stager.moves[start + i] = ValuatedMove::new(list[i], 0);
        }
        start + list.len()
    }

    /// Evasions into `[0, end)`: tacticals first, each group sorted.
    fn prepare_evasions(&mut self) -> usize {
        let mut list = MoveList::new();
        self.generate_evasions(&mut list);
        for i in 0..list.len() {
            let m = list[i];
            let score = if self.is_tactical(m) {
                TACTICAL_EVASION + self.mvv_lva(m)
            } else {
                self.evasion_quiet_score(m)
            };
            self.stager.moves[i] = ValuatedMove::new(m, score);
        }
        let end = list.len();
        let split = self.stager.partition(0, end, |vm| vm.score >= TACTICAL_EVASION);
        self.stager.insertion_sort(0, split);
        self.stager.insertion_sort(split, end);
        end
    }

    /// King steps last, otherwise cheaper blockers first.
    fn evasion_quiet_score(&self, m: Move) -> i32 {
        match self.moved_piece(m) {
            Some((Piece::King, _)) => -1000,
            Some((piece, _)) => -(piece.index() as i32),
            None => 0,
        }
    }

    /// Captures that do not lose material, into `[0, captures_end)`. A lone
    /// capture is kept without an exchange test, as in the main stage.
    fn prepare_quiescence_captures(&mut self) -> usize {
        let mut list = MoveList::new();
        self.generate_captures(&mut list);
        if list.len() == 1 {
            let m = list[0];
            self.stager.moves[0] = ValuatedMove::new(m, self.mvv_lva(m));
            self.stager.captures_end = 1;
            return 1;
        }
        let mut kept = 0;
        for i in 0..list.len() {
            let m = list[i];
            let see = self.see_sign(m);
            if see >= 0 {
                let score = see * 64 + self.mvv_lva(m);
                self.stager.moves[kept] = ValuatedMove::new(m, score);
                kept += 1;
            }
        }
        self.stager.captures_end = kept;
        kept
    }

    fn prepare_quiet_checks(&mut self) -> usize {
        let mut list = MoveList::new();
        self.generate_quiet_checks(&mut list);
        let start = self.stager.captures_end;
        for i in 0..list.len() {
            self.stager.moves[start + i] = ValuatedMove::new(list[i], 0);
        }
        start + list.len()
    }
}

/// 0 for winning, 1 for equal, 2 for losing.
#[inline]
fn sign_class(see: i32) -> usize {
    match see.cmp(&0) {
        Ordering::Greater => 0,
        Ordering::Equal => 1,
        Ordering::Less => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::{MoveFlag, Square};
    use proptest::prelude::*;

    const TACTICS: &str = "6k1/1p6/p7/3p4/Q2rn3/2N2N2/8/4K3 w - - 0 1";

    fn sq(s: &str) -> Square {
        Square::from_algebraic(s).unwrap()
    }

    fn drain(position: &mut Position<'_>, tables: &HistoryTables) -> Vec<Move> {
        let mut out = Vec::new();
        while let Some(m) = position.next_move(tables) {
            out.push(m);
        }
        out
    }

    fn sorted_uci(moves: &[Move]) -> Vec<String> {
        let mut out: Vec<String> = moves.iter().map(|m| m.to_uci()).collect();
        out.sort();
        out
    }

    #[test]
    fn valuated_move_equality_ignores_score() {
        let m = Move::normal(Square::A1, Square::A8);
        assert_eq!(ValuatedMove::new(m, 1), ValuatedMove::new(m, 99));
        let mut list = vec![ValuatedMove::new(m, 1), ValuatedMove::new(Move::NULL, 5)];
        list.sort_by(ValuatedMove::by_score_descending);
        assert_eq!(list[0].score, 5);
    }

    #[test]
    fn startpos_yields_every_move_once() {
        let tables = HistoryTables::new();
        let mut position = Position::startpos();
        position.start_moves(Move::NULL, [Move::NULL; 2], GenerationKind::Main);
        let moves = drain(&mut position, &tables);
        assert_eq!(moves.len(), 20);
        assert_eq!(sorted_uci(&moves), sorted_uci(position.legal_moves().as_slice()));
        assert_eq!(position.next_move(&tables), None);
    }

    #[test]
    fn hash_move_and_killers_come_first_and_only_once() {
        let tables = HistoryTables::new();
        let mut position = Position::startpos();
        let hash = Move::new(sq("e2"), sq("e4"), MoveFlag::DoublePush);
        let killer = Move::normal(Square::G1, sq("f3"));
        let stale = Move::normal(sq("e4"), sq("e5"));
        position.start_moves(hash, [killer, stale], GenerationKind::Main);
        let moves = drain(&mut position, &tables);
        assert_eq!(moves[0], hash);
        assert_eq!(moves[1], killer);
        assert_eq!(moves.len(), 20);
        assert_eq!(moves.iter().filter(|&&m| m == hash).count(), 1);
        assert_eq!(moves.iter().filter(|&&m| m == killer).count(), 1);
    }

    #[test]
    fn illegal_hash_move_is_skipped() {
        let tables = HistoryTables::new();
        let mut position = Position::startpos();
        position.start_moves(
            Move::normal(sq("e7"), sq("e5")),
            [Move::NULL; 2],
            GenerationKind::Main,
        );
        assert_eq!(drain(&mut position, &tables).len(), 20);
    }

    #[test]
    fn captures_ordered_winning_equal_quiet_losing() {
        let tables = HistoryTables::new();
        // Nxd4 and Qxd4 win the rook, Nxe4 trades knights, Nxd5 and Qxa6 lose.
        let mut position = Position::from_fen(TACTICS).unwrap();
        position.start_moves(Move::NULL, [Move::NULL; 2], GenerationKind::Main);
        let moves = drain(&mut position, &tables);
        let first_quiet = moves
            .iter()
            .position(|&m| !position.is_tactical(m))
            .unwrap();
        for (i, m) in moves.iter().enumerate() {
            if position.is_tactical(*m) {
                let see = position.see(*m);
                if see < 0 {
                    assert!(i > first_quiet, "losing capture {} before quiets", m);
                } else {
                    assert!(i < first_quiet, "good capture {} after quiets", m);
                }
            }
        }
        assert_eq!(moves.iter().filter(|&&m| position.is_tactical(m)).count(), 5);
    }

    #[test]
    fn evasions_only_in_check() {
        let tables = HistoryTables::new();
        let mut position = Position::from_fen("4r1k1/8/8/1B6/8/8/8/4K2N w - - 0 1").unwrap();
        position.start_moves(Move::NULL, [Move::NULL; 2], GenerationKind::Main);
        let moves = drain(&mut position, &tables);
        // The capture of the checker comes first.
        assert_eq!(moves[0].to_uci(), "b5e8");
        let legal = position.legal_moves();
        for m in legal.iter() {
            assert!(moves.contains(m));
        }
    }

    #[test]
    fn quiescence_skips_quiets_and_losing_captures() {
        let tables = HistoryTables::new();
        let mut position = Position::from_fen(TACTICS).unwrap();
        position.start_moves(
            Move::NULL,
            [Move::NULL; 2],
            GenerationKind::Quiescence { quiet_checks: false },
        );
        let moves = drain(&mut position, &tables);
        assert_eq!(sorted_uci(&moves), vec!["a4d4", "c3e4", "f3d4"]);
        for m in &moves {
            assert!(position.is_tactical(*m));
            assert!(position.see(*m) >= 0, "{}", m);
        }
    }

    #[test]
    fn quiescence_keeps_a_lone_capture_unchecked() {
        let tables = HistoryTables::new();
        // Rxd5 loses the rook to cxd5 but is the only capture.
        let mut position = Position::from_fen("4k3/8/2p5/3p4/8/8/8/3RK3 w - - 0 1").unwrap();
        let m = position.parse_uci_move("d1d5").unwrap();
        assert!(position.see(m) < 0);
        position.start_moves(
            Move::NULL,
            [Move::NULL; 2],
            GenerationKind::Quiescence { quiet_checks: false },
        );
        assert_eq!(drain(&mut position, &tables), vec![m]);
    }

    #[test]
    fn quiescence_quiet_checks() {
        let tables = HistoryTables::new();
        let mut position = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        position.start_moves(
            Move::NULL,
            [Move::NULL; 2],
            GenerationKind::Quiescence { quiet_checks: true },
        );
        let moves = drain(&mut position, &tables);
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|&m| position.gives_check(m)));
        assert!(moves.iter().any(|m| m.to_uci() == "a1a8"));
    }

    fn playout(choices: &[usize]) -> Position<'static> {
        let mut position = Position::startpos();
        for &choice in choices {
            let moves = position.legal_moves();
            if moves.is_empty() {
                break;
            }
            let next = position.play(moves[choice % moves.len()]).map(|p| p.detached());
            match next {
                Some(next) => position = next,
                None => break,
            }
        }
        position
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn staged_matches_full_generation(
            choices in prop::collection::vec(0usize..256, 0..50),
            hash_pick in 0usize..256,
        ) {
            let tables = HistoryTables::new();
            let mut position = playout(&choices);
            let full = position.pseudo_legal_moves();
            let hash = if full.is_empty() { Move::NULL } else { full[hash_pick % full.len()] };
            position.start_moves(hash, [Move::NULL; 2], GenerationKind::Main);
            let staged = drain(&mut position, &tables);
            prop_assert_eq!(staged.len(), full.len());
            prop_assert_eq!(sorted_uci(&staged), sorted_uci(full.as_slice()));
        }
    }
}
