//! Principal variation bookkeeping.

use chess_core::Move;
use chess_engine::Position;

use crate::tt::TranspositionTable;

/// Longest line kept or reported.
pub const PV_MAX_LENGTH: usize = 32;

/// Fixed-capacity line collected on the way back up the tree.
#[derive(Clone, Copy)]
pub(crate) struct PvLine {
    moves: [Move; PV_MAX_LENGTH],
    len: usize,
}

impl PvLine {
    pub(crate) const fn new() -> Self {
        PvLine {
            moves: [Move::NULL; PV_MAX_LENGTH],
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }

    /// `m` followed by the child's line.
    pub(crate) fn update(&mut self, m: Move, child: &PvLine) {
        self.moves[0] = m;
        let tail = child.len.min(PV_MAX_LENGTH - 1);
        self.moves[1..=tail].copy_from_slice(&child.moves[..tail]);
        self.len = tail + 1;
    }

    pub(crate) fn as_slice(&self) -> &[Move] {
        &self.moves[..self.len]
    }
}

/// Checks `line` move by move from `root` and extends it with hash moves.
///
/// The result stops at the first illegal move, at a repeated position, or
/// at [`PV_MAX_LENGTH`] moves.
pub fn extract_pv(root: &Position<'_>, line: &[Move], tt: &TranspositionTable) -> Vec<Move> {
    let mut pv = Vec::with_capacity(PV_MAX_LENGTH);
    let mut seen = vec![root.hash()];
    let mut current = root.detached();

    let mut advance = |current: &mut Position<'static>, m: Move, pv: &mut Vec<Move>| -> bool {
        if m.is_null() || !current.is_pseudo_legal(m) {
            return false;
        }
        let Some(next) = current.play(m).map(|child| child.detached()) else {
            return false;
        };
        if seen.contains(&next.hash()) {
            return false;
        }
        seen.push(next.hash());
        pv.push(m);
        *current = next;
        true
    };

    for &m in line.iter().take(PV_MAX_LENGTH) {
        if !advance(&mut current, m, &mut pv) {
            return pv;
        }
    }
    while pv.len() < PV_MAX_LENGTH {
        let Some(entry) = tt.probe(current.hash()) else {
            break;
        };
        if !advance(&mut current, entry.mv, &mut pv) {
            break;
        }
    }
    pv
}

/// Move text for each move of `line`, rendered in the position it is played
/// from.
pub fn line_to_uci(root: &Position<'_>, line: &[Move]) -> Vec<String> {
    let mut current = root.detached();
    let mut text = Vec::with_capacity(line.len());
    for &m in line {
        text.push(current.move_to_uci(m));
        match current.play(m).map(|child| child.detached()) {
            Some(next) => current = next,
            None => break,
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tt::Bound;

    fn parse(position: &Position<'_>, text: &str) -> Move {
        position.parse_uci_move(text).unwrap()
    }

    #[test]
    fn update_prepends_the_move() {
        let root = Position::startpos();
        let e4 = parse(&root, "e2e4");
        let d4 = parse(&root, "d2d4");
        let mut child = PvLine::new();
        child.update(d4, &PvLine::new());
        let mut line = PvLine::new();
        line.update(e4, &child);
        assert_eq!(line.as_slice(), &[e4, d4]);
        line.clear();
        assert!(line.as_slice().is_empty());
    }

    #[test]
    fn illegal_moves_truncate_the_line() {
        let root = Position::startpos();
        let tt = TranspositionTable::new(1);
        let e4 = parse(&root, "e2e4");
        // White moves twice in a row.
        let line = [e4, e4];
        assert_eq!(extract_pv(&root, &line, &tt), vec![e4]);
    }

    #[test]
    fn line_is_extended_from_the_table() {
        let root = Position::startpos();
        let tt = TranspositionTable::new(1);
        let e4 = parse(&root, "e2e4");
        let after = root.play(e4).unwrap();
        let e5 = parse(&after, "e7e5");
        tt.store(after.hash(), 0, 5, Bound::Exact, e5, 1);
        assert_eq!(extract_pv(&root, &[e4], &tt), vec![e4, e5]);
    }

    #[test]
    fn extension_stops_at_a_repetition() {
        let root = Position::startpos();
        let tt = TranspositionTable::new(1);
        let nf3 = parse(&root, "g1f3");
        let a = root.play(nf3).unwrap();
        let nf6 = parse(&a, "g8f6");
        let b = a.play(nf6).unwrap();
        let ng1 = parse(&b, "f3g1");
        let c = b.play(ng1).unwrap();
        let ng8 = parse(&c, "f6g8");
        tt.store(a.hash(), 0, 5, Bound::Exact, nf6, 1);
        tt.store(b.hash(), 0, 5, Bound::Exact, ng1, 2);
        tt.store(c.hash(), 0, 5, Bound::Exact, ng8, 3);
        assert_eq!(extract_pv(&root, &[nf3], &tt), vec![nf3, nf6, ng1]);
    }

    #[test]
    fn uci_text_of_a_line() {
        let root = Position::startpos();
        let e4 = parse(&root, "e2e4");
        let after = root.play(e4).unwrap();
        let c5 = parse(&after, "c7c5");
        assert_eq!(line_to_uci(&root, &[e4, c5]), vec!["e2e4", "c7c5"]);
    }
}
