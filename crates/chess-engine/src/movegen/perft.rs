//! Perft (performance test) for move generator validation.
//!
//! Perft counts the leaf nodes of the legal move tree to a fixed depth. The
//! counts are compared against published values to validate both the full
//! generator and the staged one.

use crate::ordering::HistoryTables;
use crate::staged::GenerationKind;
use crate::Position;
use chess_core::Move;

/// Leaf count using the full legal move list.
pub fn perft(position: &Position<'_>, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = position.legal_moves();
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0u64;
    for &m in moves.iter() {
        if let Some(child) = position.play(m) {
            nodes += perft(&child, depth - 1);
        }
    }
    nodes
}

/// Leaf count driven by the staged generator, discarding moves that turn
/// out illegal when applied, the way the search does.
pub fn perft_staged(position: &mut Position<'_>, depth: u32, tables: &HistoryTables) -> u64 {
    if depth == 0 {
        return 1;
    }

    position.start_moves(Move::NULL, [Move::NULL; 2], GenerationKind::Main);
    let mut nodes = 0u64;
    while let Some(m) = position.next_move(tables) {
        let mut child = position.make_child();
        if child.apply_move(m) {
            nodes += perft_staged(&mut child, depth - 1, tables);
        }
    }
    nodes
}

/// Node count below each root move, sorted by move text.
pub fn perft_divide(position: &Position<'_>, depth: u32) -> Vec<(String, u64)> {
    let moves = position.legal_moves();
    let mut results = Vec::with_capacity(moves.len());

    for &m in moves.iter() {
        if let Some(child) = position.play(m) {
            let nodes = if depth > 1 { perft(&child, depth - 1) } else { 1 };
            results.push((position.move_to_uci(m), nodes));
        }
    }

    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}
