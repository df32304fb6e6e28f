use crate::arena::{StateArena, StateId};
use crate::puzzle::Move;

/// Walks parent links from `terminal` back to the origin and returns the
/// slides in origin-to-terminal order. Empty when `terminal` is the origin.
pub fn reconstruct(arena: &StateArena, terminal: StateId) -> Vec<Move> {
    let mut moves = Vec::new();
    let mut current = &arena[terminal];

    while let Some(direction) = current.last_move() {
        moves.push(direction);
        match current.parent() {
            Some(parent) => current = &arena[parent],
            None => break,
        }
    }

    // Collected from the end backwards
    moves.reverse();
    moves
}
