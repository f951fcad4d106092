//! Tensor encoding of positions and moves.
//!
//! A position on a board of side `n` becomes `3 * n * n + 1` floats:
//!
//! - plane 0: markers of the player to move
//! - plane 1: markers of the opponent
//! - plane 2: the pawn
//! - one scalar: `1.0` when [`Player::First`] is to move, `0.0` otherwise
//!
//! Planes are flattened row-major over `(q, r)`. Grid slots that are off the triangle
//! stay zero.

use trike_engine::{Cell, GameState, Player};

#[must_use]
pub fn state_len(board_size: u8) -> usize {
    let n = usize::from(board_size);
    3 * n * n + 1
}

#[must_use]
pub fn action_count(board_size: u8) -> usize {
    let n = usize::from(board_size);
    n * n
}

/// Action index `q * n + r`, or `None` if the cell is outside the grid.
#[must_use]
pub fn action_index(board_size: u8, cell: Cell) -> Option<usize> {
    (cell.q < board_size && cell.r < board_size)
        .then(|| usize::from(cell.q) * usize::from(board_size) + usize::from(cell.r))
}

#[must_use]
pub fn encode_state<S: GameState>(state: &S) -> Vec<f32> {
    let size = state.board_size();
    let plane = action_count(size);
    let me = state.current_player();
    let mut encoded = vec![0.0; state_len(size)];
    for q in 0..size {
        for r in 0..size {
            let cell = Cell::new(q, r);
            let Some(index) = action_index(size, cell) else {
                continue;
            };
            match state.marker(cell) {
                Some(owner) if owner == me => encoded[index] = 1.0,
                Some(_) => encoded[plane + index] = 1.0,
                None => {}
            }
            if state.pawn() == Some(cell) {
                encoded[2 * plane + index] = 1.0;
            }
        }
    }
    encoded[3 * plane] = if me == Player::First { 1.0 } else { 0.0 };
    encoded
}
