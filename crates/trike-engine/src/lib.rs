//! Rules engine for Trike.
//!
//! Trike is played on a triangular board of hexagonal cells. The first player places a
//! marker anywhere and the shared pawn is set on top of it. From then on, each player in
//! turn moves the pawn in a straight line over empty cells, drops one of their own
//! markers on the destination, and leaves the pawn standing on it. The game ends as soon
//! as the pawn cannot move: every neighbouring cell is occupied. Each player then scores
//! one point per own marker under or adjacent to the pawn.
//!
//! The crate is split in two layers:
//!
//! - [`core`] - board geometry ([`Cell`], [`Board`], [`Player`])
//! - [`engine`] - game states, the [`GameState`] contract consumed by the AI crates and
//!   the [`TrikeState`] reference implementation
//!
//! # Example
//!
//! ```
//! use trike_engine::{Cell, GameState, TrikeState};
//!
//! let state = TrikeState::initial(5).unwrap();
//! let state = state.apply(Cell::new(1, 1));
//!
//! assert_eq!(state.pawn(), Some(Cell::new(1, 1)));
//! assert!(!state.is_terminal());
//! assert!(state.legal_moves().contains(&Cell::new(1, 2)));
//! ```

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("board size {size} is outside the supported range {}..={}", Board::MIN_SIZE, Board::MAX_SIZE)]
pub struct BoardSizeError {
    pub size: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum IllegalMoveError {
    #[display("cell {cell} is not on the board")]
    OffBoard { cell: Cell },
    #[display("cell {cell} is already occupied")]
    Occupied { cell: Cell },
    #[display("cell {cell} is not reachable from the pawn in a straight line")]
    Unreachable { cell: Cell },
    #[display("the game is already over")]
    GameOver,
}
