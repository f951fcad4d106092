//! Game states and the rules contract.
//!
//! - [`GameState`] - the contract the decision makers are written against: legal moves,
//!   pure move application, terminal test, scoring and the few geometric queries an
//!   agent needs
//! - [`TrikeState`] - the Trike rules on a [`Board`](crate::Board)
//!
//! # Game Flow
//!
//! 1. Create a state with [`GameState::initial`] for a board side
//! 2. The player to move picks one of [`GameState::legal_moves`]
//! 3. [`GameState::apply`] returns the successor; the receiver is left untouched
//! 4. Repeat until [`GameState::is_terminal`], then read [`GameState::outcome`]

pub use self::{game_state::*, state::*};

mod game_state;
mod state;
