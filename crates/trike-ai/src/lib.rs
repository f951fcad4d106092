//! Move-selection strategies for Trike.
//!
//! Every decision maker implements [`Agent`], so a match can pit any two against each
//! other through [`arena::MatchRunner`]:
//!
//! - [`MinimaxAgent`] - depth-bounded minimax with alpha-beta pruning (deterministic)
//! - [`MctsAgent`] - UCT Monte-Carlo tree search with a seedable generator
//! - [`LearnedAgent`] - a value network trained online from replayed experience
//! - [`RandomAgent`] - uniform over legal moves
//! - [`EnsembleAgent`] - commits to one of the above per game by weighted draw
//! - [`StrategicAgent`] - one-ply positional scoring with evolvable feature weights
//!
//! Agents are written against the [`GameState`](trike_engine::GameState) contract and
//! work on any implementation of it.
//!
//! # Example
//!
//! ```
//! use trike_ai::{
//!     MinimaxAgent, RandomAgent,
//!     arena::{MatchConfig, MatchRunner},
//! };
//! use trike_engine::TrikeState;
//!
//! let runner = MatchRunner::new(MatchConfig {
//!     board_size: 4,
//!     ..MatchConfig::default()
//! });
//! let mut minimax = MinimaxAgent::new(2);
//! let mut random = RandomAgent::with_seed(7);
//! let outcome = runner.play::<TrikeState>(&mut minimax, &mut random);
//! assert!(outcome.result.is_winner() || outcome.result.is_draw());
//! ```

pub use self::{
    agent::*, ensemble::*, learned::LearnedAgent, mcts::MctsAgent, minimax::MinimaxAgent,
    random::RandomAgent, strategic::StrategicAgent,
};

mod agent;
pub mod arena;
mod ensemble;
pub mod learned;
pub mod mcts;
pub mod minimax;
mod opening;
mod random;
pub mod strategic;
