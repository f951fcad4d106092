//! Training systems for Trike agents.
//!
//! Three independent loops live here:
//!
//! - the **evolutionary optimizer** searches for a good [`Genome`](genome::Genome) by
//!   playing many matches: ensemble weightings or strategic feature weights
//! - the **self-play trainer** drives a [`LearnedAgent`](trike_ai::LearnedAgent)
//!   through games and hands it shaped rewards
//! - the **parameter sweep** in [`tuning`] pits search settings against a random
//!   baseline
//!
//! # How Evolution Works
//!
//! 1. **Population** - Start from random genomes
//! 2. **Evaluation** - Every individual plays against the reference genomes, the fixed
//!    baselines and a few population peers; wins become fitness ([`evaluation`])
//! 3. **Record** - The best individual joins the Hall of Fame and the generation is
//!    persisted through the run store ([`store`])
//! 4. **Reproduction** - Tournament selection, crossover and mutation build the next
//!    generation ([`genetic`], [`weights`], [`strategy`])
//! 5. **Repeat** - Until the configured number of generations has been played
//!
//! # Architecture
//!
//! ```text
//! EvolutionaryOptimizer (evolution)
//!     ↓ evolves
//! Population of EnsembleWeights | StrategyWeights (genetic)
//!     ↓ wrapped in
//! EnsembleAgent | StrategicAgent (trike-ai)
//!     ↓ played by
//! MatchRunner, in parallel (evaluation)
//!     ↓ produces
//! Fitness
//!     ↓ recorded through
//! RunStore / LeaderboardStore (store)
//! ```
//!
//! # Current Limitations
//!
//! - **Noisy fitness**: a handful of games per opponent gives coarse win rates; two
//!   identical weightings can land far apart in one generation
//! - **Fixed delegates**: the ensemble's minimax depth and MCTS budget are not part of
//!   the genome
//! - **No resume**: an interrupted run starts over; the stored generations are for
//!   inspection only

pub mod evaluation;
pub mod evolution;
pub mod genetic;
pub mod genome;
pub mod self_play;
pub mod stats;
pub mod store;
pub mod strategy;
pub mod tournament;
pub mod tuning;
pub mod weights;
