//! Parameter sweeps for the search agents.
//!
//! Each candidate setting (a minimax depth or an MCTS iteration budget) meets a random
//! baseline in a short [`Tournament`] on every configured board size. The setting with
//! the most wins is reported as the best; a sweep in which no candidate won anything has
//! no best.

use serde::{Deserialize, Serialize};
use trike_ai::{
    Agent, MctsAgent, MinimaxAgent, RandomAgent,
    arena::{MatchConfig, MatchRunner},
};
use trike_engine::GameState;

use crate::tournament::Tournament;

/// The agent whose parameter is swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Searcher {
    /// Sweeps the search depth.
    #[display("minimax")]
    Minimax,
    /// Sweeps the iteration budget.
    #[display("mcts")]
    Mcts,
}

impl Searcher {
    #[must_use]
    pub fn default_values(self) -> Vec<u32> {
        match self {
            Self::Minimax => vec![2, 3, 4],
            Self::Mcts => vec![200, 500, 1000],
        }
    }

    fn agent<S: GameState>(self, value: u32, seed: u64) -> Box<dyn Agent<S>> {
        match self {
            Self::Minimax => Box::new(MinimaxAgent::new(value)),
            Self::Mcts => Box::new(MctsAgent::with_seed(value, seed)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningConfig {
    pub searcher: Searcher,
    pub values: Vec<u32>,
    pub board_sizes: Vec<u8>,
    /// Games per candidate and board size.
    pub rounds: u32,
    pub seed: u64,
    /// Template for every match; the board size is overridden per trial.
    pub match_config: MatchConfig,
}

impl TuningConfig {
    #[must_use]
    pub fn new(searcher: Searcher) -> Self {
        Self {
            searcher,
            values: searcher.default_values(),
            board_sizes: vec![5, 7],
            rounds: 5,
            seed: 0,
            match_config: MatchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    pub value: u32,
    pub board_size: u8,
    pub wins: u32,
    pub games: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningReport {
    pub searcher: Searcher,
    /// In sweep order: by value, then by board size.
    pub trials: Vec<Trial>,
    /// First trial with the most wins, if any trial won a game.
    pub best: Option<Trial>,
}

/// Runs the sweep on the game `S`.
pub fn tune<S: GameState>(config: &TuningConfig) -> TuningReport {
    let mut trials = vec![];
    let mut best: Option<Trial> = None;
    for &value in &config.values {
        for &board_size in &config.board_sizes {
            let runner = MatchRunner::new(MatchConfig {
                board_size,
                ..config.match_config.clone()
            });
            let candidate = config.searcher.agent::<S>(value, config.seed);
            let name = candidate.name().to_owned();
            let baseline: Box<dyn Agent<S>> =
                Box::new(RandomAgent::with_seed(config.seed).with_name("Random baseline"));
            let mut agents = [candidate, baseline];
            let report = Tournament::new(runner, config.rounds).run(&mut agents);
            let wins = report
                .standings
                .iter()
                .find(|s| s.name == name)
                .map_or(0, |s| s.wins);
            let trial = Trial {
                value,
                board_size,
                wins,
                games: config.rounds,
            };
            tracing::info!(
                searcher = %config.searcher,
                value,
                board_size,
                wins,
                games = config.rounds,
                "trial finished"
            );
            if trial.wins > best.map_or(0, |b| b.wins) {
                tracing::info!(value, board_size, wins, "new best setting");
                best = Some(trial);
            }
            trials.push(trial);
        }
    }
    TuningReport {
        searcher: config.searcher,
        trials,
        best,
    }
}
