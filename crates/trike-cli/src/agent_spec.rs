use std::{fmt, path::PathBuf, str::FromStr};

use anyhow::Context as _;
use trike_ai::{
    Agent, EnsembleAgent, EnsembleWeights, LearnedAgent, MctsAgent, MinimaxAgent, RandomAgent,
    StrategicAgent, mcts::DEFAULT_ITERATIONS, minimax::DEFAULT_DEPTH, strategic::StrategyWeights,
};
use trike_engine::TrikeState;

/// An agent named on the command line.
///
/// Accepted forms: `random`, `minimax[:DEPTH]`, `mcts[:ITERATIONS]`,
/// `ensemble[:A-B-C]`, `strategic[:W1,...,W21]` and `learned:PATH`.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentSpec {
    Random,
    Minimax(u32),
    Mcts(u32),
    Ensemble(EnsembleWeights),
    Strategic(StrategyWeights),
    Learned(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display(
    "invalid agent {input:?}: expected random, minimax[:DEPTH], mcts[:ITERATIONS], ensemble[:A-B-C], strategic[:W1,...,W21] or learned:PATH"
)]
pub struct ParseAgentSpecError {
    input: String,
}

impl FromStr for AgentSpec {
    type Err = ParseAgentSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAgentSpecError {
            input: s.to_owned(),
        };
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (s, None),
        };
        let spec = match (kind.to_ascii_lowercase().as_str(), arg) {
            ("random", None) => Self::Random,
            ("minimax", None) => Self::Minimax(DEFAULT_DEPTH),
            ("minimax", Some(depth)) => Self::Minimax(depth.parse().map_err(|_| err())?),
            ("mcts", None) => Self::Mcts(DEFAULT_ITERATIONS),
            ("mcts", Some(iterations)) => Self::Mcts(iterations.parse().map_err(|_| err())?),
            ("ensemble", None) => Self::Ensemble(EnsembleWeights::CHAMPION),
            ("ensemble", Some(weights)) => Self::Ensemble(weights.parse().map_err(|_| err())?),
            ("strategic", None) => Self::Strategic(StrategyWeights::BALANCED),
            ("strategic", Some(weights)) => Self::Strategic(weights.parse().map_err(|_| err())?),
            ("learned", Some(path)) if !path.is_empty() => Self::Learned(path.into()),
            _ => return Err(err()),
        };
        Ok(spec)
    }
}

impl fmt::Display for AgentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::Minimax(depth) => write!(f, "minimax:{depth}"),
            Self::Mcts(iterations) => write!(f, "mcts:{iterations}"),
            Self::Ensemble(weights) => write!(f, "ensemble:{weights}"),
            Self::Strategic(weights) if *weights == StrategyWeights::BALANCED => {
                write!(f, "strategic")
            }
            Self::Strategic(weights) => write!(f, "strategic:{weights}"),
            Self::Learned(path) => write!(f, "learned:{}", path.display()),
        }
    }
}

impl AgentSpec {
    /// Builds the agent. Learned agents play greedily.
    pub fn build(&self, board_size: u8, seed: u64) -> anyhow::Result<Box<dyn Agent<TrikeState>>> {
        let name = self.to_string();
        let agent: Box<dyn Agent<TrikeState>> = match self {
            Self::Random => Box::new(RandomAgent::with_seed(seed).with_name(name)),
            Self::Minimax(depth) => Box::new(MinimaxAgent::new(*depth)),
            Self::Mcts(iterations) => Box::new(MctsAgent::with_seed(*iterations, seed)),
            Self::Ensemble(weights) => Box::new(EnsembleAgent::with_seed(*weights, seed)),
            Self::Strategic(weights) => Box::new(StrategicAgent::new(*weights).with_name(name)),
            Self::Learned(path) => {
                let mut agent = LearnedAgent::load(path)
                    .with_context(|| format!("Failed to load learned agent: {}", path.display()))?;
                if agent.board_size() != board_size {
                    tracing::warn!(
                        agent = %name,
                        model_size = agent.board_size(),
                        board_size,
                        "model was trained on another board size, it will play randomly"
                    );
                }
                agent.set_epsilon(0.0);
                Box::new(agent)
            }
        };
        Ok(agent)
    }
}
