use std::{fmt, str::FromStr};

use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use trike_engine::{Cell, GameState};

use crate::{Agent, MctsAgent, MinimaxAgent, RandomAgent};

/// Search depth of the minimax delegate.
pub const ENSEMBLE_MINIMAX_DEPTH: u32 = 3;
/// Iteration budget of the MCTS delegate.
pub const ENSEMBLE_MCTS_ITERATIONS: u32 = 500;

/// The strategies an [`EnsembleAgent`] can commit to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
pub enum Strategy {
    #[display("minimax")]
    Minimax,
    #[display("mcts")]
    Mcts,
    #[display("random")]
    Random,
}

/// Selection weights of an [`EnsembleAgent`], as percentages.
///
/// Always normalized: the three components sum to exactly 100 and none is below
/// [`MIN_WEIGHT`](Self::MIN_WEIGHT). Normalizing an already normalized value leaves it
/// unchanged.
///
/// # Examples
///
/// ```
/// use trike_ai::EnsembleWeights;
///
/// let w = EnsembleWeights::normalized([0, 30, 300]);
/// assert_eq!(w.sum(), 100);
/// assert!(w.as_array().iter().all(|&c| c >= EnsembleWeights::MIN_WEIGHT));
/// assert_eq!(EnsembleWeights::normalized(w.as_array().map(i64::from)), w);
///
/// let parsed: EnsembleWeights = "50-40-10".parse().unwrap();
/// assert_eq!(parsed.as_array(), [50, 40, 10]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[i64; 3]", into = "[u32; 3]")]
pub struct EnsembleWeights {
    minimax: u32,
    mcts: u32,
    random: u32,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl EnsembleWeights {
    pub const MIN_WEIGHT: u32 = 5;
    pub const TOTAL: u32 = 100;
    pub const DEFAULT: Self = Self {
        minimax: 20,
        mcts: 31,
        random: 49,
    };
    /// Best weighting found by earlier evolution runs.
    pub const CHAMPION: Self = Self {
        minimax: 50,
        mcts: 40,
        random: 10,
    };

    /// Clamps every component to [`MIN_WEIGHT`](Self::MIN_WEIGHT) and rescales the part
    /// above the floor so that the total is [`TOTAL`](Self::TOTAL).
    ///
    /// The last component absorbs the rounding remainder.
    #[must_use]
    pub fn normalized(raw: [i64; 3]) -> Self {
        // i128: the sum and the products below overflow i64 for extreme inputs.
        let floor = i128::from(Self::MIN_WEIGHT);
        let total = i128::from(Self::TOTAL);
        let clamped = raw.map(|w| i128::from(w).max(floor));
        if clamped.iter().sum::<i128>() == total {
            return Self::from_clamped(clamped);
        }
        let spare = total - 3 * floor;
        let excess = clamped.map(|w| w - floor);
        let excess_sum: i128 = excess.iter().sum();
        let [a, b] = if excess_sum == 0 {
            [(spare + 2) / 3, spare / 3]
        } else {
            [excess[0] * spare / excess_sum, excess[1] * spare / excess_sum]
        };
        let first = floor + a;
        let second = floor + b;
        Self::from_clamped([first, second, total - first - second])
    }

    fn from_clamped(values: [i128; 3]) -> Self {
        let [minimax, mcts, random] =
            values.map(|v| u32::try_from(v).unwrap_or(Self::MIN_WEIGHT));
        Self {
            minimax,
            mcts,
            random,
        }
    }

    #[must_use]
    pub fn minimax(&self) -> u32 {
        self.minimax
    }

    #[must_use]
    pub fn mcts(&self) -> u32 {
        self.mcts
    }

    #[must_use]
    pub fn random(&self) -> u32 {
        self.random
    }

    #[must_use]
    pub fn as_array(&self) -> [u32; 3] {
        [self.minimax, self.mcts, self.random]
    }

    #[must_use]
    pub fn sum(&self) -> u32 {
        self.minimax + self.mcts + self.random
    }

    /// Sum of absolute per-component differences.
    #[must_use]
    pub fn l1_distance(&self, other: &Self) -> u32 {
        self.as_array()
            .iter()
            .zip(other.as_array())
            .map(|(&a, b)| a.abs_diff(b))
            .sum()
    }

    /// Maps a roll in `0..100` to a strategy.
    #[must_use]
    pub fn strategy_for_roll(&self, roll: u32) -> Strategy {
        if roll < self.minimax {
            Strategy::Minimax
        } else if roll < self.minimax + self.mcts {
            Strategy::Mcts
        } else {
            Strategy::Random
        }
    }
}

impl From<EnsembleWeights> for [u32; 3] {
    fn from(weights: EnsembleWeights) -> Self {
        weights.as_array()
    }
}

impl TryFrom<[i64; 3]> for EnsembleWeights {
    type Error = std::convert::Infallible;

    fn try_from(raw: [i64; 3]) -> Result<Self, Self::Error> {
        Ok(Self::normalized(raw))
    }
}

impl fmt::Display for EnsembleWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.minimax, self.mcts, self.random)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid ensemble weights {input:?}: expected three integers like `50-40-10`")]
pub struct ParseWeightsError {
    pub input: String,
}

impl FromStr for EnsembleWeights {
    type Err = ParseWeightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseWeightsError { input: s.to_owned() };
        let parts = s
            .split(['-', '/', ','])
            .map(|p| p.trim().parse::<i64>().map_err(|_| err()))
            .collect::<Result<Vec<_>, _>>()?;
        let raw: [i64; 3] = parts.try_into().map_err(|_| err())?;
        Ok(Self::normalized(raw))
    }
}

#[derive(Debug, Clone)]
enum Delegate {
    Minimax(MinimaxAgent),
    Mcts(MctsAgent),
    Random(RandomAgent),
}

impl Delegate {
    fn strategy(&self) -> Strategy {
        match self {
            Self::Minimax(_) => Strategy::Minimax,
            Self::Mcts(_) => Strategy::Mcts,
            Self::Random(_) => Strategy::Random,
        }
    }
}

/// Plays each game with one strategy drawn in proportion to its weights.
///
/// The draw happens on the first [`choose_move`](Agent::choose_move) after construction
/// or [`reset`](Agent::reset); every later call in the same game goes to the same
/// delegate instance.
#[derive(Debug, Clone)]
pub struct EnsembleAgent {
    name: String,
    weights: EnsembleWeights,
    rng: Pcg32,
    delegate: Option<Delegate>,
    commits: u64,
}

impl EnsembleAgent {
    #[must_use]
    pub fn new(weights: EnsembleWeights) -> Self {
        Self::with_seed(weights, rand::rng().random())
    }

    #[must_use]
    pub fn with_seed(weights: EnsembleWeights, seed: u64) -> Self {
        Self {
            name: format!("Ensemble {weights}"),
            weights,
            rng: Pcg32::seed_from_u64(seed),
            delegate: None,
            commits: 0,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn weights(&self) -> EnsembleWeights {
        self.weights
    }

    /// Strategy committed to for the current game, if any.
    #[must_use]
    pub fn committed(&self) -> Option<Strategy> {
        self.delegate.as_ref().map(Delegate::strategy)
    }

    /// Number of strategy draws since construction.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits
    }

    fn commit(&mut self) -> &mut Delegate {
        self.delegate.get_or_insert_with(|| {
            let roll = self.rng.random_range(0..EnsembleWeights::TOTAL);
            let seed = self.rng.random();
            match self.weights.strategy_for_roll(roll) {
                Strategy::Minimax => Delegate::Minimax(MinimaxAgent::new(ENSEMBLE_MINIMAX_DEPTH)),
                Strategy::Mcts => {
                    Delegate::Mcts(MctsAgent::with_seed(ENSEMBLE_MCTS_ITERATIONS, seed))
                }
                Strategy::Random => Delegate::Random(RandomAgent::with_seed(seed)),
            }
        })
    }
}

impl<S: GameState> Agent<S> for EnsembleAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&mut self, state: &S) -> Option<Cell> {
        if self.delegate.is_none() {
            self.commits += 1;
            tracing::trace!(agent = %self.name, "drawing a strategy for the new game");
        }
        match self.commit() {
            Delegate::Minimax(agent) => agent.choose_move(state),
            Delegate::Mcts(agent) => agent.choose_move(state),
            Delegate::Random(agent) => agent.choose_move(state),
        }
    }

    fn reset(&mut self) {
        self.delegate = None;
    }
}

#[cfg(test)]
mod tests {
    use trike_engine::TrikeState;

    use super::*;

    #[test]
    fn test_normalization_invariants() {
        let cases = [
            [0, 0, 0],
            [5, 5, 1000],
            [-20, 50, 50],
            [50, 40, 10],
            [33, 33, 34],
            [1, 2, 3],
            [99, 99, 99],
            [100, 0, 0],
            [70, 25, 60],
        ];
        for raw in cases {
            let w = EnsembleWeights::normalized(raw);
            assert_eq!(w.sum(), 100, "{raw:?} -> {w}");
            assert!(w.as_array().iter().all(|&c| c >= 5), "{raw:?} -> {w}");
            let again = EnsembleWeights::normalized(w.as_array().map(i64::from));
            assert_eq!(again, w, "normalization of {raw:?} is not idempotent");
        }
    }

    #[test]
    fn test_normalized_values_kept() {
        assert_eq!(EnsembleWeights::normalized([50, 40, 10]).as_array(), [50, 40, 10]);
        assert_eq!(EnsembleWeights::normalized([0, 0, 0]).as_array(), [34, 33, 33]);
        assert_eq!(EnsembleWeights::normalized([0, 95, 0]).as_array(), [5, 90, 5]);
    }

    #[test]
    fn test_extreme_components() {
        let max = i64::MAX;
        assert_eq!(EnsembleWeights::normalized([max, 0, 0]).as_array(), [90, 5, 5]);
        assert_eq!(EnsembleWeights::normalized([max, max, 0]).as_array(), [47, 47, 6]);
        let all = EnsembleWeights::normalized([max, max, max]);
        assert_eq!(all.sum(), 100);
        assert_eq!(EnsembleWeights::normalized([i64::MIN, max, i64::MIN]).as_array(), [5, 90, 5]);
        assert_eq!(
            "9223372036854775807-0-0".parse::<EnsembleWeights>().unwrap().as_array(),
            [90, 5, 5]
        );
    }

    #[test]
    fn test_roll_mapping() {
        let w = EnsembleWeights::normalized([50, 40, 10]);
        assert_eq!(w.strategy_for_roll(0), Strategy::Minimax);
        assert_eq!(w.strategy_for_roll(49), Strategy::Minimax);
        assert_eq!(w.strategy_for_roll(50), Strategy::Mcts);
        assert_eq!(w.strategy_for_roll(89), Strategy::Mcts);
        assert_eq!(w.strategy_for_roll(90), Strategy::Random);
        assert_eq!(w.strategy_for_roll(99), Strategy::Random);
    }

    #[test]
    fn test_parse() {
        assert_eq!("50-40-10".parse::<EnsembleWeights>().unwrap().to_string(), "50-40-10");
        assert!("50-40".parse::<EnsembleWeights>().is_err());
        assert!("a-b-c".parse::<EnsembleWeights>().is_err());
    }

    #[test]
    fn test_serde_normalizes() {
        let w: EnsembleWeights = serde_json::from_str("[0, 0, 200]").unwrap();
        assert_eq!(w.as_array(), [5, 5, 90]);
        assert_eq!(serde_json::to_string(&w).unwrap(), "[5,5,90]");
    }

    #[test]
    fn test_single_delegate_per_game() {
        let mut agent = EnsembleAgent::with_seed(EnsembleWeights::normalized([34, 33, 33]), 8);
        for _ in 0..5 {
            Agent::<TrikeState>::reset(&mut agent);
            assert_eq!(agent.committed(), None);
            let mut state = TrikeState::initial(4).unwrap();
            let mut strategy = None;
            while let Some(mv) = agent.choose_move(&state) {
                let committed = agent.committed();
                assert!(committed.is_some());
                if strategy.is_none() {
                    strategy = committed;
                }
                assert_eq!(committed, strategy);
                state = state.apply(mv);
            }
        }
        assert_eq!(agent.commit_count(), 5);
    }

    #[test]
    fn test_three_cell_board() {
        let state = TrikeState::initial(2)
            .unwrap()
            .apply(Cell::new(0, 0))
            .apply(Cell::new(1, 0));
        for seed in 0..10 {
            let mut agent = EnsembleAgent::with_seed(EnsembleWeights::DEFAULT, seed);
            assert_eq!(agent.choose_move(&state), Some(Cell::new(0, 1)));
        }
    }
}
