//! What the genetic algorithm evolves.
//!
//! A [`Genome`] is a fixed-size, copyable parameter vector that knows how to recombine,
//! mutate and turn itself into a playing agent. Two genomes ship with the crate:
//!
//! - [`EnsembleWeights`] - strategy-selection shares of an
//!   [`EnsembleAgent`](trike_ai::EnsembleAgent) (operators in [`weights`](crate::weights))
//! - [`StrategyWeights`] - feature weights of a
//!   [`StrategicAgent`](trike_ai::StrategicAgent) (operators in
//!   [`strategy`](crate::strategy))
//!
//! Besides other genomes, an individual can be measured against fixed [`Baseline`]
//! agents that need no genome at all.

use std::{fmt, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use trike_ai::{
    Agent, EnsembleAgent, EnsembleWeights, MinimaxAgent, RandomAgent, StrategicAgent,
    strategic::StrategyWeights,
};
use trike_engine::GameState;

use crate::{
    strategy,
    weights::{self, CrossoverKind, MutationKind},
};

pub trait Genome:
    Copy + PartialEq + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Name used on the command line and in logs.
    const KIND: &'static str;

    fn random<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized;

    fn crossover<R>(&self, other: &Self, kind: CrossoverKind, rng: &mut R) -> (Self, Self)
    where
        R: Rng + ?Sized;

    fn mutate<R>(&self, amount: u32, kind: MutationKind, rng: &mut R) -> Self
    where
        R: Rng + ?Sized;

    /// Dissimilarity on a `0..=200` scale; 0 for equal genomes.
    fn distance(&self, other: &Self) -> u32;

    /// A fresh agent playing this genome.
    fn agent<S: GameState>(&self, name: String, seed: u64) -> Box<dyn Agent<S>>;

    /// Genomes every individual is measured against by default.
    fn default_references() -> Vec<Self>;

    /// Fixed opponents every individual is measured against by default.
    fn default_baselines() -> Vec<Baseline> {
        vec![]
    }
}

/// A fixed opponent outside the population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum Baseline {
    #[display("random")]
    Random,
    #[display("minimax-{depth}")]
    Minimax { depth: u32 },
}

impl Baseline {
    #[must_use]
    pub fn agent<S: GameState>(&self, seed: u64) -> Box<dyn Agent<S>> {
        match *self {
            Self::Random => Box::new(RandomAgent::with_seed(seed).with_name("Baseline random")),
            Self::Minimax { depth } => Box::new(MinimaxAgent::new(depth)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid baseline {input:?}: expected random or minimax-DEPTH")]
pub struct ParseBaselineError {
    input: String,
}

impl FromStr for Baseline {
    type Err = ParseBaselineError;

    /// Parses the [`Display`](fmt::Display) form, `random` or `minimax-DEPTH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseBaselineError {
            input: s.to_owned(),
        };
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            other => {
                let depth = other.strip_prefix("minimax-").ok_or_else(err)?;
                Ok(Self::Minimax {
                    depth: depth.parse().map_err(|_| err())?,
                })
            }
        }
    }
}

/// Mutation amount scaled by the distance from `reference`:
/// `amount * (1 + distance / 100)`, rounded down.
///
/// ```
/// use trike_ai::EnsembleWeights;
/// use trike_training::genome;
///
/// let reference = EnsembleWeights::normalized([50, 40, 10]);
/// assert_eq!(genome::adaptive_amount(15, &reference, &reference), 15);
/// let far = EnsembleWeights::normalized([10, 40, 50]);
/// assert_eq!(genome::adaptive_amount(15, &far, &reference), 27);
/// ```
#[must_use]
pub fn adaptive_amount<G: Genome>(amount: u32, genome: &G, reference: &G) -> u32 {
    amount * (100 + genome.distance(reference)) / 100
}

impl Genome for EnsembleWeights {
    const KIND: &'static str = "ensemble";

    fn random<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        weights::random(rng)
    }

    fn crossover<R>(&self, other: &Self, kind: CrossoverKind, rng: &mut R) -> (Self, Self)
    where
        R: Rng + ?Sized,
    {
        match kind {
            CrossoverKind::SinglePoint => weights::single_point(self, other, rng),
            CrossoverKind::Blend => weights::blend(self, other, rng),
        }
    }

    fn mutate<R>(&self, amount: u32, kind: MutationKind, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        weights::mutate(self, amount, kind, rng)
    }

    fn distance(&self, other: &Self) -> u32 {
        self.l1_distance(other)
    }

    fn agent<S: GameState>(&self, name: String, seed: u64) -> Box<dyn Agent<S>> {
        Box::new(EnsembleAgent::with_seed(*self, seed).with_name(name))
    }

    fn default_references() -> Vec<Self> {
        vec![Self::CHAMPION]
    }
}

impl Genome for StrategyWeights {
    const KIND: &'static str = "strategic";

    fn random<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        strategy::random(rng)
    }

    fn crossover<R>(&self, other: &Self, kind: CrossoverKind, rng: &mut R) -> (Self, Self)
    where
        R: Rng + ?Sized,
    {
        match kind {
            CrossoverKind::SinglePoint => strategy::single_point(self, other, rng),
            CrossoverKind::Blend => strategy::blend(self, other, rng),
        }
    }

    fn mutate<R>(&self, amount: u32, kind: MutationKind, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        strategy::mutate(self, amount, kind, rng)
    }

    fn distance(&self, other: &Self) -> u32 {
        strategy::distance(self, other)
    }

    fn agent<S: GameState>(&self, name: String, _seed: u64) -> Box<dyn Agent<S>> {
        Box::new(StrategicAgent::new(*self).with_name(name))
    }

    fn default_references() -> Vec<Self> {
        vec![]
    }

    fn default_baselines() -> Vec<Baseline> {
        vec![Baseline::Random, Baseline::Minimax { depth: 2 }]
    }
}

#[cfg(test)]
mod tests {
    use trike_ai::strategic::Gene;
    use trike_engine::TrikeState;

    use super::*;

    #[test]
    fn test_distance_scales() {
        let low = StrategyWeights::clamped([0; Gene::COUNT]);
        let high = StrategyWeights::clamped([100; Gene::COUNT]);
        assert_eq!(low.distance(&high), 200);
        assert_eq!(adaptive_amount(10, &low, &high), 30);
        assert_eq!(adaptive_amount(10, &high, &high), 10);
    }

    #[test]
    fn test_agents_carry_names() {
        let agent = EnsembleWeights::CHAMPION.agent::<TrikeState>("Peer".to_owned(), 1);
        assert_eq!(agent.name(), "Peer");
        let agent = StrategyWeights::BALANCED.agent::<TrikeState>("Reference".to_owned(), 1);
        assert_eq!(agent.name(), "Reference");
        assert_eq!(Baseline::Random.agent::<TrikeState>(0).name(), "Baseline random");
    }

    #[test]
    fn test_baseline_serde() {
        let json = serde_json::to_string(&Baseline::Minimax { depth: 2 }).unwrap();
        assert_eq!(json, r#"{"minimax":{"depth":2}}"#);
        let back: Baseline = serde_json::from_str(r#""random""#).unwrap();
        assert_eq!(back, Baseline::Random);
        assert_eq!(Baseline::Minimax { depth: 3 }.to_string(), "minimax-3");
    }

    #[test]
    fn test_parse_baseline() {
        assert_eq!("random".parse(), Ok(Baseline::Random));
        assert_eq!("Minimax-4".parse(), Ok(Baseline::Minimax { depth: 4 }));
        for bad in ["", "minimax", "minimax-", "minimax-x", "mcts-3"] {
            assert!(bad.parse::<Baseline>().is_err(), "{bad}");
        }
    }
}
