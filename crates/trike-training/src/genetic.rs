//! Genetic algorithm over any [`Genome`].
//!
//! A population of [`Individual`]s is evaluated by playing matches (see
//! [`evaluation`](crate::evaluation)), sorted by fitness, and replaced wholesale by the
//! offspring that [`PopulationEvolver::evolve`] builds.
//!
//! # Algorithm Overview
//!
//! 1. **Elite Selection** - The top `elite_count` individuals survive unchanged
//! 2. **Tournament Selection** - Two parents are drawn, each the fittest of
//!    `tournament_size` random individuals
//! 3. **Crossover** - With probability `crossover_rate` the parents are recombined
//!    (single-point or blend); otherwise the children are copies
//! 4. **Mutation** - Each child is mutated with probability `mutation_rate`
//! 5. **Repair** - Every child is brought back into its genome's valid range
//!    (ensemble weightings renormalize, strategy weights clamp)
//!
//! # Fitness
//!
//! Fitness is the share of games won: `credit / games_played`, clamped to `[0, 1]`.
//! Wins against references and baselines may be worth more than one game of credit, which is
//! why the clamp exists. An individual that played nothing has fitness 0.
//!
//! # Current Limitations
//!
//! - **No fitness caching**: elites are re-evaluated every generation, because fitness
//!   depends on the peers they are drawn against
//! - **Duplicates allowed**: copies without crossover can fill the population with
//!   identical weightings; nothing enforces diversity beyond mutation

use std::cmp::Ordering;

use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};
use trike_ai::EnsembleWeights;

use crate::{
    evaluation::Tally,
    genome::{self, Genome},
    stats::FitnessStats,
    weights::{CrossoverKind, MutationKind},
};

/// A candidate genome and the games it has played so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual<G = EnsembleWeights> {
    weights: G,
    games_played: u32,
    credit: f64,
}

impl<G: Genome> Individual<G> {
    #[must_use]
    pub fn new(weights: G) -> Self {
        Self {
            weights,
            games_played: 0,
            credit: 0.0,
        }
    }

    pub fn random<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::new(G::random(rng))
    }

    #[must_use]
    pub fn weights(&self) -> &G {
        &self.weights
    }

    #[must_use]
    pub fn games_played(&self) -> u32 {
        self.games_played
    }

    /// Games won, with reference wins weighted by the evaluator's bonus.
    #[must_use]
    pub fn credit(&self) -> f64 {
        self.credit
    }

    /// Win rate in `[0, 1]`, or 0 if no game was played.
    ///
    /// ```
    /// use trike_ai::EnsembleWeights;
    /// use trike_training::genetic::Individual;
    ///
    /// let mut ind: Individual = Individual::new(EnsembleWeights::default());
    /// assert_eq!(ind.fitness(), 0.0);
    /// ind.record_games(4, 6.0);
    /// assert_eq!(ind.fitness(), 1.0);
    /// ```
    #[must_use]
    pub fn fitness(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        (self.credit / f64::from(self.games_played)).clamp(0.0, 1.0)
    }

    /// Adds `games` played and `credit` earned.
    pub fn record_games(&mut self, games: u32, credit: f64) {
        self.games_played += games;
        self.credit += credit;
    }

    pub(crate) fn record(&mut self, tally: &Tally) {
        self.record_games(tally.games, tally.credit);
    }

    /// Forgets every recorded game.
    pub fn clear_record(&mut self) {
        self.games_played = 0;
        self.credit = 0.0;
    }
}

/// One generation's individuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population<G = EnsembleWeights> {
    individuals: Vec<Individual<G>>,
}

impl<G: Genome> Population<G> {
    pub fn random<R>(count: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let individuals = (0..count).map(|_| Individual::random(rng)).collect();
        Self { individuals }
    }

    #[must_use]
    pub fn from_individuals(individuals: Vec<Individual<G>>) -> Self {
        Self { individuals }
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual<G>] {
        &self.individuals
    }

    pub(crate) fn individuals_mut(&mut self) -> &mut [Individual<G>] {
        &mut self.individuals
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// The first individual; the fittest after [`Self::sort_by_fitness`].
    #[must_use]
    pub fn best(&self) -> Option<&Individual<G>> {
        self.individuals.first()
    }

    /// Sorts by fitness descending. Ties keep their order.
    pub fn sort_by_fitness(&mut self) {
        self.individuals
            .sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
    }

    #[must_use]
    pub fn is_sorted_by_fitness(&self) -> bool {
        self.individuals
            .is_sorted_by(|a, b| a.fitness() >= b.fitness())
    }

    #[must_use]
    pub fn fitness_stats(&self) -> Option<FitnessStats> {
        FitnessStats::new(self.individuals.iter().map(Individual::fitness))
    }
}

/// Parameters for building the next generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "G: Genome"))]
pub struct PopulationEvolver<G = EnsembleWeights> {
    /// Number of top individuals copied unchanged.
    pub elite_count: usize,
    /// Individuals per selection tournament.
    pub tournament_size: usize,
    /// Probability that a parent pair is recombined instead of copied.
    pub crossover_rate: f64,
    pub crossover: CrossoverKind,
    /// Probability that a child is mutated.
    pub mutation_rate: f64,
    /// Largest step a mutated component can take.
    pub mutation_amount: u32,
    pub mutation: MutationKind,
    /// Scale the mutation amount by the distance from this genome.
    pub adaptive_reference: Option<G>,
}

impl<G: Genome> Default for PopulationEvolver<G> {
    fn default() -> Self {
        Self {
            elite_count: 0,
            tournament_size: 3,
            crossover_rate: 0.7,
            crossover: CrossoverKind::SinglePoint,
            mutation_rate: 0.2,
            mutation_amount: 15,
            mutation: MutationKind::Uniform,
            adaptive_reference: None,
        }
    }
}

impl<G: Genome> PopulationEvolver<G> {
    /// Builds the next generation.
    ///
    /// `population` must be sorted by fitness descending. The result has the same size
    /// and carries no games.
    pub fn evolve<R>(&self, population: &Population<G>, rng: &mut R) -> Population<G>
    where
        R: Rng + ?Sized,
    {
        assert!(population.is_sorted_by_fitness());
        let target = population.len();
        let mut next = Vec::with_capacity(target);

        let elites = self.elite_count.min(target);
        next.extend(
            population.individuals[..elites]
                .iter()
                .map(|ind| Individual::new(ind.weights)),
        );

        while next.len() < target {
            let p1 = tournament_select(&population.individuals, self.tournament_size, rng);
            let p2 = tournament_select(&population.individuals, self.tournament_size, rng);

            let (c1, c2) = if rng.random_bool(self.crossover_rate.clamp(0.0, 1.0)) {
                p1.weights.crossover(&p2.weights, self.crossover, rng)
            } else {
                (p1.weights, p2.weights)
            };

            for child in [c1, c2] {
                if next.len() == target {
                    break;
                }
                let child = self.maybe_mutate(child, rng);
                next.push(Individual::new(child));
            }
        }

        Population::from_individuals(next)
    }

    fn maybe_mutate<R>(&self, child: G, rng: &mut R) -> G
    where
        R: Rng + ?Sized,
    {
        if !rng.random_bool(self.mutation_rate.clamp(0.0, 1.0)) {
            return child;
        }
        let amount = self
            .adaptive_reference
            .as_ref()
            .map_or(self.mutation_amount, |reference| {
                genome::adaptive_amount(self.mutation_amount, &child, reference)
            });
        child.mutate(amount, self.mutation, rng)
    }
}

/// The fittest of `tournament_size` distinct individuals drawn at random.
fn tournament_select<'a, G, R>(
    population: &'a [Individual<G>],
    tournament_size: usize,
    rng: &mut R,
) -> &'a Individual<G>
where
    G: Genome,
    R: Rng + ?Sized,
{
    assert!(tournament_size > 0);
    assert!(!population.is_empty());
    population
        .choose_multiple(rng, tournament_size)
        .max_by(|a, b| a.fitness().partial_cmp(&b.fitness()).unwrap_or(Ordering::Equal))
        .unwrap_or(&population[0])
}
