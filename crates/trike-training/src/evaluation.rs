//! Match-based fitness evaluation.
//!
//! Every individual of a [`Population`] plays `rounds` rounds against each reference
//! genome, each fixed [`Baseline`] and a random sample of its peers. A round is two
//! games, one from each seat. Only the individual being evaluated is credited for a
//! game, so peer games do not leak fitness between individuals.
//!
//! # Scoring
//!
//! | Result                | Credit                  |
//! |-----------------------|-------------------------|
//! | win against reference | `reference_win_bonus`   |
//! | win against baseline  | `reference_win_bonus`   |
//! | win against peer      | 1                       |
//! | draw, loss            | 0                       |
//! | timeout, error        | 0 (for both sides)      |
//!
//! # Parallelism
//!
//! All games of a generation are laid out as independent jobs up front, each with its own
//! seed, then split across scoped worker threads. Every job builds fresh agents and a fresh
//! game. Results are reduced after all workers join, in job order, so a seeded run is
//! reproducible regardless of the worker count.

use std::{fmt, num::NonZero, ops::AddAssign, thread};

use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};
use trike_ai::{
    Agent, EnsembleWeights,
    arena::{MatchConfig, MatchOutcome, MatchResult, MatchRunner, Seat},
};
use trike_engine::GameState;

use crate::{
    genetic::Population,
    genome::{Baseline, Genome},
};

/// Game counts for one individual, or summed over a generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub games: u32,
    pub wins: u32,
    pub draws: u32,
    pub timeouts: u32,
    pub errors: u32,
    /// Wins weighted by the reference bonus.
    pub credit: f64,
}

impl Tally {
    fn record(&mut self, outcome: &MatchOutcome, seat: Seat, win_credit: f64) {
        self.games += 1;
        match outcome.result {
            MatchResult::Winner(winner) if winner == seat => {
                self.wins += 1;
                self.credit += win_credit;
            }
            MatchResult::Winner(_) => {}
            MatchResult::Draw => self.draws += 1,
            MatchResult::Timeout => self.timeouts += 1,
            MatchResult::Error => self.errors += 1,
        }
    }

    #[must_use]
    pub fn losses(&self) -> u32 {
        self.games - self.wins - self.draws - self.timeouts - self.errors
    }
}

impl AddAssign<&Tally> for Tally {
    fn add_assign(&mut self, rhs: &Tally) {
        self.games += rhs.games;
        self.wins += rhs.wins;
        self.draws += rhs.draws;
        self.timeouts += rhs.timeouts;
        self.errors += rhs.errors;
        self.credit += rhs.credit;
    }
}

/// Plays the matches that decide a generation's fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "G: Genome"))]
pub struct FitnessEvaluator<G = EnsembleWeights> {
    pub match_config: MatchConfig,
    /// Rounds per opponent. A round is one game from each seat.
    pub rounds: u32,
    pub references: Vec<G>,
    pub baselines: Vec<Baseline>,
    /// Credit for a win against a reference or a baseline.
    pub reference_win_bonus: f64,
    /// Peers each individual plays, capped at the population size minus one.
    pub peer_opponents: usize,
    /// Worker threads. `None` uses the available parallelism.
    pub workers: Option<usize>,
}

impl<G: Genome> Default for FitnessEvaluator<G> {
    fn default() -> Self {
        Self {
            match_config: MatchConfig::default(),
            rounds: 3,
            references: G::default_references(),
            baselines: G::default_baselines(),
            reference_win_bonus: 1.5,
            peer_opponents: 3,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Opponent<G> {
    Reference(G),
    Peer(G),
    Baseline(Baseline),
}

impl<G: Genome> Opponent<G> {
    /// Whether a win earns the reference bonus.
    fn is_fixed(&self) -> bool {
        !matches!(self, Self::Peer(_))
    }

    fn agent<S: GameState>(&self, seed: u64) -> Box<dyn Agent<S>> {
        match self {
            Self::Reference(genome) => genome.agent(format!("Reference {genome}"), seed),
            Self::Peer(genome) => genome.agent(format!("Peer {genome}"), seed),
            Self::Baseline(baseline) => baseline.agent(seed),
        }
    }
}

impl<G: Genome> fmt::Display for Opponent<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference(genome) | Self::Peer(genome) => fmt::Display::fmt(genome, f),
            Self::Baseline(baseline) => baseline.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MatchJob<G> {
    individual: usize,
    weights: G,
    opponent: Opponent<G>,
    seat: Seat,
    seed: u64,
}

impl<G: Genome> FitnessEvaluator<G> {
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, NonZero::get))
            .max(1)
    }

    /// Clears every individual's record, plays the generation's games and credits the
    /// results.
    ///
    /// Returns the tally summed over all individuals. Fitness order is left untouched;
    /// call [`Population::sort_by_fitness`] afterwards.
    pub fn evaluate<S, R>(&self, population: &mut Population<G>, rng: &mut R) -> Tally
    where
        S: GameState,
        R: Rng + ?Sized,
    {
        for ind in population.individuals_mut() {
            ind.clear_record();
        }
        let jobs = self.plan(population, rng);
        let outcomes = self.run_jobs::<S>(&jobs);

        let mut per_individual = vec![Tally::default(); population.len()];
        for (job, outcome) in jobs.iter().zip(&outcomes) {
            let Some(outcome) = outcome else {
                continue;
            };
            let credit = if job.opponent.is_fixed() {
                self.reference_win_bonus
            } else {
                1.0
            };
            per_individual[job.individual].record(outcome, job.seat, credit);
        }

        let mut total = Tally::default();
        for (ind, tally) in population.individuals_mut().iter_mut().zip(&per_individual) {
            ind.record(tally);
            total += tally;
        }
        total
    }

    fn plan<R>(&self, population: &Population<G>, rng: &mut R) -> Vec<MatchJob<G>>
    where
        R: Rng + ?Sized,
    {
        let individuals = population.individuals();
        let peers = self
            .peer_opponents
            .min(individuals.len().saturating_sub(1));
        let mut jobs = vec![];
        for (index, ind) in individuals.iter().enumerate() {
            let weights = *ind.weights();
            let others = (0..individuals.len())
                .filter(|&j| j != index)
                .collect::<Vec<_>>();
            let opponents = self
                .references
                .iter()
                .map(|&g| Opponent::Reference(g))
                .chain(self.baselines.iter().map(|&b| Opponent::Baseline(b)))
                .chain(
                    others
                        .choose_multiple(rng, peers)
                        .map(|&j| Opponent::Peer(*individuals[j].weights())),
                )
                .collect::<Vec<_>>();
            for opponent in opponents {
                for _ in 0..self.rounds {
                    for seat in [Seat::A, Seat::B] {
                        jobs.push(MatchJob {
                            individual: index,
                            weights,
                            opponent,
                            seat,
                            seed: rng.random(),
                        });
                    }
                }
            }
        }
        jobs
    }

    /// Plays `jobs` on scoped workers. `None` marks a job whose worker died.
    fn run_jobs<S>(&self, jobs: &[MatchJob<G>]) -> Vec<Option<MatchOutcome>>
    where
        S: GameState,
    {
        if jobs.is_empty() {
            return vec![];
        }
        let runner = MatchRunner::new(self.match_config.clone());
        let chunk_size = jobs.len().div_ceil(self.worker_count());
        let runner = &runner;
        thread::scope(|s| {
            let handles = jobs
                .chunks(chunk_size)
                .map(|chunk| {
                    s.spawn(move || {
                        chunk
                            .iter()
                            .map(|job| play_job::<S, G>(runner, job))
                            .collect::<Vec<_>>()
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .zip(jobs.chunks(chunk_size))
                .flat_map(|(handle, chunk)| match handle.join() {
                    Ok(outcomes) => outcomes.into_iter().map(Some).collect::<Vec<_>>(),
                    Err(_) => {
                        tracing::error!(games = chunk.len(), "evaluation worker panicked");
                        vec![None; chunk.len()]
                    }
                })
                .collect()
        })
    }
}

fn play_job<S, G>(runner: &MatchRunner, job: &MatchJob<G>) -> MatchOutcome
where
    S: GameState,
    G: Genome,
{
    let mut me = job
        .weights
        .agent::<S>(format!("{} {}", G::KIND, job.weights), job.seed);
    let mut opponent = job.opponent.agent::<S>(job.seed.rotate_left(32));
    let outcome = match job.seat {
        Seat::A => runner.play::<S>(me.as_mut(), opponent.as_mut()),
        Seat::B => runner.play::<S>(opponent.as_mut(), me.as_mut()),
    };
    match outcome.result {
        MatchResult::Timeout => {
            tracing::debug!(weights = %job.weights, opponent = %job.opponent, "match timed out");
        }
        MatchResult::Error => {
            tracing::warn!(weights = %job.weights, opponent = %job.opponent, "match failed");
        }
        MatchResult::Winner(_) | MatchResult::Draw => {}
    }
    outcome
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;
    use trike_ai::strategic::StrategyWeights;
    use trike_engine::TrikeState;

    use super::*;

    fn small_evaluator() -> FitnessEvaluator {
        FitnessEvaluator {
            match_config: MatchConfig {
                board_size: 4,
                ..MatchConfig::default()
            },
            rounds: 1,
            workers: Some(2),
            ..FitnessEvaluator::default()
        }
    }

    #[test]
    fn test_plan_counts_games() {
        let mut rng = Pcg32::seed_from_u64(0);
        let population: Population = Population::random(5, &mut rng);
        let evaluator = FitnessEvaluator {
            rounds: 2,
            ..FitnessEvaluator::default()
        };
        let jobs = evaluator.plan(&population, &mut rng);
        // (1 reference + 3 peers) x 2 rounds x 2 seats
        assert_eq!(jobs.len(), 5 * 4 * 2 * 2);
        let reference_games = jobs.iter().filter(|j| j.opponent.is_fixed()).count();
        assert_eq!(reference_games, 5 * 2 * 2);
    }

    #[test]
    fn test_peer_count_capped_by_population() {
        let mut rng = Pcg32::seed_from_u64(1);
        let population: Population = Population::random(2, &mut rng);
        let evaluator = FitnessEvaluator {
            rounds: 1,
            ..FitnessEvaluator::default()
        };
        let jobs = evaluator.plan(&population, &mut rng);
        assert_eq!(jobs.len(), 2 * 2 * 2);
    }

    #[test]
    fn test_evaluate_records_games() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut population: Population = Population::random(3, &mut rng);
        let evaluator = small_evaluator();
        let total = evaluator.evaluate::<TrikeState, _>(&mut population, &mut rng);
        assert_eq!(total.games, 3 * 3 * 2);
        assert_eq!(
            total.wins + total.draws + total.timeouts + total.errors + total.losses(),
            total.games
        );
        assert_eq!(total.errors, 0);
        for ind in population.individuals() {
            assert_eq!(ind.games_played(), 6);
            assert!((0.0..=1.0).contains(&ind.fitness()));
        }
    }

    #[test]
    fn test_seeded_evaluation_is_reproducible() {
        let evaluator = small_evaluator();
        let run = |workers| {
            let mut rng = Pcg32::seed_from_u64(3);
            let mut population: Population = Population::random(3, &mut rng);
            let evaluator = FitnessEvaluator {
                workers: Some(workers),
                ..evaluator.clone()
            };
            evaluator.evaluate::<TrikeState, _>(&mut population, &mut rng);
            population
        };
        assert_eq!(run(1), run(3));
    }

    #[test]
    fn test_timeouts_earn_nothing() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut population: Population = Population::random(2, &mut rng);
        let evaluator = FitnessEvaluator {
            match_config: MatchConfig {
                board_size: 4,
                max_turns: Some(1),
                ..MatchConfig::default()
            },
            ..small_evaluator()
        };
        let total = evaluator.evaluate::<TrikeState, _>(&mut population, &mut rng);
        assert_eq!(total.timeouts, total.games);
        for ind in population.individuals() {
            assert!(ind.games_played() > 0);
            assert_eq!(ind.fitness(), 0.0);
        }
    }

    #[test]
    fn test_strategy_genomes_meet_baselines() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut population: Population<StrategyWeights> = Population::random(3, &mut rng);
        let evaluator: FitnessEvaluator<StrategyWeights> = FitnessEvaluator {
            match_config: MatchConfig {
                board_size: 4,
                ..MatchConfig::default()
            },
            rounds: 1,
            peer_opponents: 1,
            workers: Some(2),
            ..FitnessEvaluator::default()
        };
        assert!(evaluator.references.is_empty());
        assert_eq!(evaluator.baselines.len(), 2);

        let jobs = evaluator.plan(&population, &mut rng);
        // (2 baselines + 1 peer) x 1 round x 2 seats
        assert_eq!(jobs.len(), 3 * 3 * 2);
        let baseline_games = jobs
            .iter()
            .filter(|j| matches!(j.opponent, Opponent::Baseline(_)))
            .count();
        assert_eq!(baseline_games, 3 * 2 * 2);

        let total = evaluator.evaluate::<TrikeState, _>(&mut population, &mut rng);
        assert_eq!(total.games, 3 * 3 * 2);
        assert_eq!(total.errors, 0);
        for ind in population.individuals() {
            assert_eq!(ind.games_played(), 6);
        }
    }
}
