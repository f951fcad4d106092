//! The generation loop.
//!
//! [`EvolutionaryOptimizer::run`] ties the pieces together: it evaluates a population with
//! [`FitnessEvaluator`], records the generation, adds the best individual to the Hall of
//! Fame and breeds the next population with [`PopulationEvolver`]. After the final
//! generation the best Hall-of-Fame member is offered to the leaderboard.
//!
//! Store failures never abort a run. A failed snapshot is logged and, since every snapshot
//! holds the complete run, the next generation's save retries it.

use chrono::{DateTime, Utc};
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use trike_ai::EnsembleWeights;
use trike_engine::GameState;

use crate::{
    evaluation::{FitnessEvaluator, Tally},
    genetic::{Individual, Population, PopulationEvolver},
    genome::Genome,
    stats::FitnessStats,
    store::{self, LeaderboardEntry, LeaderboardStore, RunStore},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "G: Genome"))]
pub struct EvolutionConfig<G = EnsembleWeights> {
    pub population_size: usize,
    pub generations: usize,
    /// Seed of the run's generator. `None` draws one from the thread generator.
    pub seed: Option<u64>,
    pub evaluator: FitnessEvaluator<G>,
    pub evolver: PopulationEvolver<G>,
}

impl<G: Genome> Default for EvolutionConfig<G> {
    fn default() -> Self {
        Self {
            population_size: 10,
            generations: 5,
            seed: None,
            evaluator: FitnessEvaluator::default(),
            evolver: PopulationEvolver::default(),
        }
    }
}

/// What happened in one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord<G = EnsembleWeights> {
    pub generation: usize,
    pub fitness: FitnessStats,
    pub best: Individual<G>,
    /// Every individual, sorted by fitness descending.
    pub population: Vec<Individual<G>>,
    /// Games summed over the generation.
    pub tally: Tally,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallOfFameEntry<G = EnsembleWeights> {
    pub generation: usize,
    pub individual: Individual<G>,
}

/// A run in progress or finished, as persisted by a [`RunStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "G: Genome"))]
pub struct EvolutionRun<G = EnsembleWeights> {
    pub started_at: DateTime<Utc>,
    /// Which genome was evolved, e.g. `ensemble`.
    #[serde(default)]
    pub genome: String,
    pub config: EvolutionConfig<G>,
    /// Best individual of each generation, in generation order.
    pub hall_of_fame: Vec<HallOfFameEntry<G>>,
    pub generations: Vec<GenerationRecord<G>>,
}

impl<G: Genome> EvolutionRun<G> {
    /// Hall-of-Fame member with the highest fitness. The earliest wins ties.
    #[must_use]
    pub fn best(&self) -> Option<&HallOfFameEntry<G>> {
        self.hall_of_fame.iter().reduce(|best, entry| {
            if entry.individual.fitness() > best.individual.fitness() {
                entry
            } else {
                best
            }
        })
    }
}

#[derive(Debug, Clone)]
pub struct EvolutionaryOptimizer<G = EnsembleWeights> {
    config: EvolutionConfig<G>,
}

impl<G: Genome> Default for EvolutionaryOptimizer<G> {
    fn default() -> Self {
        Self::new(EvolutionConfig::default())
    }
}

impl<G: Genome> EvolutionaryOptimizer<G> {
    #[must_use]
    pub fn new(config: EvolutionConfig<G>) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &EvolutionConfig<G> {
        &self.config
    }

    /// Runs every generation on the game `S`.
    ///
    /// The returned run is also what `runs` last received.
    pub fn run<S>(
        &self,
        runs: &mut dyn RunStore<G>,
        leaderboard: &mut dyn LeaderboardStore<G>,
    ) -> EvolutionRun<G>
    where
        S: GameState,
    {
        let config = &self.config;
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut run = EvolutionRun {
            started_at: Utc::now(),
            genome: G::KIND.to_owned(),
            config: EvolutionConfig {
                seed: Some(seed),
                ..config.clone()
            },
            hall_of_fame: vec![],
            generations: vec![],
        };

        tracing::info!(
            genome = G::KIND,
            population = config.population_size,
            generations = config.generations,
            board_size = config.evaluator.match_config.board_size,
            rounds = config.evaluator.rounds,
            seed,
            "starting evolution"
        );

        let mut population = Population::random(config.population_size, &mut rng);
        for generation in 0..config.generations {
            let tally = config
                .evaluator
                .evaluate::<S, _>(&mut population, &mut rng);
            population.sort_by_fitness();

            let (Some(best), Some(fitness)) = (population.best(), population.fitness_stats())
            else {
                tracing::warn!("population is empty, stopping");
                break;
            };

            tracing::info!(
                generation,
                best = %best.weights(),
                best_fitness = fitness.max,
                mean_fitness = fitness.mean,
                min_fitness = fitness.min,
                std_dev = fitness.std_dev,
                games = tally.games,
                timeouts = tally.timeouts,
                errors = tally.errors,
                "generation evaluated"
            );
            for (i, ind) in population.individuals().iter().enumerate() {
                tracing::debug!(
                    generation,
                    rank = i,
                    weights = %ind.weights(),
                    fitness = ind.fitness(),
                    games = ind.games_played()
                );
            }

            run.hall_of_fame.push(HallOfFameEntry {
                generation,
                individual: best.clone(),
            });
            run.generations.push(GenerationRecord {
                generation,
                fitness,
                best: best.clone(),
                population: population.individuals().to_vec(),
                tally,
            });
            if let Err(e) = runs.save_run(&run) {
                tracing::warn!(error = %e, generation, "failed to save run, retrying next generation");
            }

            if generation + 1 < config.generations {
                population = config.evolver.evolve(&population, &mut rng);
            }
        }

        if let Some(best) = run.best() {
            tracing::info!(
                weights = %best.individual.weights(),
                fitness = best.individual.fitness(),
                generation = best.generation,
                "evolution finished"
            );
            update_leaderboard(leaderboard, best);
        }
        run
    }
}

fn update_leaderboard<G: Genome>(
    leaderboard: &mut dyn LeaderboardStore<G>,
    best: &HallOfFameEntry<G>,
) {
    let mut entries = leaderboard.load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load leaderboard, starting a new one");
        vec![]
    });
    store::insert_entry(
        &mut entries,
        LeaderboardEntry::evolved(
            *best.individual.weights(),
            best.individual.fitness(),
            best.generation,
        ),
    );
    if let Err(e) = leaderboard.save(&entries) {
        tracing::warn!(error = %e, "failed to save leaderboard");
    }
}

#[cfg(test)]
mod tests {
    use trike_ai::{arena::MatchConfig, strategic::StrategyWeights};
    use trike_engine::TrikeState;

    use super::*;
    use crate::store::{InMemoryLeaderboardStore, InMemoryRunStore, StoreError};

    fn small_config<G: Genome>(seed: u64) -> EvolutionConfig<G> {
        EvolutionConfig {
            population_size: 4,
            generations: 2,
            seed: Some(seed),
            evaluator: FitnessEvaluator {
                match_config: MatchConfig {
                    board_size: 4,
                    ..MatchConfig::default()
                },
                rounds: 1,
                workers: Some(2),
                ..FitnessEvaluator::default()
            },
            evolver: PopulationEvolver::default(),
        }
    }

    #[test]
    fn test_two_generations_fill_hall_of_fame() {
        let optimizer: EvolutionaryOptimizer = EvolutionaryOptimizer::new(small_config(0));
        let mut runs = InMemoryRunStore::new();
        let mut leaderboard = InMemoryLeaderboardStore::new();
        let run = optimizer.run::<TrikeState>(&mut runs, &mut leaderboard);

        assert_eq!(run.hall_of_fame.len(), 2);
        assert_eq!(run.generations.len(), 2);
        for entry in &run.hall_of_fame {
            assert!((0.0..=1.0).contains(&entry.individual.fitness()));
            assert!(entry.individual.games_played() > 0);
        }
        for record in &run.generations {
            assert_eq!(record.population.len(), 4);
            assert_eq!(record.best, record.population[0]);
            assert!(record.fitness.max <= 1.0);
        }

        assert_eq!(runs.snapshots().len(), 2);
        assert_eq!(runs.latest(), Some(&run));
        assert_eq!(leaderboard.entries().len(), 1);
        let best = run.best().unwrap();
        assert_eq!(leaderboard.entries()[0].weights, *best.individual.weights());
    }

    #[test]
    fn test_seeded_runs_match() {
        let optimizer: EvolutionaryOptimizer = EvolutionaryOptimizer::new(small_config(11));
        let run = |optimizer: &EvolutionaryOptimizer| {
            let mut runs = InMemoryRunStore::new();
            let mut leaderboard = InMemoryLeaderboardStore::new();
            optimizer.run::<TrikeState>(&mut runs, &mut leaderboard)
        };
        let a = run(&optimizer);
        let b = run(&optimizer);
        assert_eq!(a.hall_of_fame, b.hall_of_fame);
        assert_eq!(a.generations, b.generations);
    }

    #[test]
    fn test_leaderboard_keeps_top_five() {
        let mut leaderboard: InMemoryLeaderboardStore = InMemoryLeaderboardStore::new();
        for seed in 0..7 {
            let optimizer = EvolutionaryOptimizer::new(EvolutionConfig {
                generations: 1,
                ..small_config(seed)
            });
            optimizer.run::<TrikeState>(&mut InMemoryRunStore::new(), &mut leaderboard);
        }
        let entries = leaderboard.entries();
        assert_eq!(entries.len(), 5);
        assert!(entries.is_sorted_by(|a, b| a.fitness >= b.fitness));
    }

    struct FailingRunStore {
        attempts: usize,
    }

    impl RunStore for FailingRunStore {
        fn save_run(&mut self, _run: &EvolutionRun) -> Result<(), StoreError> {
            self.attempts += 1;
            Err(StoreError::Io {
                path: "unwritable".into(),
                source: std::io::Error::other("disk full"),
            })
        }
    }

    #[test]
    fn test_store_failure_does_not_abort() {
        let optimizer: EvolutionaryOptimizer = EvolutionaryOptimizer::new(small_config(3));
        let mut runs = FailingRunStore { attempts: 0 };
        let run = optimizer.run::<TrikeState>(&mut runs, &mut InMemoryLeaderboardStore::new());
        assert_eq!(runs.attempts, 2);
        assert_eq!(run.hall_of_fame.len(), 2);
    }

    #[test]
    fn test_best_prefers_earliest_on_tie() {
        let mut a = Individual::new(trike_ai::EnsembleWeights::CHAMPION);
        a.record_games(2, 1.0);
        let b = a.clone();
        let run: EvolutionRun = EvolutionRun {
            started_at: Utc::now(),
            genome: "ensemble".to_owned(),
            config: EvolutionConfig::default(),
            hall_of_fame: vec![
                HallOfFameEntry {
                    generation: 0,
                    individual: a,
                },
                HallOfFameEntry {
                    generation: 1,
                    individual: b,
                },
            ],
            generations: vec![],
        };
        assert_eq!(run.best().map(|e| e.generation), Some(0));
    }

    #[test]
    fn test_strategy_run() {
        let optimizer: EvolutionaryOptimizer<StrategyWeights> =
            EvolutionaryOptimizer::new(EvolutionConfig {
                population_size: 3,
                ..small_config(5)
            });
        let mut runs = InMemoryRunStore::new();
        let mut leaderboard = InMemoryLeaderboardStore::new();
        let run = optimizer.run::<TrikeState>(&mut runs, &mut leaderboard);

        assert_eq!(run.genome, "strategic");
        assert_eq!(run.hall_of_fame.len(), 2);
        assert_eq!(run.config.evaluator.baselines.len(), 2);
        assert_eq!(leaderboard.entries().len(), 1);
        let json = serde_json::to_string(&run).unwrap();
        let back: EvolutionRun<StrategyWeights> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, run);
    }
}
