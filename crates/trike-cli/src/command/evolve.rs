use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context as _;
use trike_ai::{EnsembleWeights, arena::MatchConfig, strategic::StrategyWeights};
use trike_engine::TrikeState;
use trike_training::{
    evaluation::FitnessEvaluator,
    evolution::{EvolutionConfig, EvolutionaryOptimizer},
    genome::{Baseline, Genome},
    genetic::PopulationEvolver,
    store::{JsonLeaderboardStore, JsonRunStore},
    weights::{CrossoverKind, MutationKind},
};

use crate::util;

/// Parameter vector being evolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum GenomeKind {
    /// Strategy shares of the ensemble agent
    Ensemble,
    /// Feature weights of the strategic agent
    Strategic,
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct EvolveArg {
    #[arg(long, value_enum, default_value_t = GenomeKind::Ensemble)]
    genome: GenomeKind,
    /// Read the whole configuration from a JSON file instead of the options below
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 10)]
    population: usize,
    #[arg(long, default_value_t = 5)]
    generations: usize,
    #[arg(long, default_value_t = 7)]
    board_size: u8,
    /// Rounds per opponent; each round is one game from each seat
    #[arg(long, default_value_t = 3)]
    rounds: u32,
    /// Genome every individual plays against, in the genome's own text form.
    /// Ensemble runs default to 50-40-10, strategic runs to none
    #[arg(long = "reference")]
    references: Vec<String>,
    /// Fixed opponent, `random` or `minimax-DEPTH`.
    /// Strategic runs default to random and minimax-2, ensemble runs to none
    #[arg(long = "baseline", conflicts_with = "no_baselines")]
    baselines: Vec<Baseline>,
    /// Play no fixed opponents at all
    #[arg(long)]
    no_baselines: bool,
    /// Credit for a win against a reference or a baseline
    #[arg(long, default_value_t = 1.5)]
    reference_bonus: f64,
    /// Population peers each individual plays
    #[arg(long, default_value_t = 3)]
    peers: usize,
    #[arg(long, default_value_t = 0)]
    elite_count: usize,
    #[arg(long, default_value_t = 3)]
    tournament_size: usize,
    #[arg(long, default_value_t = 0.7)]
    crossover_rate: f64,
    /// `SinglePoint` or `Blend`
    #[arg(long, default_value = "SinglePoint")]
    crossover: CrossoverKind,
    #[arg(long, default_value_t = 0.2)]
    mutation_rate: f64,
    #[arg(long, default_value_t = 15)]
    mutation_amount: u32,
    /// `Uniform` or `Gaussian`
    #[arg(long, default_value = "Uniform")]
    mutation: MutationKind,
    /// Grow the mutation amount with the distance from the first reference
    #[arg(long)]
    adaptive_mutation: bool,
    /// Move cap per game; defaults to one more than the number of cells
    #[arg(long)]
    max_turns: Option<usize>,
    /// Wall-clock limit per game in milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,
    #[arg(long)]
    pie_rule: bool,
    /// Worker threads; defaults to the available parallelism
    #[arg(long)]
    workers: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Directory for the per-run results file
    #[arg(long, default_value = "evolution_results")]
    output_dir: PathBuf,
    /// Leaderboard of the best genomes across runs; defaults to
    /// `evolved_players.json` for ensemble runs and `evolved_strategies.json` for
    /// strategic ones
    #[arg(long)]
    leaderboard: Option<PathBuf>,
}

impl EvolveArg {
    fn leaderboard_path(&self) -> PathBuf {
        self.leaderboard.clone().unwrap_or_else(|| match self.genome {
            GenomeKind::Ensemble => "evolved_players.json".into(),
            GenomeKind::Strategic => "evolved_strategies.json".into(),
        })
    }

    fn resolve_references<G>(&self) -> anyhow::Result<Vec<G>>
    where
        G: Genome + FromStr,
        G::Err: std::error::Error + Send + Sync + 'static,
    {
        if self.references.is_empty() {
            return Ok(G::default_references());
        }
        self.references
            .iter()
            .map(|r| {
                r.parse()
                    .with_context(|| format!("Invalid {} reference: {r}", G::KIND))
            })
            .collect()
    }

    fn resolve_baselines<G: Genome>(&self) -> Vec<Baseline> {
        if self.no_baselines {
            vec![]
        } else if self.baselines.is_empty() {
            G::default_baselines()
        } else {
            self.baselines.clone()
        }
    }

    fn to_config<G>(&self) -> anyhow::Result<EvolutionConfig<G>>
    where
        G: Genome + FromStr,
        G::Err: std::error::Error + Send + Sync + 'static,
    {
        let references = self.resolve_references::<G>()?;
        Ok(EvolutionConfig {
            population_size: self.population,
            generations: self.generations,
            seed: self.seed,
            evaluator: FitnessEvaluator {
                match_config: MatchConfig {
                    board_size: self.board_size,
                    max_turns: self.max_turns,
                    time_limit: self.time_limit_ms.map(Duration::from_millis),
                    pie_rule: self.pie_rule,
                },
                rounds: self.rounds,
                baselines: self.resolve_baselines::<G>(),
                references: references.clone(),
                reference_win_bonus: self.reference_bonus,
                peer_opponents: self.peers,
                workers: self.workers,
            },
            evolver: PopulationEvolver {
                elite_count: self.elite_count,
                tournament_size: self.tournament_size,
                crossover_rate: self.crossover_rate,
                crossover: self.crossover,
                mutation_rate: self.mutation_rate,
                mutation_amount: self.mutation_amount,
                mutation: self.mutation,
                adaptive_reference: references
                    .first()
                    .copied()
                    .filter(|_| self.adaptive_mutation),
            },
        })
    }
}

pub(crate) fn run(arg: &EvolveArg) -> anyhow::Result<()> {
    match arg.genome {
        GenomeKind::Ensemble => evolve::<EnsembleWeights>(arg),
        GenomeKind::Strategic => evolve::<StrategyWeights>(arg),
    }
}

fn evolve<G>(arg: &EvolveArg) -> anyhow::Result<()>
where
    G: Genome + FromStr,
    G::Err: std::error::Error + Send + Sync + 'static,
{
    let config: EvolutionConfig<G> = match &arg.config {
        Some(path) => util::read_json_file("evolution config", path)?,
        None => arg.to_config()?,
    };
    anyhow::ensure!(config.population_size > 0, "population must not be empty");
    anyhow::ensure!(
        config.evolver.tournament_size > 0,
        "tournament size must be positive"
    );

    let mut runs = JsonRunStore::new(&arg.output_dir);
    let mut leaderboard = JsonLeaderboardStore::<G>::new(arg.leaderboard_path());
    let optimizer = EvolutionaryOptimizer::new(config);
    let run = optimizer.run::<TrikeState>(&mut runs, &mut leaderboard);

    eprintln!("Hall of Fame:");
    for entry in &run.hall_of_fame {
        eprintln!(
            "  Gen {:2}: {} => {:.3}",
            entry.generation,
            entry.individual.weights(),
            entry.individual.fitness()
        );
    }
    if let Some(best) = run.best() {
        eprintln!();
        eprintln!(
            "Best {} genome: {} (fitness {:.3}, generation {})",
            G::KIND,
            best.individual.weights(),
            best.individual.fitness(),
            best.generation
        );
    }
    eprintln!("  Results: {}", runs.path_for(&run).display());
    eprintln!("  Leaderboard: {}", leaderboard.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        arg: EvolveArg,
    }

    fn parse(args: &[&str]) -> EvolveArg {
        Cli::try_parse_from(std::iter::once("evolve").chain(args.iter().copied()))
            .unwrap()
            .arg
    }

    #[test]
    fn test_ensemble_defaults() {
        let arg = parse(&[]);
        assert_eq!(arg.genome, GenomeKind::Ensemble);
        assert_eq!(arg.leaderboard_path(), PathBuf::from("evolved_players.json"));
        let config = arg.to_config::<EnsembleWeights>().unwrap();
        assert_eq!(config.evaluator.references, [EnsembleWeights::CHAMPION]);
        assert!(config.evaluator.baselines.is_empty());
        assert_eq!(config.evolver.adaptive_reference, None);
    }

    #[test]
    fn test_strategic_defaults() {
        let arg = parse(&["--genome", "strategic"]);
        assert_eq!(arg.genome, GenomeKind::Strategic);
        assert_eq!(
            arg.leaderboard_path(),
            PathBuf::from("evolved_strategies.json")
        );
        let config = arg.to_config::<StrategyWeights>().unwrap();
        assert!(config.evaluator.references.is_empty());
        assert_eq!(
            config.evaluator.baselines,
            [Baseline::Random, Baseline::Minimax { depth: 2 }]
        );
    }

    #[test]
    fn test_explicit_opponents() {
        let arg = parse(&[
            "--reference",
            "20-30-50",
            "--baseline",
            "minimax-3",
            "--adaptive-mutation",
        ]);
        let config = arg.to_config::<EnsembleWeights>().unwrap();
        let reference = EnsembleWeights::normalized([20, 30, 50]);
        assert_eq!(config.evaluator.references, [reference]);
        assert_eq!(config.evaluator.baselines, [Baseline::Minimax { depth: 3 }]);
        assert_eq!(config.evolver.adaptive_reference, Some(reference));

        let arg = parse(&["--genome", "strategic", "--no-baselines"]);
        assert!(arg.to_config::<StrategyWeights>().unwrap().evaluator.baselines.is_empty());
    }

    #[test]
    fn test_reference_must_match_genome() {
        let arg = parse(&["--genome", "strategic", "--reference", "50-40-10"]);
        assert!(arg.to_config::<StrategyWeights>().is_err());
        assert!(Cli::try_parse_from(["evolve", "--baseline", "alphazero"]).is_err());
    }
}
