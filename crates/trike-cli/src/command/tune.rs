use std::path::PathBuf;

use trike_ai::arena::MatchConfig;
use trike_engine::TrikeState;
use trike_training::tuning::{self, Searcher, TuningConfig};

use crate::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum SearcherArg {
    /// Sweep the search depth
    Minimax,
    /// Sweep the iteration budget
    Mcts,
}

impl From<SearcherArg> for Searcher {
    fn from(arg: SearcherArg) -> Self {
        match arg {
            SearcherArg::Minimax => Self::Minimax,
            SearcherArg::Mcts => Self::Mcts,
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TuneArg {
    #[arg(value_enum)]
    searcher: SearcherArg,
    /// Candidate settings; defaults to 2,3,4 for minimax and 200,500,1000 for mcts
    #[arg(long, value_delimiter = ',')]
    values: Vec<u32>,
    #[arg(long, value_delimiter = ',', default_value = "5,7")]
    board_sizes: Vec<u8>,
    /// Games per candidate and board size against the random baseline
    #[arg(long, default_value_t = 5)]
    rounds: u32,
    #[arg(long)]
    pie_rule: bool,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Write the trials as JSON; `-` writes to stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

impl TuneArg {
    fn to_config(&self) -> TuningConfig {
        let defaults = TuningConfig::new(self.searcher.into());
        TuningConfig {
            values: if self.values.is_empty() {
                defaults.values.clone()
            } else {
                self.values.clone()
            },
            board_sizes: self.board_sizes.clone(),
            rounds: self.rounds,
            seed: self.seed,
            match_config: MatchConfig {
                pie_rule: self.pie_rule,
                ..MatchConfig::default()
            },
            ..defaults
        }
    }
}

pub(crate) fn run(arg: &TuneArg) -> anyhow::Result<()> {
    let config = arg.to_config();
    anyhow::ensure!(!config.values.is_empty(), "no candidate values");
    anyhow::ensure!(!config.board_sizes.is_empty(), "no board sizes");
    anyhow::ensure!(config.rounds > 0, "rounds must be positive");

    let report = tuning::tune::<TrikeState>(&config);

    eprintln!("Trials ({}):", report.searcher);
    for trial in &report.trials {
        eprintln!(
            "  {:>6} on size {:2}: {:3}/{} wins",
            trial.value, trial.board_size, trial.wins, trial.games
        );
    }
    match report.best {
        Some(best) => eprintln!(
            "Best: {} {} ({} of {} wins on size {})",
            report.searcher, best.value, best.wins, best.games, best.board_size
        ),
        None => eprintln!("No setting won a game"),
    }
    if let Some(output) = &arg.output {
        let path = util::output_path(output);
        util::save_json(&report, path)?;
        if let Some(path) = path {
            eprintln!("Report saved to {}", path.display());
        }
    }
    Ok(())
}
