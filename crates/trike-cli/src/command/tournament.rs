use std::path::PathBuf;

use rand::{Rng as _, SeedableRng as _, rngs::StdRng};
use trike_ai::arena::{MatchConfig, MatchRunner};
use trike_engine::TrikeState;
use trike_training::tournament::Tournament;

use crate::{agent_spec::AgentSpec, util};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TournamentArg {
    /// Entrants, e.g. `random minimax:3 mcts:500 ensemble:50-40-10 learned:models/Learner.json`
    #[arg(required = true, num_args = 2..)]
    agents: Vec<AgentSpec>,
    /// Games per pairing; the first seat alternates
    #[arg(long, default_value_t = 10)]
    rounds: u32,
    #[arg(long, default_value_t = 7)]
    board_size: u8,
    #[arg(long)]
    pie_rule: bool,
    #[arg(long)]
    seed: Option<u64>,
    /// Write the standings and match log as JSON; `-` writes to stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &TournamentArg) -> anyhow::Result<()> {
    let mut rng = match arg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut agents = arg
        .agents
        .iter()
        .map(|spec| spec.build(arg.board_size, rng.random()))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let runner = MatchRunner::new(MatchConfig {
        board_size: arg.board_size,
        pie_rule: arg.pie_rule,
        ..MatchConfig::default()
    });
    let report = Tournament::new(runner, arg.rounds).run::<TrikeState>(&mut agents);

    eprintln!("Standings:");
    for (rank, standing) in report.standings.iter().enumerate() {
        eprintln!("  {:2}. {:<32} {:4} wins", rank + 1, standing.name, standing.wins);
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
