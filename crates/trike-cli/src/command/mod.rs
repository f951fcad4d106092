use clap::{Parser, Subcommand};

use self::{
    evolve::EvolveArg, play::PlayArg, tournament::TournamentArg,
    train_learner::TrainLearnerArg, tune::TuneArg,
};

mod evolve;
mod play;
mod tournament;
mod train_learner;
mod tune;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Search for ensemble or strategic weights with a genetic algorithm
    Evolve(#[clap(flatten)] EvolveArg),
    /// Train a learned agent by self-play
    TrainLearner(#[clap(flatten)] TrainLearnerArg),
    /// Play a round-robin tournament between agents
    Tournament(#[clap(flatten)] TournamentArg),
    /// Play one game between two agents, move by move
    Play(#[clap(flatten)] PlayArg),
    /// Sweep a search agent's depth or iteration budget against a random baseline
    Tune(#[clap(flatten)] TuneArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Evolve(arg) => evolve::run(&arg)?,
        Mode::TrainLearner(arg) => train_learner::run(&arg)?,
        Mode::Tournament(arg) => tournament::run(&arg)?,
        Mode::Play(arg) => play::run(&arg)?,
        Mode::Tune(arg) => tune::run(&arg)?,
    }
    Ok(())
}
