use std::path::PathBuf;

use anyhow::Context as _;
use trike_ai::{LearnedAgent, learned::LearnerConfig};
use trike_engine::TrikeState;
use trike_training::self_play::{SelfPlayConfig, SelfPlayTrainer};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainLearnerArg {
    #[arg(long, default_value_t = 5000)]
    episodes: u32,
    #[arg(long, default_value_t = 7)]
    board_size: u8,
    /// Episodes between model saves
    #[arg(long, default_value_t = 500)]
    save_interval: u32,
    #[arg(long, default_value = "models")]
    model_dir: PathBuf,
    /// Agent name; also names the model file
    #[arg(long, default_value = "Learner")]
    name: String,
    /// Continue training a saved model
    #[arg(long)]
    resume: Option<PathBuf>,
    /// Hidden layer sizes of a new model
    #[arg(long, value_delimiter = ',', default_value = "256,128,64")]
    hidden_layers: Vec<usize>,
    #[arg(long, default_value_t = 1e-3)]
    learning_rate: f32,
    #[arg(long, default_value_t = 64)]
    batch_size: usize,
    /// Probability of facing the random agent once snapshots exist
    #[arg(long, default_value_t = 0.2)]
    random_opponent_rate: f64,
    /// Episodes between learner snapshots added to the opponent pool
    #[arg(long, default_value_t = 100)]
    snapshot_interval: u32,
    #[arg(long)]
    seed: Option<u64>,
}

pub(crate) fn run(arg: &TrainLearnerArg) -> anyhow::Result<()> {
    let learner = match &arg.resume {
        Some(path) => {
            let learner = LearnedAgent::load(path)
                .with_context(|| format!("Failed to resume from {}", path.display()))?;
            anyhow::ensure!(
                learner.board_size() == arg.board_size,
                "model {} was trained on board size {}, not {}",
                path.display(),
                learner.board_size(),
                arg.board_size
            );
            learner
        }
        None => {
            let config = LearnerConfig {
                hidden_layers: arg.hidden_layers.clone(),
                learning_rate: arg.learning_rate,
                batch_size: arg.batch_size,
                ..LearnerConfig::default()
            };
            match arg.seed {
                Some(seed) => LearnedAgent::with_seed(&arg.name, arg.board_size, config, seed),
                None => LearnedAgent::new(&arg.name, arg.board_size, config),
            }
        }
    };

    let config = SelfPlayConfig {
        episodes: arg.episodes,
        board_size: arg.board_size,
        random_opponent_rate: arg.random_opponent_rate,
        snapshot_interval: arg.snapshot_interval,
        save_interval: arg.save_interval,
        model_dir: Some(arg.model_dir.clone()),
        seed: arg.seed,
        ..SelfPlayConfig::default()
    };
    let mut trainer = SelfPlayTrainer::new(config, learner);
    let stats = trainer.run::<TrikeState>()?;
    let learner = trainer.into_learner();

    eprintln!();
    eprintln!("Self-play training complete");
    eprintln!("  Episodes: {}", stats.episodes);
    eprintln!("  Wins:       {:5} ({:.1}%)", stats.wins, stats.win_rate() * 100.0);
    eprintln!("  Losses:     {:5}", stats.losses);
    eprintln!("  Draws:      {:5}", stats.draws);
    eprintln!("  Unfinished: {:5}", stats.unfinished);
    if let Some(loss) = stats.mean_loss {
        eprintln!("  Mean loss: {loss:.4}");
    }
    eprintln!("  Epsilon: {:.3}", learner.epsilon());
    eprintln!("  Model: {}", learner.model_path(&arg.model_dir).display());
    Ok(())
}
