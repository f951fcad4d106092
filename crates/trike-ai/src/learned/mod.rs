//! Value-function learner trained online from replayed experience.
//!
//! [`LearnedAgent`] keeps two copies of a [`QNetwork`]: the online network, which picks
//! moves and receives gradient updates, and a target network that provides the
//! bootstrap values and is overwritten with the online parameters every
//! [`LearnerConfig::target_sync_interval`] training steps.
//!
//! The agent does not decide what a move is worth. Whoever drives the games hands in a
//! reward with every [`store_experience`](LearnedAgent::store_experience) call and then
//! calls [`train_step`](LearnedAgent::train_step).
//!
//! # Persistence
//!
//! [`save`](LearnedAgent::save) writes a JSON metadata file named after the agent, with
//! spaces replaced by underscores, and next to it a `.mpk` record of the online network
//! written by burn's default recorder. The target network is re-synced from the online
//! parameters on [`load`](LearnedAgent::load), and the replay buffer starts empty.

use std::{
    fmt,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use burn::{
    module::{AutodiffModule as _, Module as _},
    record::{DefaultRecorder, RecorderError},
};
use rand::{Rng as _, SeedableRng as _, seq::IndexedRandom as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use trike_engine::{Cell, GameState};

use crate::Agent;

pub use self::{encoding::*, network::*, replay_buffer::*};

mod encoding;
mod network;
mod replay_buffer;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ModelIoError {
    #[display("failed to access model file {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to read or write model JSON {}", path.display())]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("failed to read or write network record {}", path.display())]
    Record {
        path: PathBuf,
        source: RecorderError,
    },
    #[display("model file {} does not fit a board of size {board_size}", path.display())]
    Shape { path: PathBuf, board_size: u8 },
}

/// Hyperparameters of a [`LearnedAgent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    pub hidden_layers: Vec<usize>,
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_min: f32,
    pub epsilon_decay: f32,
    pub learning_rate: f32,
    pub batch_size: usize,
    pub replay_capacity: usize,
    pub target_sync_interval: u64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![256, 128, 64],
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_min: 0.01,
            epsilon_decay: 0.995,
            learning_rate: 1e-3,
            batch_size: 64,
            replay_capacity: 10_000,
            target_sync_interval: 10,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedModel {
    name: String,
    board_size: u8,
    config: LearnerConfig,
    epsilon: f32,
    games_played: u64,
}

pub struct LearnedAgent {
    name: String,
    board_size: u8,
    config: LearnerConfig,
    online: QNetwork<TrainBackend>,
    target: QNetwork<InferBackend>,
    optimizer: QOptimizer,
    buffer: ReplayBuffer,
    epsilon: f32,
    train_steps: u64,
    games_played: u64,
    rng: Pcg32,
}

impl LearnedAgent {
    #[must_use]
    pub fn new(name: impl Into<String>, board_size: u8, config: LearnerConfig) -> Self {
        Self::with_seed(name, board_size, config, rand::rng().random())
    }

    #[must_use]
    pub fn with_seed(
        name: impl Into<String>,
        board_size: u8,
        config: LearnerConfig,
        seed: u64,
    ) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let online = network_config(board_size, &config).init(&Default::default(), &mut rng);
        Self::from_parts(name.into(), board_size, config, online, rng)
    }

    fn from_parts(
        name: String,
        board_size: u8,
        config: LearnerConfig,
        online: QNetwork<TrainBackend>,
        rng: Pcg32,
    ) -> Self {
        Self {
            name,
            board_size,
            target: online.valid(),
            optimizer: adam(),
            buffer: ReplayBuffer::new(config.replay_capacity),
            epsilon: config.epsilon_start,
            train_steps: 0,
            games_played: 0,
            online,
            config,
            rng,
        }
    }

    #[must_use]
    pub fn board_size(&self) -> u8 {
        self.board_size
    }

    #[must_use]
    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    #[must_use]
    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    #[must_use]
    pub fn games_played(&self) -> u64 {
        self.games_played
    }

    #[must_use]
    pub fn train_steps(&self) -> u64 {
        self.train_steps
    }

    #[must_use]
    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    /// Whether the target network currently equals the online network.
    #[must_use]
    pub fn is_target_synced(&self) -> bool {
        self.online.valid().parameters() == self.target.parameters()
    }

    /// A copy that keeps the current parameters and plays with a fixed exploration rate.
    ///
    /// Snapshots do not share anything with the original and start with an empty buffer.
    #[must_use]
    pub fn snapshot(&self, epsilon: f32) -> Self {
        let mut snapshot = Self::from_parts(
            format!("{} (snapshot {})", self.name, self.games_played),
            self.board_size,
            self.config.clone(),
            self.online.clone(),
            Pcg32::seed_from_u64(self.rng.clone().random()),
        );
        snapshot.buffer = ReplayBuffer::new(1);
        snapshot.set_epsilon(epsilon);
        snapshot
    }

    /// Action values of the online network for `state`.
    #[must_use]
    pub fn action_values<S: GameState>(&self, state: &S) -> Vec<f32> {
        self.online.valid().predict(&encode_state(state))
    }

    /// Records the transition `state --mv--> next_state` with the caller's `reward`.
    ///
    /// Transitions from a board of a different size, or with a move outside the action
    /// grid, are ignored.
    pub fn store_experience<S: GameState>(
        &mut self,
        state: &S,
        mv: Cell,
        reward: f32,
        next_state: &S,
    ) {
        if state.board_size() != self.board_size || next_state.board_size() != self.board_size {
            tracing::warn!(agent = %self.name, "ignoring experience from a different board size");
            return;
        }
        let Some(action) = action_index(self.board_size, mv) else {
            return;
        };
        self.buffer.push(Experience {
            state: encode_state(state),
            action,
            reward,
            next_state: encode_state(next_state),
            terminal: next_state.is_terminal(),
        });
    }

    /// One minibatch update of the online network.
    ///
    /// Returns the loss, or `None` while the buffer holds fewer experiences than one
    /// batch.
    pub fn train_step(&mut self) -> Option<f32> {
        let batch_size = self.config.batch_size;
        if batch_size == 0 || self.buffer.len() < batch_size {
            return None;
        }
        let actions_len = action_count(self.board_size);
        let batch = self.buffer.sample(&mut self.rng, batch_size);

        let states = batch.iter().flat_map(|e| e.state.iter().copied()).collect();
        let next_states = batch
            .iter()
            .flat_map(|e| e.next_state.iter().copied())
            .collect();
        let next_values = self.target.predict_rows(next_states, batch_size);

        let actions = batch.iter().map(|e| e.action).collect::<Vec<_>>();
        let targets = batch
            .iter()
            .zip(next_values.chunks(actions_len))
            .map(|(e, row)| {
                if e.terminal {
                    e.reward
                } else {
                    let best = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                    e.reward + self.config.gamma * best
                }
            })
            .collect::<Vec<_>>();

        let (online, loss) = fit_actions(
            self.online.clone(),
            &mut self.optimizer,
            f64::from(self.config.learning_rate),
            states,
            &actions,
            &targets,
        );
        self.online = online;

        self.train_steps += 1;
        if self.config.target_sync_interval > 0
            && self.train_steps % self.config.target_sync_interval == 0
        {
            self.target = self.online.valid();
        }
        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
        Some(loss)
    }

    /// Path of this agent's model metadata inside `dir`.
    #[must_use]
    pub fn model_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.json", self.name.replace(' ', "_")))
    }

    /// Writes the metadata to [`model_path`](Self::model_path) in `dir` and the online
    /// parameters to the [`weights_path`] beside it.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ModelIoError> {
        let path = self.model_path(dir);
        let io_err = |source| ModelIoError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(dir).map_err(io_err)?;
        let file = File::create(&path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        let saved = SavedModel {
            name: self.name.clone(),
            board_size: self.board_size,
            config: self.config.clone(),
            epsilon: self.epsilon,
            games_played: self.games_played,
        };
        serde_json::to_writer_pretty(&mut writer, &saved).map_err(|source| {
            ModelIoError::Format {
                path: path.clone(),
                source,
            }
        })?;
        writer.flush().map_err(io_err)?;

        let weights = weights_path(&path);
        self.online
            .valid()
            .save_file(weights.clone(), &DefaultRecorder::default())
            .map_err(|source| ModelIoError::Record {
                path: weights,
                source,
            })?;
        Ok(path)
    }

    /// Reads a model written by [`save`](Self::save). The target network starts as a
    /// copy of the loaded parameters.
    pub fn load(path: &Path) -> Result<Self, ModelIoError> {
        let file = File::open(path).map_err(|source| ModelIoError::Io {
            path: path.to_owned(),
            source,
        })?;
        let saved: SavedModel =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| {
                ModelIoError::Format {
                    path: path.to_owned(),
                    source,
                }
            })?;
        let weights = weights_path(path);
        let device = Default::default();
        let online = network_config(saved.board_size, &saved.config)
            .init::<TrainBackend, _>(&device, &mut rand::rng())
            .load_file(weights.clone(), &DefaultRecorder::default(), &device)
            .map_err(|source| ModelIoError::Record {
                path: weights,
                source,
            })?;
        if online.input_len() != state_len(saved.board_size)
            || online.output_len() != action_count(saved.board_size)
        {
            return Err(ModelIoError::Shape {
                path: path.to_owned(),
                board_size: saved.board_size,
            });
        }
        let mut agent = Self::from_parts(
            saved.name,
            saved.board_size,
            saved.config,
            online,
            Pcg32::seed_from_u64(rand::rng().random()),
        );
        agent.epsilon = saved.epsilon;
        agent.games_played = saved.games_played;
        Ok(agent)
    }

    fn random_move(&mut self, moves: &[Cell]) -> Option<Cell> {
        moves.choose(&mut self.rng).copied()
    }
}

impl fmt::Debug for LearnedAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LearnedAgent")
            .field("name", &self.name)
            .field("board_size", &self.board_size)
            .field("config", &self.config)
            .field("epsilon", &self.epsilon)
            .field("train_steps", &self.train_steps)
            .field("games_played", &self.games_played)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

fn network_config(board_size: u8, config: &LearnerConfig) -> QNetworkConfig {
    QNetworkConfig::new(
        state_len(board_size),
        config.hidden_layers.clone(),
        action_count(board_size),
    )
}

/// The network record that accompanies the metadata file at `model_path`.
#[must_use]
pub fn weights_path(model_path: &Path) -> PathBuf {
    model_path.with_extension("mpk")
}

impl<S: GameState> Agent<S> for LearnedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&mut self, state: &S) -> Option<Cell> {
        let moves = state.legal_moves();
        if moves.is_empty() {
            return None;
        }
        if state.board_size() != self.board_size || self.rng.random::<f32>() < self.epsilon {
            return self.random_move(&moves);
        }
        let values = self.action_values(state);
        let best = moves
            .iter()
            .filter_map(|&mv| {
                let index = action_index(self.board_size, mv)?;
                Some((mv, *values.get(index)?))
            })
            .fold(None, |best: Option<(Cell, f32)>, (mv, value)| match best {
                Some((_, v)) if v >= value => best,
                _ => Some((mv, value)),
            });
        match best {
            Some((mv, _)) => Some(mv),
            None => self.random_move(&moves),
        }
    }

    fn reset(&mut self) {
        self.games_played += 1;
    }
}
