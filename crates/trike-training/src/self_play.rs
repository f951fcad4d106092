//! Self-play training for [`LearnedAgent`].
//!
//! The learner plays episode after episode against either a [`RandomAgent`] or one of
//! its own frozen snapshots. After each of its moves it stores the transition with a
//! shaped reward and runs one training step. The agent itself knows nothing about
//! rewards; they are computed here by [`reward`].
//!
//! # Opponents
//!
//! With probability `random_opponent_rate`, or while no snapshot exists yet, the
//! opponent is the random agent. Otherwise it is drawn uniformly from a pool of at most
//! `pool_size` snapshots, one taken every `snapshot_interval` episodes. Snapshots play
//! with a fixed exploration rate and never train.
//!
//! # Reward Shaping
//!
//! | Position                          | Reward                                        |
//! |-----------------------------------|-----------------------------------------------|
//! | terminal, won by `d`              | `20 + 2d`                                     |
//! | terminal, lost by `d`             | `-10 - d`                                     |
//! | terminal, draw                    | `0.1`                                         |
//! | fewer markers than the board side | `0.2 * (n - distance(pawn, center)) / n`      |
//! | otherwise                         | `0.15 * friendly - 0.1 * hostile` neighbours, |
//! |                                   | `+0.5` when all but one are friendly          |
//! | pawn not placed                   | `0`                                           |

use std::{collections::VecDeque, path::PathBuf};

use rand::{Rng, SeedableRng as _, seq::IndexedRandom as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use trike_ai::{Agent, LearnedAgent, RandomAgent};
use trike_engine::{BoardSizeError, Cell, GameState, Player};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfPlayConfig {
    pub episodes: u32,
    pub board_size: u8,
    /// Probability of facing the random agent when snapshots are available.
    pub random_opponent_rate: f64,
    /// Episodes between snapshots.
    pub snapshot_interval: u32,
    pub pool_size: usize,
    /// Exploration rate snapshots play with.
    pub snapshot_epsilon: f32,
    /// Moves after which an episode is abandoned.
    pub max_turns: usize,
    /// Episodes between model saves. Only used with a `model_dir`.
    pub save_interval: u32,
    pub model_dir: Option<PathBuf>,
    /// Episodes between progress log lines.
    pub log_interval: u32,
    pub seed: Option<u64>,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            episodes: 5000,
            board_size: 7,
            random_opponent_rate: 0.2,
            snapshot_interval: 100,
            pool_size: 5,
            snapshot_epsilon: 0.1,
            max_turns: 100,
            save_interval: 500,
            model_dir: None,
            log_interval: 10,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SelfPlayStats {
    pub episodes: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// Episodes that hit the turn cap or where a player could not move.
    pub unfinished: u32,
    pub train_steps: u64,
    /// Mean loss over all training steps, if any ran.
    pub mean_loss: Option<f64>,
}

impl SelfPlayStats {
    #[must_use]
    pub fn win_rate(&self) -> f64 {
        if self.episodes == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(self.episodes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EpisodeResult {
    Win,
    Loss,
    Draw,
    Unfinished,
}

/// Reward for a player whose move produced `state`.
#[must_use]
pub fn reward<S>(state: &S, player: Player) -> f32
where
    S: GameState,
{
    let Some(pawn) = state.pawn() else {
        return 0.0;
    };
    if state.is_terminal() {
        let outcome = state.outcome();
        let diff =
            i64::from(outcome[player.index()]) - i64::from(outcome[player.opponent().index()]);
        return terminal_reward(diff);
    }

    let size = state.board_size();
    if marker_count(state) < usize::from(size) {
        let distance = f32::from(pawn.manhattan_distance(state.center()));
        let size = f32::from(size);
        return 0.2 * (size - distance) / size;
    }

    let neighbors = state.neighbors(pawn);
    let friendly = neighbors
        .iter()
        .filter(|&&cell| state.marker(cell) == Some(player))
        .count();
    let hostile = neighbors
        .iter()
        .filter(|&&cell| state.marker(cell) == Some(player.opponent()))
        .count();
    #[expect(clippy::cast_precision_loss)]
    let mut reward = 0.15 * friendly as f32 - 0.1 * hostile as f32;
    if neighbors.len() >= 3 && friendly + 1 >= neighbors.len() {
        reward += 0.5;
    }
    reward
}

/// Reward for a finished game won (`diff > 0`) or lost by `diff` points.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn terminal_reward(diff: i64) -> f32 {
    match diff {
        0 => 0.1,
        d if d > 0 => 20.0 + 2.0 * d as f32,
        d => -10.0 - d.unsigned_abs() as f32,
    }
}

fn marker_count<S>(state: &S) -> usize
where
    S: GameState,
{
    let size = state.board_size();
    (0..size)
        .flat_map(|q| (0..size - q).map(move |r| Cell::new(q, r)))
        .filter(|&cell| state.marker(cell).is_some())
        .count()
}

/// Drives a [`LearnedAgent`] through self-play episodes.
#[derive(Debug)]
pub struct SelfPlayTrainer {
    config: SelfPlayConfig,
    learner: LearnedAgent,
    random: RandomAgent,
    pool: VecDeque<LearnedAgent>,
    rng: Pcg32,
}

impl SelfPlayTrainer {
    #[must_use]
    pub fn new(config: SelfPlayConfig, learner: LearnedAgent) -> Self {
        let mut rng = Pcg32::seed_from_u64(config.seed.unwrap_or_else(|| rand::rng().random()));
        let random = RandomAgent::with_seed(rng.random()).with_name("Random");
        Self {
            config,
            learner,
            random,
            pool: VecDeque::new(),
            rng,
        }
    }

    #[must_use]
    pub fn learner(&self) -> &LearnedAgent {
        &self.learner
    }

    #[must_use]
    pub fn into_learner(self) -> LearnedAgent {
        self.learner
    }

    /// Snapshots currently available as opponents.
    #[must_use]
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    /// Plays every configured episode on the game `S`.
    pub fn run<S>(&mut self) -> Result<SelfPlayStats, BoardSizeError>
    where
        S: GameState,
    {
        let initial = S::initial(self.config.board_size)?;
        let mut stats = SelfPlayStats::default();
        let mut loss_sum = 0.0;

        tracing::info!(
            agent = Agent::<S>::name(&self.learner),
            episodes = self.config.episodes,
            board_size = self.config.board_size,
            "starting self-play training"
        );

        for episode in 1..=self.config.episodes {
            let (result, losses) = self.play_episode(initial.clone());
            stats.episodes += 1;
            match result {
                EpisodeResult::Win => stats.wins += 1,
                EpisodeResult::Loss => stats.losses += 1,
                EpisodeResult::Draw => stats.draws += 1,
                EpisodeResult::Unfinished => stats.unfinished += 1,
            }
            for loss in losses {
                stats.train_steps += 1;
                loss_sum += f64::from(loss);
            }

            if self.config.snapshot_interval > 0 && episode % self.config.snapshot_interval == 0 {
                self.take_snapshot();
            }
            if self.config.log_interval > 0 && episode % self.config.log_interval == 0 {
                tracing::info!(
                    episode,
                    win_rate = stats.win_rate(),
                    epsilon = self.learner.epsilon(),
                    pool = self.pool.len(),
                    "self-play progress"
                );
            }
            if self.config.save_interval > 0 && episode % self.config.save_interval == 0 {
                self.save();
            }
        }

        if stats.train_steps > 0 {
            #[expect(clippy::cast_precision_loss)]
            let steps = stats.train_steps as f64;
            stats.mean_loss = Some(loss_sum / steps);
        }
        self.save();
        tracing::info!(
            wins = stats.wins,
            losses = stats.losses,
            draws = stats.draws,
            unfinished = stats.unfinished,
            "self-play training complete"
        );
        Ok(stats)
    }

    fn take_snapshot(&mut self) {
        self.pool
            .push_back(self.learner.snapshot(self.config.snapshot_epsilon));
        while self.pool.len() > self.config.pool_size {
            self.pool.pop_front();
        }
        tracing::debug!(pool = self.pool.len(), "added learner snapshot");
    }

    fn save(&self) {
        let Some(dir) = &self.config.model_dir else {
            return;
        };
        match self.learner.save(dir) {
            Ok(path) => tracing::info!(path = %path.display(), "saved model"),
            Err(e) => tracing::warn!(error = %e, "failed to save model"),
        }
    }

    fn play_episode<S>(&mut self, mut state: S) -> (EpisodeResult, Vec<f32>)
    where
        S: GameState,
    {
        let use_random = self.pool.is_empty()
            || self
                .rng
                .random_bool(self.config.random_opponent_rate.clamp(0.0, 1.0));
        let pool_index = if use_random {
            None
        } else {
            let indices = (0..self.pool.len()).collect::<Vec<_>>();
            indices.choose(&mut self.rng).copied()
        };
        let learner_player = if self.rng.random_bool(0.5) {
            Player::First
        } else {
            Player::Second
        };

        let max_turns = self.config.max_turns;
        let Self {
            learner,
            random,
            pool,
            ..
        } = self;
        let opponent: &mut dyn Agent<S> = match pool_index.and_then(|i| pool.get_mut(i)) {
            Some(snapshot) => snapshot,
            None => random,
        };
        Agent::<S>::reset(&mut *learner);
        opponent.reset();

        let mut losses = vec![];
        let mut turns = 0;
        while !state.is_terminal() && turns < max_turns {
            let mover = state.current_player();
            let mv = if mover == learner_player {
                learner.choose_move(&state)
            } else {
                opponent.choose_move(&state)
            };
            let Some(mv) = mv.filter(|mv| state.legal_moves().contains(mv)) else {
                break;
            };
            let next = state.apply(mv);
            if mover == learner_player {
                learner.store_experience(&state, mv, reward(&next, learner_player), &next);
                losses.extend(learner.train_step());
            }
            state = next;
            turns += 1;
        }

        let result = if state.is_terminal() {
            let outcome = state.outcome();
            let mine = outcome[learner_player.index()];
            let theirs = outcome[learner_player.opponent().index()];
            match mine.cmp(&theirs) {
                std::cmp::Ordering::Greater => EpisodeResult::Win,
                std::cmp::Ordering::Less => EpisodeResult::Loss,
                std::cmp::Ordering::Equal => EpisodeResult::Draw,
            }
        } else {
            EpisodeResult::Unfinished
        };
        (result, losses)
    }
}

#[cfg(test)]
mod tests {
    use trike_ai::learned::LearnerConfig;
    use trike_engine::TrikeState;

    use super::*;

    fn play(size: u8, moves: &[(u8, u8)]) -> TrikeState {
        moves
            .iter()
            .fold(TrikeState::initial(size).unwrap(), |state, &(q, r)| {
                state.apply(Cell::new(q, r))
            })
    }

    #[test]
    fn test_terminal_reward_signs() {
        assert_eq!(terminal_reward(1), 22.0);
        assert_eq!(terminal_reward(-2), -12.0);
        assert_eq!(terminal_reward(0), 0.1);
        let state = play(3, &[(0, 0), (0, 1), (1, 1), (2, 0), (1, 0)]);
        assert!(state.is_terminal());
        assert_eq!(state.outcome(), [3, 2]);
        assert_eq!(reward(&state, Player::First), 22.0);
        assert_eq!(reward(&state, Player::Second), -11.0);
    }

    #[test]
    fn test_no_reward_before_opening() {
        let state = TrikeState::initial(5).unwrap();
        assert_eq!(reward(&state, Player::First), 0.0);
    }

    #[test]
    fn test_early_reward_prefers_center() {
        let center = play(7, &[(2, 2)]);
        let corner = play(7, &[(0, 0)]);
        let at_center = reward(&center, Player::First);
        assert!((at_center - 0.2).abs() < 1e-6);
        assert!(reward(&corner, Player::First) < at_center);
        assert!(reward(&corner, Player::First) > 0.0);
    }

    #[test]
    fn test_surrounding_reward_signs() {
        let state = play(3, &[(0, 0), (0, 1), (1, 1)]);
        assert!(!state.is_terminal());
        assert!(reward(&state, Player::First) < 0.0);
        assert!(reward(&state, Player::Second) > 0.0);
    }

    #[test]
    fn test_training_run() {
        let config = LearnerConfig {
            hidden_layers: vec![16],
            batch_size: 8,
            replay_capacity: 256,
            ..LearnerConfig::default()
        };
        let learner = LearnedAgent::with_seed("self play test", 4, config, 0);
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = SelfPlayTrainer::new(
            SelfPlayConfig {
                episodes: 30,
                board_size: 4,
                snapshot_interval: 5,
                pool_size: 3,
                save_interval: 10,
                model_dir: Some(dir.path().to_owned()),
                seed: Some(1),
                ..SelfPlayConfig::default()
            },
            learner,
        );
        let stats = trainer.run::<TrikeState>().unwrap();

        assert_eq!(stats.episodes, 30);
        assert_eq!(
            stats.wins + stats.losses + stats.draws + stats.unfinished,
            30
        );
        assert!(stats.train_steps > 0);
        assert!(stats.mean_loss.is_some());
        assert_eq!(trainer.pool_len(), 3);
        assert_eq!(trainer.learner().games_played(), 30);
        assert_eq!(trainer.learner().train_steps(), stats.train_steps);
        assert!(trainer.learner().model_path(dir.path()).exists());
    }

    #[test]
    fn test_invalid_board_size() {
        let learner = LearnedAgent::with_seed("tiny", 1, LearnerConfig::default(), 0);
        let mut trainer = SelfPlayTrainer::new(
            SelfPlayConfig {
                board_size: 1,
                ..SelfPlayConfig::default()
            },
            learner,
        );
        assert!(trainer.run::<TrikeState>().is_err());
    }
}
