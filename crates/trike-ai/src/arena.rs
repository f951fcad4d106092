//! Playing single matches between two agents.
//!
//! [`MatchRunner`] owns the game loop: it creates the initial state from its
//! [`MatchConfig`], asks the agent in the seat to move for a move, checks the move
//! against the rules and applies it until the game ends. Anything that goes wrong inside
//! a match ends that match only:
//!
//! - an agent that returns an illegal move, or no move while one exists, forfeits the
//!   match as [`MatchResult::Error`]
//! - a panic inside an agent or the rules is caught and reported as
//!   [`MatchResult::Error`]
//! - running past `max_turns` or `time_limit` ends the match as
//!   [`MatchResult::Timeout`]; a move returned after the time limit has passed is not
//!   applied
//!
//! Neither errors nor timeouts count as a win for anyone.

use std::{
    panic::{self, AssertUnwindSafe},
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use trike_engine::{Cell, GameState, Player};

use crate::Agent;

/// Which of the two agents passed to [`MatchRunner::play`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
pub enum Seat {
    #[display("A")]
    A,
    #[display("B")]
    B,
}

impl Seat {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
pub enum MatchResult {
    Winner(Seat),
    Draw,
    Timeout,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub result: MatchResult,
    /// Final scores of seat A and seat B.
    pub scores: (u32, u32),
    /// Moves played.
    pub turns: usize,
    /// Whether the second seat took over the opening under the pie rule.
    pub swapped: bool,
}

impl MatchOutcome {
    fn aborted(result: MatchResult) -> Self {
        Self {
            result,
            scores: (0, 0),
            turns: 0,
            swapped: false,
        }
    }

    #[must_use]
    pub fn is_win_for(&self, seat: Seat) -> bool {
        self.result == MatchResult::Winner(seat)
    }

    #[must_use]
    pub fn score_of(&self, seat: Seat) -> u32 {
        match seat {
            Seat::A => self.scores.0,
            Seat::B => self.scores.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub board_size: u8,
    /// Move cap. `None` means one more than the number of cells.
    pub max_turns: Option<usize>,
    pub time_limit: Option<Duration>,
    /// Let the second seat take over the opening placement.
    pub pie_rule: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            board_size: 7,
            max_turns: None,
            time_limit: None,
            pie_rule: false,
        }
    }
}

impl MatchConfig {
    #[must_use]
    pub fn max_turns(&self) -> usize {
        self.max_turns.unwrap_or_else(|| {
            let n = usize::from(self.board_size);
            n * (n + 1) / 2 + 1
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchRunner {
    config: MatchConfig,
}

impl MatchRunner {
    #[must_use]
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Plays one game with `a` moving first.
    ///
    /// Both agents are reset before the first move.
    pub fn play<S: GameState>(
        &self,
        a: &mut dyn Agent<S>,
        b: &mut dyn Agent<S>,
    ) -> MatchOutcome {
        let names = (a.name().to_owned(), b.name().to_owned());
        match panic::catch_unwind(AssertUnwindSafe(|| self.play_unguarded(a, b))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_owned())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_default();
                tracing::warn!(a = %names.0, b = %names.1, %message, "match aborted by a panic");
                MatchOutcome::aborted(MatchResult::Error)
            }
        }
    }

    fn out_of_time(&self, started: Instant) -> bool {
        self.config
            .time_limit
            .is_some_and(|limit| started.elapsed() >= limit)
    }

    fn play_unguarded<'a, S: GameState>(
        &self,
        a: &'a mut dyn Agent<S>,
        b: &'a mut dyn Agent<S>,
    ) -> MatchOutcome {
        let mut state = match S::initial(self.config.board_size) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "cannot start match");
                return MatchOutcome::aborted(MatchResult::Error);
            }
        };
        a.reset();
        b.reset();

        let started = Instant::now();
        let max_turns = self.config.max_turns();
        // Seat playing each player, indexed by `Player::index`.
        let mut seats = [Seat::A, Seat::B];
        let mut swapped = false;
        let mut turns = 0;

        let result = loop {
            if state.is_terminal() {
                break decide(&state, seats);
            }
            if turns >= max_turns || self.out_of_time(started) {
                break MatchResult::Timeout;
            }

            let seat = seats[state.current_player().index()];
            let agent = match seat {
                Seat::A => &mut *a,
                Seat::B => &mut *b,
            };
            let legal = state.legal_moves();
            let Some(mv) = agent.choose_move(&state) else {
                if legal.is_empty() {
                    break decide(&state, seats);
                }
                tracing::warn!(agent = agent.name(), "agent passed while moves were available");
                break MatchResult::Error;
            };
            if self.out_of_time(started) {
                break MatchResult::Timeout;
            }
            if !legal.contains(&mv) {
                tracing::warn!(agent = agent.name(), %mv, "agent chose an illegal move");
                break MatchResult::Error;
            }
            state = state.apply(mv);
            turns += 1;

            if self.config.pie_rule && turns == 1 && should_swap(&state, mv) {
                seats.swap(0, 1);
                swapped = true;
            }
        };

        let outcome = state.outcome();
        let scores = (
            outcome[player_of(seats, Seat::A).index()],
            outcome[player_of(seats, Seat::B).index()],
        );
        MatchOutcome {
            result,
            scores,
            turns,
            swapped,
        }
    }
}

fn player_of(seats: [Seat; 2], seat: Seat) -> Player {
    if seats[0] == seat {
        Player::First
    } else {
        Player::Second
    }
}

fn decide<S: GameState>(state: &S, seats: [Seat; 2]) -> MatchResult {
    let [first, second] = state.outcome();
    match first.cmp(&second) {
        std::cmp::Ordering::Greater => MatchResult::Winner(seats[0]),
        std::cmp::Ordering::Less => MatchResult::Winner(seats[1]),
        std::cmp::Ordering::Equal => MatchResult::Draw,
    }
}

/// Pie-rule heuristic: take over openings within one step of the center.
fn should_swap<S: GameState>(state: &S, opening: Cell) -> bool {
    opening.manhattan_distance(state.center()) <= 1
}

#[cfg(test)]
mod tests {
    use trike_engine::TrikeState;

    use super::*;
    use crate::{MinimaxAgent, RandomAgent};

    /// Plays a fixed list of moves, then panics or passes as configured.
    struct Scripted {
        moves: Vec<Cell>,
        next: usize,
        panic_when_done: bool,
        stall: Option<(usize, Duration)>,
    }

    impl Scripted {
        fn new(moves: &[(u8, u8)]) -> Self {
            Self {
                moves: moves.iter().map(|&(q, r)| Cell::new(q, r)).collect(),
                next: 0,
                panic_when_done: false,
                stall: None,
            }
        }
    }

    impl<S: GameState> Agent<S> for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn choose_move(&mut self, _state: &S) -> Option<Cell> {
            if let Some((_, pause)) = self.stall.filter(|&(at, _)| at == self.next) {
                std::thread::sleep(pause);
            }
            let mv = self.moves.get(self.next).copied();
            self.next += 1;
            assert!(!(mv.is_none() && self.panic_when_done), "script exhausted");
            mv
        }

        fn reset(&mut self) {
            self.next = 0;
        }
    }

    fn runner(board_size: u8) -> MatchRunner {
        MatchRunner::new(MatchConfig {
            board_size,
            ..MatchConfig::default()
        })
    }

    #[test]
    fn test_scripted_game() {
        let mut a = Scripted::new(&[(0, 0), (0, 1)]);
        let mut b = Scripted::new(&[(1, 0)]);
        let outcome = runner(2).play::<TrikeState>(&mut a, &mut b);
        assert_eq!(outcome.result, MatchResult::Winner(Seat::A));
        assert_eq!(outcome.scores, (2, 1));
        assert_eq!(outcome.turns, 3);
        assert!(!outcome.swapped);
    }

    #[test]
    fn test_illegal_move_is_error() {
        let mut a = Scripted::new(&[(0, 0)]);
        let mut b = Scripted::new(&[(0, 0)]);
        let outcome = runner(3).play::<TrikeState>(&mut a, &mut b);
        assert_eq!(outcome.result, MatchResult::Error);
        assert!(!outcome.is_win_for(Seat::A));
        assert!(!outcome.is_win_for(Seat::B));
    }

    #[test]
    fn test_pass_is_error() {
        let mut a = Scripted::new(&[(0, 0)]);
        let mut b = Scripted::new(&[]);
        let outcome = runner(3).play::<TrikeState>(&mut a, &mut b);
        assert_eq!(outcome.result, MatchResult::Error);
    }

    #[test]
    fn test_panic_is_error() {
        let mut a = Scripted::new(&[(0, 0)]);
        let mut b = Scripted::new(&[]);
        b.panic_when_done = true;
        let outcome = runner(3).play::<TrikeState>(&mut a, &mut b);
        assert_eq!(outcome.result, MatchResult::Error);
        assert_eq!(outcome.scores, (0, 0));
    }

    #[test]
    fn test_turn_cap_is_timeout() {
        let runner = MatchRunner::new(MatchConfig {
            board_size: 5,
            max_turns: Some(2),
            ..MatchConfig::default()
        });
        let mut a = RandomAgent::with_seed(1);
        let mut b = RandomAgent::with_seed(2);
        let outcome = runner.play::<TrikeState>(&mut a, &mut b);
        assert_eq!(outcome.result, MatchResult::Timeout);
        assert_eq!(outcome.turns, 2);
    }

    #[test]
    fn test_zero_time_limit_is_timeout() {
        let runner = MatchRunner::new(MatchConfig {
            board_size: 5,
            time_limit: Some(Duration::ZERO),
            ..MatchConfig::default()
        });
        let mut a = MinimaxAgent::new(2);
        let mut b = MinimaxAgent::new(2);
        let outcome = runner.play::<TrikeState>(&mut a, &mut b);
        assert_eq!(outcome.result, MatchResult::Timeout);
    }

    #[test]
    fn test_slow_winning_move_is_timeout() {
        let runner = MatchRunner::new(MatchConfig {
            board_size: 2,
            time_limit: Some(Duration::from_millis(20)),
            ..MatchConfig::default()
        });
        let mut a = Scripted::new(&[(0, 0), (0, 1)]);
        a.stall = Some((1, Duration::from_millis(60)));
        let mut b = Scripted::new(&[(1, 0)]);
        let outcome = runner.play::<TrikeState>(&mut a, &mut b);
        assert_eq!(outcome.result, MatchResult::Timeout);
        assert_eq!(outcome.turns, 2);
    }

    #[test]
    fn test_invalid_board_size_is_error() {
        let mut a = RandomAgent::with_seed(1);
        let mut b = RandomAgent::with_seed(2);
        let outcome = runner(1).play::<TrikeState>(&mut a, &mut b);
        assert_eq!(outcome.result, MatchResult::Error);
    }

    #[test]
    fn test_pie_rule_swaps_seats() {
        let runner = MatchRunner::new(MatchConfig {
            board_size: 2,
            pie_rule: true,
            ..MatchConfig::default()
        });
        // A opens on the center (0, 0); B takes it over, so A moves again and the
        // opening marker now counts for B.
        let mut a = Scripted::new(&[(0, 0), (1, 0)]);
        let mut b = Scripted::new(&[(0, 1)]);
        let outcome = runner.play::<TrikeState>(&mut a, &mut b);
        assert!(outcome.swapped);
        assert_eq!(outcome.turns, 3);
        // Final position: (0, 0) and (0, 1) by the first player (B), (1, 0) by A;
        // the pawn ends on (0, 1).
        assert_eq!(outcome.scores, (1, 2));
        assert_eq!(outcome.result, MatchResult::Winner(Seat::B));
    }

    #[test]
    fn test_agents_complete_games() {
        let runner = runner(5);
        for seed in 0..4 {
            let mut a = MinimaxAgent::new(2);
            let mut b = RandomAgent::with_seed(seed);
            let outcome = runner.play::<TrikeState>(&mut a, &mut b);
            assert!(outcome.result.is_winner() || outcome.result.is_draw());
            assert!(outcome.turns <= runner.config().max_turns());
        }
    }
}
