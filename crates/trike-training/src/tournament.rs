//! Round-robin tournaments between arbitrary agents.
//!
//! Every pair of entrants plays `rounds` games. The first seat alternates, starting with
//! the entrant listed first, and both agents are reset before every game. Only wins are
//! counted in the standings; draws, timeouts and errors are kept in the match log.

use serde::{Deserialize, Serialize};
use trike_ai::{
    Agent,
    arena::{MatchResult, MatchRunner, Seat},
};
use trike_engine::GameState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub round: u32,
    /// Name of the agent that moved first.
    pub first: String,
    pub second: String,
    /// Name of the winner, if any.
    pub winner: Option<String>,
    pub result: MatchResult,
    /// Scores of the first and second agent.
    pub scores: (u32, u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub name: String,
    pub wins: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentReport {
    /// Entrants by wins, descending. Equal wins keep entry order.
    pub standings: Vec<Standing>,
    pub matches: Vec<MatchRecord>,
}

#[derive(Debug, Clone)]
pub struct Tournament {
    runner: MatchRunner,
    rounds: u32,
}

impl Tournament {
    #[must_use]
    pub fn new(runner: MatchRunner, rounds: u32) -> Self {
        Self { runner, rounds }
    }

    pub fn run<S>(&self, agents: &mut [Box<dyn Agent<S>>]) -> TournamentReport
    where
        S: GameState,
    {
        let mut wins = vec![0; agents.len()];
        let mut matches = vec![];

        for i in 0..agents.len() {
            for j in i + 1..agents.len() {
                let (head, tail) = agents.split_at_mut(j);
                let (a, b) = (&mut head[i], &mut tail[0]);
                tracing::info!(a = a.name(), b = b.name(), "matchup");
                let mut pair_wins = [0; 2];
                for round in 0..self.rounds {
                    let a_first = round % 2 == 0;
                    let outcome = if a_first {
                        self.runner.play::<S>(a.as_mut(), b.as_mut())
                    } else {
                        self.runner.play::<S>(b.as_mut(), a.as_mut())
                    };
                    let (first, second) = if a_first {
                        (a.name().to_owned(), b.name().to_owned())
                    } else {
                        (b.name().to_owned(), a.name().to_owned())
                    };
                    let winner = match outcome.result {
                        MatchResult::Winner(seat) => {
                            let a_won = (seat == Seat::A) == a_first;
                            pair_wins[usize::from(!a_won)] += 1;
                            Some(if seat == Seat::A {
                                first.clone()
                            } else {
                                second.clone()
                            })
                        }
                        MatchResult::Draw | MatchResult::Timeout | MatchResult::Error => None,
                    };
                    matches.push(MatchRecord {
                        round,
                        first,
                        second,
                        winner,
                        result: outcome.result,
                        scores: outcome.scores,
                    });
                }
                tracing::info!(
                    a = a.name(),
                    a_wins = pair_wins[0],
                    b = b.name(),
                    b_wins = pair_wins[1],
                    "matchup finished"
                );
                wins[i] += pair_wins[0];
                wins[j] += pair_wins[1];
            }
        }

        let mut standings = agents
            .iter()
            .zip(wins)
            .map(|(agent, wins)| Standing {
                name: agent.name().to_owned(),
                wins,
            })
            .collect::<Vec<_>>();
        standings.sort_by(|a, b| b.wins.cmp(&a.wins));
        TournamentReport { standings, matches }
    }
}

#[cfg(test)]
mod tests {
    use trike_ai::{MinimaxAgent, RandomAgent, arena::MatchConfig};
    use trike_engine::TrikeState;

    use super::*;

    #[test]
    fn test_round_robin_schedule() {
        let runner = MatchRunner::new(MatchConfig {
            board_size: 4,
            ..MatchConfig::default()
        });
        let mut agents: Vec<Box<dyn Agent<TrikeState>>> = vec![
            Box::new(RandomAgent::with_seed(1).with_name("r1")),
            Box::new(RandomAgent::with_seed(2).with_name("r2")),
            Box::new(MinimaxAgent::new(1)),
        ];
        let report = Tournament::new(runner, 3).run::<TrikeState>(&mut agents);

        assert_eq!(report.matches.len(), 3 * 3);
        assert_eq!(report.standings.len(), 3);
        let total_wins: u32 = report.standings.iter().map(|s| s.wins).sum();
        let decided = report.matches.iter().filter(|m| m.winner.is_some()).count();
        assert_eq!(usize::try_from(total_wins).unwrap(), decided);
        assert!(report.standings.is_sorted_by(|a, b| a.wins >= b.wins));

        let first_pair = &report.matches[..3];
        assert_eq!(first_pair[0].first, "r1");
        assert_eq!(first_pair[1].first, "r2");
        assert_eq!(first_pair[2].first, "r1");
        for record in &report.matches {
            assert!(record.result.is_winner() == record.winner.is_some());
        }
    }
}
