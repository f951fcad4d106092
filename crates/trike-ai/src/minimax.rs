//! Depth-bounded minimax search with alpha-beta pruning.
//!
//! Positions are scored from the point of view of the player who started the search:
//!
//! - terminal: own outcome score minus the opponent's
//! - otherwise: own markers adjacent to the pawn minus the opponent's, plus
//!   [`MOBILITY_WEIGHT`] times the number of moves available to whoever is to move,
//!   counted positively on our turn and negatively on theirs
//!
//! The search has a fixed depth and no randomness, so the same state always yields the
//! same move.

use trike_engine::{Cell, GameState, Player};

use crate::{Agent, opening::opening_move};

pub const DEFAULT_DEPTH: u32 = 3;
pub const MOBILITY_WEIGHT: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct MinimaxAgent {
    name: String,
    depth: u32,
}

impl Default for MinimaxAgent {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

impl MinimaxAgent {
    #[must_use]
    pub fn new(depth: u32) -> Self {
        Self {
            name: format!("Minimax (depth {depth})"),
            depth,
        }
    }

    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Best move and its value, searching `depth` plies below the root.
    fn search<S: GameState>(&self, state: &S) -> Option<(Cell, f64)> {
        let me = state.current_player();
        let mut alpha = f64::NEG_INFINITY;
        let beta = f64::INFINITY;
        let mut best: Option<(Cell, f64)> = None;
        for mv in state.legal_moves() {
            let next = state.apply(mv);
            let value = minimax(&next, self.depth.saturating_sub(1), false, alpha, beta, me);
            if best.is_none_or(|(_, v)| value > v) {
                best = Some((mv, value));
            }
            alpha = alpha.max(value);
        }
        best
    }
}

impl<S: GameState> Agent<S> for MinimaxAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&mut self, state: &S) -> Option<Cell> {
        if let Some(mv) = opening_move(state) {
            return Some(mv);
        }
        self.search(state).map(|(mv, _)| mv)
    }
}

fn minimax<S: GameState>(
    state: &S,
    depth: u32,
    maximizing: bool,
    mut alpha: f64,
    mut beta: f64,
    me: Player,
) -> f64 {
    if depth == 0 || state.is_terminal() {
        return evaluate(state, me);
    }
    let moves = state.legal_moves();
    if maximizing {
        let mut value = f64::NEG_INFINITY;
        for mv in moves {
            value = value.max(minimax(&state.apply(mv), depth - 1, false, alpha, beta, me));
            alpha = alpha.max(value);
            if beta <= alpha {
                break;
            }
        }
        value
    } else {
        let mut value = f64::INFINITY;
        for mv in moves {
            value = value.min(minimax(&state.apply(mv), depth - 1, true, alpha, beta, me));
            beta = beta.min(value);
            if beta <= alpha {
                break;
            }
        }
        value
    }
}

/// Static evaluation of `state` for `me`.
#[expect(clippy::cast_precision_loss)]
pub fn evaluate<S: GameState>(state: &S, me: Player) -> f64 {
    if state.is_terminal() {
        let outcome = state.outcome();
        return f64::from(outcome[me.index()]) - f64::from(outcome[me.opponent().index()]);
    }
    let control =
        state.adjacent_markers(me) as f64 - state.adjacent_markers(me.opponent()) as f64;
    let mobility = state.legal_moves().len() as f64;
    let sign = if state.current_player() == me { 1.0 } else { -1.0 };
    control + sign * MOBILITY_WEIGHT * mobility
}

#[cfg(test)]
mod tests {
    use trike_engine::TrikeState;

    use super::*;

    fn play(size: u8, moves: &[(u8, u8)]) -> TrikeState {
        moves.iter().fold(TrikeState::initial(size).unwrap(), |s, &(q, r)| {
            s.apply(Cell::new(q, r))
        })
    }

    #[test]
    fn test_three_cell_board() {
        let state = play(2, &[(0, 0), (1, 0)]);
        let mut agent = MinimaxAgent::new(3);
        assert_eq!(agent.choose_move(&state), Some(Cell::new(0, 1)));
    }

    #[test]
    fn test_opening_goes_to_center() {
        let state = TrikeState::initial(7).unwrap();
        let mut agent = MinimaxAgent::default();
        assert_eq!(agent.choose_move(&state), Some(Cell::new(2, 2)));
    }

    #[test]
    fn test_deterministic() {
        let state = play(6, &[(1, 1), (1, 3)]);
        let mut a = MinimaxAgent::new(3);
        let mut b = MinimaxAgent::new(3);
        let first = a.choose_move(&state);
        assert!(first.is_some());
        assert_eq!(first, a.choose_move(&state));
        assert_eq!(first, b.choose_move(&state));
    }

    #[test]
    fn test_takes_immediate_win() {
        // Pawn on (1, 1). Moving to the (2, 0) corner boxes the pawn in for a 2-1 win.
        let state = play(3, &[(1, 0), (1, 1)]);
        assert_eq!(
            state.legal_moves(),
            vec![Cell::new(0, 1), Cell::new(0, 2), Cell::new(2, 0)]
        );
        let mut agent = MinimaxAgent::new(1);
        assert_eq!(agent.choose_move(&state), Some(Cell::new(2, 0)));
    }

    #[test]
    fn test_terminal_evaluation() {
        let state = play(2, &[(0, 0), (1, 0), (0, 1)]);
        assert!((evaluate(&state, Player::First) - 1.0).abs() < f64::EPSILON);
        assert!((evaluate(&state, Player::Second) + 1.0).abs() < f64::EPSILON);
    }
}
