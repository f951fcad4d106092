use trike_engine::{Cell, GameState};

/// Opening placement: the legal move closest to the board center.
///
/// Returns `None` once the pawn is on the board, so callers fall through to their search.
pub(crate) fn opening_move<S: GameState>(state: &S) -> Option<Cell> {
    if state.pawn().is_some() {
        return None;
    }
    let center = state.center();
    state
        .legal_moves()
        .into_iter()
        .min_by_key(|mv| mv.manhattan_distance(center))
}

#[cfg(test)]
mod tests {
    use trike_engine::TrikeState;

    use super::*;

    #[test]
    fn test_opening_picks_center() {
        let state = TrikeState::initial(7).unwrap();
        assert_eq!(opening_move(&state), Some(Cell::new(2, 2)));
    }

    #[test]
    fn test_no_opening_after_first_move() {
        let state = TrikeState::initial(7).unwrap().apply(Cell::new(0, 0));
        assert_eq!(opening_move(&state), None);
    }
}
