use trike_engine::{Cell, GameState};

/// A decision maker that picks moves for the player to move.
pub trait Agent<S: GameState> {
    /// Display name used in logs and tournament tables.
    fn name(&self) -> &str;

    /// Picks a move for the player to move in `state`.
    ///
    /// Returns `None` only when `state` has no legal move.
    fn choose_move(&mut self, state: &S) -> Option<Cell>;

    /// Prepares for a new game.
    fn reset(&mut self) {}
}

impl<S, A> Agent<S> for Box<A>
where
    S: GameState,
    A: Agent<S> + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn choose_move(&mut self, state: &S) -> Option<Cell> {
        (**self).choose_move(state)
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}
