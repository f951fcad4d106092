use std::fmt::Debug;

use arrayvec::ArrayVec;

use crate::{
    BoardSizeError,
    core::{Cell, Player},
};

/// Rules of a two-player pawn-and-marker game as seen by the agents.
///
/// States are values: [`apply`](Self::apply) returns a new state and never mutates the
/// receiver, so search code can branch freely from any snapshot.
pub trait GameState: Clone + Send + Debug + 'static {
    /// Empty position on a board of side `size`.
    fn initial(size: u8) -> Result<Self, BoardSizeError>;

    fn board_size(&self) -> u8;

    /// Every playable cell, occupied or not.
    fn cells(&self) -> Vec<Cell>;

    /// Moves available to the player to move. Empty once the game is over.
    fn legal_moves(&self) -> Vec<Cell>;

    /// Successor state after the player to move plays `mv`.
    ///
    /// `mv` must be one of [`legal_moves`](Self::legal_moves).
    #[must_use]
    fn apply(&self, mv: Cell) -> Self;

    fn is_terminal(&self) -> bool;

    /// Score pair indexed by [`Player::index`]. Meaningful once the game is over.
    fn outcome(&self) -> [u32; 2];

    fn current_player(&self) -> Player;

    /// Cell the pawn stands on, or `None` before the opening placement.
    fn pawn(&self) -> Option<Cell>;

    /// Owner of the marker on `cell`.
    fn marker(&self, cell: Cell) -> Option<Player>;

    /// On-board neighbours of `cell`.
    fn neighbors(&self, cell: Cell) -> ArrayVec<Cell, 6>;

    /// Reference point for opening heuristics.
    fn center(&self) -> Cell {
        let c = self.board_size().saturating_sub(1) / 3;
        Cell::new(c, c)
    }

    /// Number of `player`'s markers adjacent to the pawn, not counting the one under it.
    fn adjacent_markers(&self, player: Player) -> usize {
        self.pawn().map_or(0, |pawn| {
            self.neighbors(pawn)
                .into_iter()
                .filter(|&c| self.marker(c) == Some(player))
                .count()
        })
    }
}
