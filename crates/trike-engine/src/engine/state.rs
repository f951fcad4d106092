use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::{
    BoardSizeError, IllegalMoveError,
    core::{Board, Cell, Player},
};

use super::game_state::GameState;

/// A Trike position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrikeState {
    board: Board,
    pawn: Option<Cell>,
    to_move: Player,
    turn: usize,
}

impl TrikeState {
    pub fn new(size: u8) -> Result<Self, BoardSizeError> {
        Ok(Self {
            board: Board::new(size)?,
            pawn: None,
            to_move: Player::First,
            turn: 0,
        })
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Number of moves played so far.
    #[must_use]
    pub fn turn(&self) -> usize {
        self.turn
    }

    /// Checks that `mv` is legal for the player to move.
    pub fn check_move(&self, mv: Cell) -> Result<(), IllegalMoveError> {
        if self.is_terminal() {
            return Err(IllegalMoveError::GameOver);
        }
        if !self.board.contains(mv) {
            return Err(IllegalMoveError::OffBoard { cell: mv });
        }
        if !self.board.is_empty(mv) {
            return Err(IllegalMoveError::Occupied { cell: mv });
        }
        if let Some(pawn) = self.pawn
            && self.board.line_destinations(pawn).binary_search(&mv).is_err()
        {
            return Err(IllegalMoveError::Unreachable { cell: mv });
        }
        Ok(())
    }

    /// Successor after playing `mv`, or the reason it is not legal.
    pub fn try_apply(&self, mv: Cell) -> Result<Self, IllegalMoveError> {
        self.check_move(mv)?;
        let mut next = self.clone();
        next.board.place(mv, self.to_move);
        next.pawn = Some(mv);
        next.to_move = self.to_move.opponent();
        next.turn += 1;
        Ok(next)
    }

    fn score(&self, player: Player) -> u32 {
        let Some(pawn) = self.pawn else {
            return 0;
        };
        let under = u32::from(self.board.get(pawn) == Some(player));
        let adjacent = self
            .board
            .neighbors(pawn)
            .into_iter()
            .filter(|&c| self.board.get(c) == Some(player))
            .count();
        under + u32::try_from(adjacent).unwrap_or(0)
    }
}

impl GameState for TrikeState {
    fn initial(size: u8) -> Result<Self, BoardSizeError> {
        Self::new(size)
    }

    fn board_size(&self) -> u8 {
        self.board.size()
    }

    fn cells(&self) -> Vec<Cell> {
        self.board.cells().collect()
    }

    fn legal_moves(&self) -> Vec<Cell> {
        match self.pawn {
            None => self.board.cells().collect(),
            Some(pawn) => self.board.line_destinations(pawn),
        }
    }

    fn apply(&self, mv: Cell) -> Self {
        match self.try_apply(mv) {
            Ok(next) => next,
            Err(e) => panic!("illegal move {mv}: {e}"),
        }
    }

    fn is_terminal(&self) -> bool {
        self.pawn.is_some_and(|pawn| {
            self.board
                .neighbors(pawn)
                .into_iter()
                .all(|c| self.board.get(c).is_some())
        })
    }

    fn outcome(&self) -> [u32; 2] {
        Player::ALL.map(|p| self.score(p))
    }

    fn current_player(&self) -> Player {
        self.to_move
    }

    fn pawn(&self) -> Option<Cell> {
        self.pawn
    }

    fn marker(&self, cell: Cell) -> Option<Player> {
        self.board.get(cell)
    }

    fn neighbors(&self, cell: Cell) -> ArrayVec<Cell, 6> {
        self.board.neighbors(cell)
    }
}
