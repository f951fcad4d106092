use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::BoardSizeError;

use super::cell::{Cell, HEX_DIRECTIONS, Player};

/// Triangular board of side `size`.
///
/// Stores the owner of the marker on each cell, row-major over `(q, r)` in a
/// `size * size` grid. Grid slots with `q + r >= size` are never written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    size: u8,
    cells: Vec<Option<Player>>,
}

impl Board {
    pub const MIN_SIZE: u8 = 2;
    pub const MAX_SIZE: u8 = 19;

    pub fn new(size: u8) -> Result<Self, BoardSizeError> {
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&size) {
            return Err(BoardSizeError { size });
        }
        let side = usize::from(size);
        Ok(Self {
            size,
            cells: vec![None; side * side],
        })
    }

    #[must_use]
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Number of playable cells, `size * (size + 1) / 2`.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let side = usize::from(self.size);
        side * (side + 1) / 2
    }

    #[must_use]
    pub fn contains(&self, cell: Cell) -> bool {
        u16::from(cell.q) + u16::from(cell.r) < u16::from(self.size)
    }

    /// All playable cells in `(q, r)` order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.size).flat_map(move |q| (0..self.size - q).map(move |r| Cell::new(q, r)))
    }

    fn index(&self, cell: Cell) -> usize {
        usize::from(cell.q) * usize::from(self.size) + usize::from(cell.r)
    }

    /// Owner of the marker on `cell`, or `None` if the cell is empty or off the board.
    #[must_use]
    pub fn get(&self, cell: Cell) -> Option<Player> {
        if !self.contains(cell) {
            return None;
        }
        self.cells[self.index(cell)]
    }

    #[must_use]
    pub fn is_empty(&self, cell: Cell) -> bool {
        self.contains(cell) && self.cells[self.index(cell)].is_none()
    }

    /// Puts a marker on `cell`.
    ///
    /// The caller is responsible for checking that the cell is on the board and empty.
    pub(crate) fn place(&mut self, cell: Cell, player: Player) {
        debug_assert!(self.is_empty(cell), "placing on {cell} which is not an empty cell");
        let index = self.index(cell);
        self.cells[index] = Some(player);
    }

    /// On-board neighbours of `cell`, in [`HEX_DIRECTIONS`] order.
    #[must_use]
    pub fn neighbors(&self, cell: Cell) -> ArrayVec<Cell, 6> {
        HEX_DIRECTIONS
            .iter()
            .filter_map(|&dir| cell.step(dir, 1))
            .filter(|&c| self.contains(c))
            .collect()
    }

    /// Empty cells reachable from `from` by sliding in one of the six directions
    /// without crossing an occupied cell. The result is sorted.
    #[must_use]
    pub fn line_destinations(&self, from: Cell) -> Vec<Cell> {
        let mut destinations = vec![];
        for dir in HEX_DIRECTIONS {
            let mut steps = 1;
            while let Some(cell) = from.step(dir, steps) {
                if !self.is_empty(cell) {
                    break;
                }
                destinations.push(cell);
                steps += 1;
            }
        }
        destinations.sort_unstable();
        destinations
    }

    /// Number of markers `player` has on the board.
    #[must_use]
    pub fn marker_count(&self, player: Player) -> usize {
        self.cells().filter(|&c| self.get(c) == Some(player)).count()
    }

    /// Total number of markers on the board.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.cells().filter(|&c| self.get(c).is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bounds() {
        assert_eq!(Board::new(1), Err(BoardSizeError { size: 1 }));
        assert_eq!(Board::new(20), Err(BoardSizeError { size: 20 }));
        assert!(Board::new(2).is_ok());
        assert!(Board::new(19).is_ok());
    }

    #[test]
    fn test_cells_form_a_triangle() {
        let board = Board::new(4).unwrap();
        let cells = board.cells().collect::<Vec<_>>();
        assert_eq!(cells.len(), 10);
        assert_eq!(cells.len(), board.cell_count());
        assert!(cells.iter().all(|c| c.q + c.r < 4));
        assert!(!board.contains(Cell::new(2, 2)));
        assert!(board.contains(Cell::new(3, 0)));
    }

    #[test]
    fn test_corner_has_two_neighbors() {
        let board = Board::new(5).unwrap();
        assert_eq!(board.neighbors(Cell::new(0, 0)).len(), 2);
        assert_eq!(board.neighbors(Cell::new(4, 0)).len(), 2);
        assert_eq!(board.neighbors(Cell::new(0, 4)).len(), 2);
        assert_eq!(board.neighbors(Cell::new(1, 1)).len(), 6);
    }

    #[test]
    fn test_line_destinations_stop_at_markers() {
        let mut board = Board::new(5).unwrap();
        board.place(Cell::new(0, 0), Player::First);
        board.place(Cell::new(2, 0), Player::Second);
        let dests = board.line_destinations(Cell::new(0, 0));
        // Along +q the slide stops before (2, 0); along +r it runs to the edge.
        assert_eq!(
            dests,
            vec![
                Cell::new(0, 1),
                Cell::new(0, 2),
                Cell::new(0, 3),
                Cell::new(0, 4),
                Cell::new(1, 0),
            ]
        );
    }

    #[test]
    fn test_get_off_board_is_none() {
        let board = Board::new(3).unwrap();
        assert_eq!(board.get(Cell::new(2, 2)), None);
        assert!(!board.is_empty(Cell::new(2, 2)));
    }

    #[test]
    fn test_marker_count() {
        let mut board = Board::new(3).unwrap();
        board.place(Cell::new(0, 0), Player::First);
        board.place(Cell::new(1, 0), Player::First);
        board.place(Cell::new(0, 1), Player::Second);
        assert_eq!(board.marker_count(Player::First), 2);
        assert_eq!(board.marker_count(Player::Second), 1);
        assert_eq!(board.occupied_count(), 3);
    }
}
