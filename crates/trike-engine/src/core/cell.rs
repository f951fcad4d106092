use serde::{Deserialize, Serialize};

/// The six hex directions, in axial `(dq, dr)` offsets.
pub const HEX_DIRECTIONS: [(i8, i8); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// A board cell in axial coordinates.
///
/// Cells are plain coordinates: equality, ordering and hashing are structural (`q`
/// first, then `r`). Whether a cell lies on a given board is decided by
/// [`Board::contains`](crate::Board::contains).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[display("({q}, {r})")]
pub struct Cell {
    pub q: u8,
    pub r: u8,
}

impl Cell {
    #[must_use]
    pub const fn new(q: u8, r: u8) -> Self {
        Self { q, r }
    }

    /// Returns the cell `steps` cells away in `direction`, or `None` if a coordinate would
    /// become negative or overflow.
    #[must_use]
    pub fn step(self, (dq, dr): (i8, i8), steps: u8) -> Option<Self> {
        let steps = i8::try_from(steps).ok()?;
        let q = self.q.checked_add_signed(dq.checked_mul(steps)?)?;
        let r = self.r.checked_add_signed(dr.checked_mul(steps)?)?;
        Some(Self { q, r })
    }

    /// Manhattan-style distance over the raw coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: Self) -> u8 {
        self.q.abs_diff(other.q) + self.r.abs_diff(other.r)
    }
}

/// One of the two seats at the board.
///
/// `First` places the opening marker. Markers on the board are owned by a `Player`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
pub enum Player {
    #[display("first")]
    First,
    #[display("second")]
    Second,
}

impl Player {
    pub const ALL: [Self; 2] = [Self::First, Self::Second];

    /// Index of the player in score pairs (`0` or `1`).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        if index % 2 == 0 {
            Self::First
        } else {
            Self::Second
        }
    }

    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_stays_non_negative() {
        let origin = Cell::new(0, 0);
        assert_eq!(origin.step((1, 0), 2), Some(Cell::new(2, 0)));
        assert_eq!(origin.step((-1, 0), 1), None);
        assert_eq!(Cell::new(2, 0).step((-1, 1), 2), Some(Cell::new(0, 2)));
    }

    #[test]
    fn test_ordering_is_q_then_r() {
        let mut cells = vec![Cell::new(1, 0), Cell::new(0, 2), Cell::new(0, 1)];
        cells.sort();
        assert_eq!(cells, vec![Cell::new(0, 1), Cell::new(0, 2), Cell::new(1, 0)]);
    }

    #[test]
    fn test_player_index_roundtrip() {
        for player in Player::ALL {
            assert_eq!(Player::from_index(player.index()), player);
            assert_ne!(player.opponent(), player);
        }
    }

    #[test]
    fn test_cell_serializes_as_struct() {
        let json = serde_json::to_string(&Cell::new(3, 1)).unwrap();
        assert_eq!(json, r#"{"q":3,"r":1}"#);
    }
}
