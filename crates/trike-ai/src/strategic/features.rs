//! Positional features the strategic agent weighs.
//!
//! Everything here is computed from the [`GameState`] contract alone. Counts are plain
//! integers; the agent scales them by its gene values.

use trike_engine::{Cell, GameState, Player};

/// Corners of the triangular board of side `size`.
#[must_use]
pub fn corners(size: u8) -> [Cell; 3] {
    let last = size.saturating_sub(1);
    [Cell::new(0, 0), Cell::new(0, last), Cell::new(last, 0)]
}

#[must_use]
pub fn is_corner(size: u8, cell: Cell) -> bool {
    corners(size).contains(&cell)
}

/// On one of the three edges but not a corner.
#[must_use]
pub fn is_side(size: u8, cell: Cell) -> bool {
    let last = u16::from(size.saturating_sub(1));
    !is_corner(size, cell)
        && (cell.q == 0 || cell.r == 0 || u16::from(cell.q) + u16::from(cell.r) == last)
}

#[must_use]
pub fn is_corner_adjacent<S: GameState>(state: &S, cell: Cell) -> bool {
    corners(state.board_size())
        .into_iter()
        .any(|corner| state.neighbors(corner).contains(&cell))
}

#[must_use]
pub fn empty_cells<S: GameState>(state: &S) -> Vec<Cell> {
    state
        .cells()
        .into_iter()
        .filter(|&cell| state.marker(cell).is_none())
        .collect()
}

/// Connected components of the empty cells.
#[must_use]
pub fn regions<S: GameState>(state: &S) -> Vec<Vec<Cell>> {
    let size = usize::from(state.board_size());
    let index = |cell: Cell| usize::from(cell.q) * size + usize::from(cell.r);
    let mut seen = vec![false; size * size];
    let mut regions = vec![];
    for start in empty_cells(state) {
        if seen[index(start)] {
            continue;
        }
        seen[index(start)] = true;
        let mut region = vec![];
        let mut stack = vec![start];
        while let Some(cell) = stack.pop() {
            region.push(cell);
            for next in state.neighbors(cell) {
                if state.marker(next).is_none() && !seen[index(next)] {
                    seen[index(next)] = true;
                    stack.push(next);
                }
            }
        }
        regions.push(region);
    }
    regions
}

/// `me`'s markers around `cell` minus the opponent's.
#[must_use]
pub fn control<S: GameState>(state: &S, cell: Cell, me: Player) -> i32 {
    state
        .neighbors(cell)
        .into_iter()
        .filter_map(|n| state.marker(n))
        .map(|owner| if owner == me { 1 } else { -1 })
        .sum()
}

#[must_use]
pub fn region_control<S: GameState>(state: &S, region: &[Cell], me: Player) -> i32 {
    region.iter().map(|&cell| control(state, cell, me)).sum()
}

/// Player with the most markers around a region, if there is a strict majority.
#[must_use]
pub fn region_owner<S: GameState>(state: &S, region: &[Cell]) -> Option<Player> {
    let balance = region_control(state, region, Player::First);
    match balance.cmp(&0) {
        std::cmp::Ordering::Greater => Some(Player::First),
        std::cmp::Ordering::Less => Some(Player::Second),
        std::cmp::Ordering::Equal => None,
    }
}

/// An empty cell where more than half of the neighbours are `player`'s markers.
#[must_use]
pub fn is_trap<S: GameState>(state: &S, cell: Cell, player: Player) -> bool {
    let neighbors = state.neighbors(cell);
    let friendly = neighbors
        .iter()
        .filter(|&&n| state.marker(n) == Some(player))
        .count();
    friendly * 2 > neighbors.len()
}

#[must_use]
pub fn traps<S: GameState>(state: &S, player: Player) -> Vec<Cell> {
    empty_cells(state)
        .into_iter()
        .filter(|&cell| is_trap(state, cell, player))
        .collect()
}

/// Empty neighbours count 1, friendly markers count one half.
#[must_use]
pub fn influence<S: GameState>(state: &S, cell: Cell, me: Player) -> f64 {
    state
        .neighbors(cell)
        .into_iter()
        .map(|n| match state.marker(n) {
            None => 1.0,
            Some(owner) if owner == me => 0.5,
            Some(_) => 0.0,
        })
        .sum()
}

/// Opponent markers next to `cell`.
#[must_use]
pub fn opponent_contact<S: GameState>(state: &S, cell: Cell, me: Player) -> usize {
    state
        .neighbors(cell)
        .into_iter()
        .filter(|&n| state.marker(n) == Some(me.opponent()))
        .count()
}

/// Markers next to `cell` that are surrounded on all sides but one: +1 for each of the
/// opponent's, -1 for each of `me`'s.
#[must_use]
pub fn burial<S: GameState>(state: &S, cell: Cell, me: Player) -> i32 {
    state
        .neighbors(cell)
        .into_iter()
        .filter_map(|n| {
            let owner = state.marker(n)?;
            let around = state.neighbors(n);
            let occupied = around
                .iter()
                .filter(|&&c| state.marker(c).is_some())
                .count();
            (occupied + 1 >= around.len()).then_some(if owner == me { -1 } else { 1 })
        })
        .sum()
}

/// Empty cells with at most one empty neighbour, where the pawn is likely to stop, scored
/// by [`control`].
#[must_use]
pub fn endpoint_control<S: GameState>(state: &S, me: Player) -> i32 {
    empty_cells(state)
        .into_iter()
        .filter(|&cell| {
            state
                .neighbors(cell)
                .into_iter()
                .filter(|&n| state.marker(n).is_none())
                .count()
                <= 1
        })
        .map(|cell| control(state, cell, me))
        .sum()
}

/// Whether the empty area of `state` consists of more than one region.
#[must_use]
pub fn is_split<S: GameState>(state: &S) -> bool {
    regions(state).len() > 1
}

/// Regions that do not touch the pawn.
#[must_use]
pub fn detached_regions<S: GameState>(state: &S) -> Vec<Vec<Cell>> {
    let Some(pawn) = state.pawn() else {
        return vec![];
    };
    let around = state.neighbors(pawn);
    regions(state)
        .into_iter()
        .filter(|region| !region.iter().any(|cell| around.contains(cell)))
        .collect()
}

#[cfg(test)]
mod tests {
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
    fn test_edges() {
        assert!(is_corner(7, Cell::new(0, 6)));
        assert!(is_corner(7, Cell::new(6, 0)));
        assert!(!is_side(7, Cell::new(0, 0)));
        assert!(is_side(7, Cell::new(0, 3)));
        assert!(is_side(7, Cell::new(3, 3)));
        assert!(!is_side(7, Cell::new(2, 2)));
        let state = TrikeState::initial(7).unwrap();
        assert!(is_corner_adjacent(&state, Cell::new(1, 0)));
        assert!(!is_corner_adjacent(&state, Cell::new(2, 2)));
    }

    #[test]
    fn test_single_region_on_open_board() {
        let state = play(4, &[(1, 1)]);
        let regions = regions(&state);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].len(), 9);
        assert!(!is_split(&state));
    }

    #[test]
    fn test_wall_splits_corner_off() {
        // (0,1) and (1,0) cut the corner (0,0) off; the pawn ends on (1,1).
        let state = play(4, &[(0, 1), (1, 0), (1, 1)]);
        let regions = regions(&state);
        assert_eq!(regions.len(), 2);
        assert!(regions.iter().any(|r| r == &[Cell::new(0, 0)]));
        assert!(is_split(&state));
        assert_eq!(detached_regions(&state), vec![vec![Cell::new(0, 0)]]);
    }

    #[test]
    fn test_traps() {
        let state = play(4, &[(0, 1), (1, 1), (1, 0)]);
        assert!(is_trap(&state, Cell::new(0, 0), Player::First));
        assert!(!is_trap(&state, Cell::new(0, 0), Player::Second));
        assert_eq!(traps(&state, Player::First), vec![Cell::new(0, 0)]);
        assert_eq!(control(&state, Cell::new(0, 0), Player::First), 2);
        assert_eq!(region_owner(&state, &[Cell::new(0, 0)]), Some(Player::First));
    }

    #[test]
    fn test_contested_cell() {
        let state = play(4, &[(0, 1), (1, 0)]);
        assert_eq!(control(&state, Cell::new(0, 0), Player::First), 0);
        assert_eq!(region_owner(&state, &[Cell::new(0, 0)]), None);
        assert_eq!(opponent_contact(&state, Cell::new(1, 1), Player::First), 1);
    }

    #[test]
    fn test_influence_counts_empty_and_friendly() {
        let state = play(4, &[(1, 1)]);
        // Three empty neighbours and First's marker on (1,1).
        assert!((influence(&state, Cell::new(1, 2), Player::First) - 3.5).abs() < 1e-9);
        assert!((influence(&state, Cell::new(1, 2), Player::Second) - 3.0).abs() < 1e-9);
    }
}
