//! Hand-crafted positional play driven by an evolvable weight vector.
//!
//! [`StrategicAgent`] scores every legal move with the features in [`features`], each
//! scaled by one gene of its [`StrategyWeights`]. Which features count depends on the
//! [`Phase`] of the game; the trap features count in every phase.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use trike_engine::{Cell, GameState, Player};

use crate::Agent;

pub mod features;

/// One tunable aspect of strategic play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Gene {
    #[display("center_control")]
    CenterControl,
    #[display("corner_avoidance")]
    CornerAvoidance,
    #[display("side_preference")]
    SidePreference,
    #[display("corner_capture")]
    CornerCapture,
    #[display("influence_maximization")]
    InfluenceMaximization,
    #[display("opponent_influence_reduction")]
    OpponentInfluenceReduction,
    #[display("trap_avoidance")]
    TrapAvoidance,
    #[display("region_separation")]
    RegionSeparation,
    #[display("enemy_pocket_filling")]
    EnemyPocketFilling,
    #[display("own_pocket_avoidance")]
    OwnPocketAvoidance,
    #[display("stone_burial")]
    StoneBurial,
    #[display("corridor_control")]
    CorridorControl,
    #[display("closing_avoidance")]
    ClosingAvoidance,
    #[display("endpoint_manipulation")]
    EndpointManipulation,
    #[display("set_trap")]
    SetTrap,
    #[display("extend_trap")]
    ExtendTrap,
    #[display("multiple_traps")]
    MultipleTraps,
    #[display("sacrifice_trap")]
    SacrificeTrap,
    #[display("defuse_inside")]
    DefuseInside,
    #[display("defuse_downstream")]
    DefuseDownstream,
    #[display("lock_away_traps")]
    LockAwayTraps,
}

impl Gene {
    pub const COUNT: usize = 21;
    pub const ALL: [Self; Self::COUNT] = [
        Self::CenterControl,
        Self::CornerAvoidance,
        Self::SidePreference,
        Self::CornerCapture,
        Self::InfluenceMaximization,
        Self::OpponentInfluenceReduction,
        Self::TrapAvoidance,
        Self::RegionSeparation,
        Self::EnemyPocketFilling,
        Self::OwnPocketAvoidance,
        Self::StoneBurial,
        Self::CorridorControl,
        Self::ClosingAvoidance,
        Self::EndpointManipulation,
        Self::SetTrap,
        Self::ExtendTrap,
        Self::MultipleTraps,
        Self::SacrificeTrap,
        Self::DefuseInside,
        Self::DefuseDownstream,
        Self::LockAwayTraps,
    ];

    /// Position of the gene in [`StrategyWeights::as_array`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Gene values of a [`StrategicAgent`], each in `0..=100`.
///
/// Serialized as a plain array in [`Gene::ALL`] order; out-of-range values are clamped
/// on the way in.
///
/// ```
/// use trike_ai::strategic::{Gene, StrategyWeights};
///
/// let w = StrategyWeights::BALANCED.with(Gene::SetTrap, 90);
/// assert_eq!(w.get(Gene::SetTrap), 90);
/// assert_eq!(w.to_string().parse::<StrategyWeights>().unwrap(), w);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[i64; Gene::COUNT]", into = "[u8; Gene::COUNT]")]
pub struct StrategyWeights([u8; Gene::COUNT]);

impl Default for StrategyWeights {
    fn default() -> Self {
        Self::BALANCED
    }
}

impl StrategyWeights {
    pub const MAX: u8 = 100;
    pub const BALANCED: Self = Self([50; Gene::COUNT]);

    #[must_use]
    pub fn clamped(raw: [i64; Gene::COUNT]) -> Self {
        Self(raw.map(|v| u8::try_from(v.clamp(0, i64::from(Self::MAX))).unwrap_or(Self::MAX)))
    }

    #[must_use]
    pub fn get(&self, gene: Gene) -> u8 {
        self.0[gene.index()]
    }

    #[must_use]
    pub fn with(mut self, gene: Gene, value: u8) -> Self {
        self.0[gene.index()] = value.min(Self::MAX);
        self
    }

    #[must_use]
    pub fn as_array(&self) -> [u8; Gene::COUNT] {
        self.0
    }

    /// Sum of absolute per-gene differences.
    #[must_use]
    pub fn l1_distance(&self, other: &Self) -> u32 {
        self.0
            .iter()
            .zip(other.0)
            .map(|(&a, b)| u32::from(a.abs_diff(b)))
            .sum()
    }

    fn factor(&self, gene: Gene) -> f64 {
        f64::from(self.get(gene))
    }
}

impl From<StrategyWeights> for [u8; Gene::COUNT] {
    fn from(weights: StrategyWeights) -> Self {
        weights.0
    }
}

impl TryFrom<[i64; Gene::COUNT]> for StrategyWeights {
    type Error = std::convert::Infallible;

    fn try_from(raw: [i64; Gene::COUNT]) -> Result<Self, Self::Error> {
        Ok(Self::clamped(raw))
    }
}

impl fmt::Display for StrategyWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid strategy weights {input:?}: expected 21 comma-separated integers")]
pub struct ParseStrategyError {
    pub input: String,
}

impl FromStr for StrategyWeights {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseStrategyError { input: s.to_owned() };
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<i64>().map_err(|_| err()))
            .collect::<Result<Vec<_>, _>>()?;
        let raw: [i64; Gene::COUNT] = parts.try_into().map_err(|_| err())?;
        Ok(Self::clamped(raw))
    }
}

/// Stage of the game by the share of cells holding a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Phase {
    #[display("early")]
    Early,
    #[display("middle")]
    Middle,
    #[display("mid-late")]
    MidLate,
    #[display("late")]
    Late,
}

impl Phase {
    /// Early below 20% filled, middle below 40%, mid-late below 70%, late after that.
    #[must_use]
    pub fn of<S: GameState>(state: &S) -> Self {
        let cells = state.cells();
        let filled = cells.iter().filter(|&&c| state.marker(c).is_some()).count();
        let ratio = as_f64(filled) / as_f64(cells.len().max(1));
        if ratio < 0.2 {
            Self::Early
        } else if ratio < 0.4 {
            Self::Middle
        } else if ratio < 0.7 {
            Self::MidLate
        } else {
            Self::Late
        }
    }
}

#[expect(clippy::cast_precision_loss)]
fn as_f64(n: usize) -> f64 {
    n as f64
}

fn leads<S: GameState>(state: &S, player: Player) -> bool {
    let outcome = state.outcome();
    outcome[player.index()] > outcome[player.opponent().index()]
}

/// Greedy one-ply player scoring moves with weighted positional features.
///
/// Deterministic: a move that ends the game with the mover ahead is always taken, and
/// ties between equally scored moves go to the first in legal-move order.
#[derive(Debug, Clone)]
pub struct StrategicAgent {
    name: String,
    weights: StrategyWeights,
}

impl StrategicAgent {
    #[must_use]
    pub fn new(weights: StrategyWeights) -> Self {
        Self {
            name: "Strategic".to_owned(),
            weights,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn weights(&self) -> StrategyWeights {
        self.weights
    }

    /// Weighted feature score of playing `mv` in `state`, from the mover's view.
    #[must_use]
    pub fn score_move<S: GameState>(&self, state: &S, mv: Cell) -> f64 {
        let next = state.apply(mv);
        let phase_score = match Phase::of(state) {
            Phase::Early => self.early(state, mv),
            Phase::Middle => self.middle(state, &next, mv),
            Phase::MidLate => self.mid_late(state, mv),
            Phase::Late => self.late(state, &next),
        };
        phase_score + self.traps(state, &next, mv)
    }

    fn early<S: GameState>(&self, state: &S, mv: Cell) -> f64 {
        let w = &self.weights;
        let size = state.board_size();
        let mut score = 0.0;
        if mv == state.center() {
            score += w.factor(Gene::CenterControl) * 0.01;
        }
        if features::is_corner(size, mv) {
            score -= w.factor(Gene::CornerAvoidance) * 0.01;
        }
        if features::is_side(size, mv) {
            score += w.factor(Gene::SidePreference) * 0.005;
        }
        if features::is_corner_adjacent(state, mv) {
            score += w.factor(Gene::CornerCapture) * 0.008;
        }
        score
    }

    fn middle<S: GameState>(&self, state: &S, next: &S, mv: Cell) -> f64 {
        let w = &self.weights;
        let me = state.current_player();
        let mut score = features::influence(state, mv, me) * w.factor(Gene::InfluenceMaximization) * 0.01
            + as_f64(features::opponent_contact(state, mv, me))
                * w.factor(Gene::OpponentInfluenceReduction)
                * 0.01;
        if next.is_terminal() && !leads(next, me) {
            score -= w.factor(Gene::TrapAvoidance) * 0.02;
        }
        if features::is_split(next) {
            let separation: i32 = features::regions(next)
                .iter()
                .map(|region| features::region_control(next, region, me))
                .sum();
            score += f64::from(separation) * w.factor(Gene::RegionSeparation) * 0.01;
        }
        score
    }

    fn mid_late<S: GameState>(&self, state: &S, mv: Cell) -> f64 {
        let w = &self.weights;
        let me = state.current_player();
        let mut score = 0.0;
        for pocket in features::regions(state).iter().filter(|r| r.len() <= 3) {
            if !pocket.contains(&mv) {
                continue;
            }
            match features::region_owner(state, pocket) {
                Some(owner) if owner == me => score -= w.factor(Gene::OwnPocketAvoidance) * 0.015,
                Some(_) => score += w.factor(Gene::EnemyPocketFilling) * 0.015,
                None => {}
            }
        }
        score + f64::from(features::burial(state, mv, me)) * w.factor(Gene::StoneBurial) * 0.01
    }

    fn late<S: GameState>(&self, state: &S, next: &S) -> f64 {
        let w = &self.weights;
        let me = state.current_player();
        let mut score = 0.0;
        if state.pawn().is_some() {
            let narrowing = as_f64(state.legal_moves().len()) - as_f64(next.legal_moves().len());
            score += narrowing * w.factor(Gene::CorridorControl) * 0.01;
        }
        if features::is_split(next) {
            let penalty: i32 = features::regions(next)
                .iter()
                .map(|region| features::region_control(state, region, me))
                .filter(|&control| control < 0)
                .map(i32::abs)
                .sum();
            score -= f64::from(penalty) * w.factor(Gene::ClosingAvoidance) * 0.01;
        }
        score + f64::from(features::endpoint_control(next, me)) * w.factor(Gene::EndpointManipulation) * 0.01
    }

    fn traps<S: GameState>(&self, state: &S, next: &S, mv: Cell) -> f64 {
        let w = &self.weights;
        let me = state.current_player();
        let opponent = me.opponent();
        let mut score = 0.0;

        let trap_count = features::traps(next, me).len();
        let sets_trap = trap_count > 0;
        if sets_trap {
            score += w.factor(Gene::SetTrap) * 0.02;
        }
        let friendly = state
            .neighbors(mv)
            .into_iter()
            .filter(|&n| state.marker(n) == Some(me))
            .count();
        if friendly >= 2 {
            score += w.factor(Gene::ExtendTrap) * 0.015;
        }
        if trap_count > 1 {
            score += w.factor(Gene::MultipleTraps) * 0.025 * as_f64(trap_count - 1);
        }

        let (mut lost, mut removed) = (0_i32, 0_i32);
        for cell in features::empty_cells(state) {
            if features::is_trap(state, cell, me) && !features::is_trap(next, cell, me) {
                lost += 1;
            }
            if features::is_trap(state, cell, opponent) && !features::is_trap(next, cell, opponent) {
                removed += 1;
            }
        }
        score += f64::from(removed - lost) * w.factor(Gene::SacrificeTrap) * 0.01;

        if features::is_trap(state, mv, opponent) {
            score += w.factor(Gene::DefuseInside) * 0.018;
        }
        if sets_trap && state.pawn().is_some_and(|pawn| pawn.manhattan_distance(mv) > 2) {
            score += w.factor(Gene::DefuseDownstream) * 0.016;
        }
        let locks_away = features::detached_regions(next)
            .iter()
            .flatten()
            .any(|&cell| features::is_trap(next, cell, opponent));
        if locks_away {
            score += w.factor(Gene::LockAwayTraps) * 0.017;
        }
        score
    }
}

impl<S: GameState> Agent<S> for StrategicAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&mut self, state: &S) -> Option<Cell> {
        let moves = state.legal_moves();
        if let [only] = moves.as_slice() {
            return Some(*only);
        }
        let me = state.current_player();
        if let Some(&winning) = moves.iter().find(|&&mv| {
            let next = state.apply(mv);
            next.is_terminal() && leads(&next, me)
        }) {
            return Some(winning);
        }
        let mut best: Option<(Cell, f64)> = None;
        for mv in moves {
            let score = self.score_move(state, mv);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((mv, score));
            }
        }
        tracing::trace!(agent = %self.name, phase = %Phase::of(state), ?best, "scored moves");
        best.map(|(mv, _)| mv)
    }

    fn reset(&mut self) {}
}
