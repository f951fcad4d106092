//! Genetic operators on ensemble weightings.
//!
//! These are used by [`genetic::PopulationEvolver`](crate::genetic::PopulationEvolver)
//! to implement initialization, crossover and mutation. Every operator returns a
//! normalized [`EnsembleWeights`], so the population never holds an invalid weighting.
//!
//! # Operations
//!
//! - **Initialization**: [`random`]
//! - **Crossover**: [`single_point`] and [`blend`]
//! - **Mutation**: [`mutate`], with [`genome::adaptive_amount`](crate::genome::adaptive_amount)
//!   to scale the step size
//!
//! # Design Decisions
//!
//! ## Integer Percentages
//!
//! Weights are whole percentages rather than floats. The ensemble draws a strategy with a
//! roll in `0..100`, so finer resolution would not change behaviour, and integer genomes
//! compare and deduplicate exactly.
//!
//! ## Renormalization After Every Operator
//!
//! Crossover and mutation work on raw integers that may leave the simplex (negative
//! components, totals other than 100). [`EnsembleWeights::normalized`] puts them back:
//! every component is floored at 5 and the rest is rescaled to sum to 100.

use rand::{Rng, seq::IndexedRandom as _};
use rand_distr::{Distribution as _, Normal};
use serde::{Deserialize, Serialize};
use trike_ai::EnsembleWeights;

/// How crossover combines two parents.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::FromStr,
)]
pub enum CrossoverKind {
    /// Swap the tails of the two weight vectors after a random split point.
    #[default]
    SinglePoint,
    /// Per-component weighted average with a ratio drawn from `[0.3, 0.7]`.
    Blend,
}

/// Distribution of mutation steps.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::FromStr,
)]
pub enum MutationKind {
    /// Uniform integer step in `[-amount, amount]`.
    #[default]
    Uniform,
    /// Gaussian step with standard deviation `amount / 2`, clamped to `[-amount, amount]`.
    Gaussian,
}

/// Draws an initial weighting.
///
/// The minimax share is drawn from `20..=70`, the MCTS share from
/// `20..=100 - minimax`, and the random share takes the rest.
pub fn random<R>(rng: &mut R) -> EnsembleWeights
where
    R: Rng + ?Sized,
{
    let minimax = rng.random_range(20..=70);
    let mcts = rng.random_range(20..=100 - minimax);
    EnsembleWeights::normalized([minimax, mcts, 100 - minimax - mcts])
}

/// Single-point crossover.
///
/// Picks a split point in `1..=2` and swaps the components after it. The children are
/// renormalized, so swapped tails with different totals get rescaled:
///
/// ```
/// use trike_ai::EnsembleWeights;
/// use trike_training::weights;
///
/// let p1 = EnsembleWeights::normalized([50, 40, 10]);
/// let p2 = EnsembleWeights::normalized([50, 10, 40]);
/// let (c1, c2) = weights::single_point_at(&p1, &p2, 1);
/// assert_eq!(c1, p2);
/// assert_eq!(c2, p1);
/// ```
pub fn single_point<R>(
    p1: &EnsembleWeights,
    p2: &EnsembleWeights,
    rng: &mut R,
) -> (EnsembleWeights, EnsembleWeights)
where
    R: Rng + ?Sized,
{
    single_point_at(p1, p2, rng.random_range(1..=2))
}

/// Single-point crossover at a fixed split point.
#[must_use]
pub fn single_point_at(
    p1: &EnsembleWeights,
    p2: &EnsembleWeights,
    point: usize,
) -> (EnsembleWeights, EnsembleWeights) {
    let a = p1.as_array().map(i64::from);
    let b = p2.as_array().map(i64::from);
    let mut c1 = a;
    let mut c2 = b;
    c1[point..].copy_from_slice(&b[point..]);
    c2[point..].copy_from_slice(&a[point..]);
    (EnsembleWeights::normalized(c1), EnsembleWeights::normalized(c2))
}

/// Blend crossover.
///
/// With a ratio `t` drawn from `[0.3, 0.7]`, the children are `t * p1 + (1 - t) * p2`
/// and `(1 - t) * p1 + t * p2`, rounded per component.
pub fn blend<R>(
    p1: &EnsembleWeights,
    p2: &EnsembleWeights,
    rng: &mut R,
) -> (EnsembleWeights, EnsembleWeights)
where
    R: Rng + ?Sized,
{
    blend_with_ratio(p1, p2, rng.random_range(0.3..=0.7))
}

#[expect(clippy::cast_possible_truncation)]
fn blend_with_ratio(
    p1: &EnsembleWeights,
    p2: &EnsembleWeights,
    ratio: f64,
) -> (EnsembleWeights, EnsembleWeights) {
    let a = p1.as_array().map(f64::from);
    let b = p2.as_array().map(f64::from);
    let mix = |t: f64| {
        EnsembleWeights::normalized(std::array::from_fn(|i| {
            (t * a[i] + (1.0 - t) * b[i]).round() as i64
        }))
    };
    (mix(ratio), mix(1.0 - ratio))
}

/// Perturbs one or two randomly chosen components by up to `amount`.
pub fn mutate<R>(
    weights: &EnsembleWeights,
    amount: u32,
    kind: MutationKind,
    rng: &mut R,
) -> EnsembleWeights
where
    R: Rng + ?Sized,
{
    let mut raw = weights.as_array().map(i64::from);
    let bound = i64::from(amount);
    let count = rng.random_range(1..=2);
    let genes = [0, 1, 2]
        .choose_multiple(rng, count)
        .copied()
        .collect::<Vec<usize>>();
    for gene in genes {
        raw[gene] += step(bound, kind, rng);
    }
    EnsembleWeights::normalized(raw)
}

#[expect(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(crate) fn step<R>(bound: i64, kind: MutationKind, rng: &mut R) -> i64
where
    R: Rng + ?Sized,
{
    if bound == 0 {
        return 0;
    }
    match kind {
        MutationKind::Uniform => rng.random_range(-bound..=bound),
        MutationKind::Gaussian => {
            let sigma = bound as f64 / 2.0;
            let delta = Normal::new(0.0, sigma).map_or(0.0, |normal| normal.sample(rng));
            (delta.round() as i64).clamp(-bound, bound)
        }
    }
}
