//! Genetic operators on strategic feature weights.
//!
//! The counterpart of [`weights`](crate::weights) for [`StrategyWeights`]. Genes are
//! independent values in `0..=100` with no shared total, so the operators clamp instead
//! of renormalizing.

use rand::{Rng, seq::IndexedRandom as _};
use trike_ai::strategic::{Gene, StrategyWeights};

use crate::weights::{MutationKind, step};

/// Chance that a gene is touched by [`mutate`].
pub const GENE_MUTATION_RATE: f64 = 0.25;

/// Every gene uniform in `0..=100`.
pub fn random<R>(rng: &mut R) -> StrategyWeights
where
    R: Rng + ?Sized,
{
    StrategyWeights::clamped(std::array::from_fn(|_| rng.random_range(0..=100)))
}

/// Swaps the genes after a split point drawn from `1..Gene::COUNT`.
pub fn single_point<R>(
    p1: &StrategyWeights,
    p2: &StrategyWeights,
    rng: &mut R,
) -> (StrategyWeights, StrategyWeights)
where
    R: Rng + ?Sized,
{
    single_point_at(p1, p2, rng.random_range(1..Gene::COUNT))
}

#[must_use]
pub fn single_point_at(
    p1: &StrategyWeights,
    p2: &StrategyWeights,
    point: usize,
) -> (StrategyWeights, StrategyWeights) {
    let a = p1.as_array().map(i64::from);
    let b = p2.as_array().map(i64::from);
    let mut c1 = a;
    let mut c2 = b;
    c1[point..].copy_from_slice(&b[point..]);
    c2[point..].copy_from_slice(&a[point..]);
    (StrategyWeights::clamped(c1), StrategyWeights::clamped(c2))
}

/// Per-gene weighted average, with a fresh ratio in `[0.3, 0.7]` for every gene.
#[expect(clippy::cast_possible_truncation)]
pub fn blend<R>(
    p1: &StrategyWeights,
    p2: &StrategyWeights,
    rng: &mut R,
) -> (StrategyWeights, StrategyWeights)
where
    R: Rng + ?Sized,
{
    let a = p1.as_array().map(f64::from);
    let b = p2.as_array().map(f64::from);
    let ratios: [f64; Gene::COUNT] = std::array::from_fn(|_| rng.random_range(0.3..=0.7));
    let mix = |flip: bool| {
        StrategyWeights::clamped(std::array::from_fn(|i| {
            let t = if flip { 1.0 - ratios[i] } else { ratios[i] };
            (t * a[i] + (1.0 - t) * b[i]).round() as i64
        }))
    };
    (mix(false), mix(true))
}

/// Steps each gene with probability [`GENE_MUTATION_RATE`], at least one gene per call,
/// and clamps the result to `0..=100`.
pub fn mutate<R>(
    weights: &StrategyWeights,
    amount: u32,
    kind: MutationKind,
    rng: &mut R,
) -> StrategyWeights
where
    R: Rng + ?Sized,
{
    let mut raw = weights.as_array().map(i64::from);
    let mut genes = Gene::ALL
        .iter()
        .filter(|_| rng.random_bool(GENE_MUTATION_RATE))
        .copied()
        .collect::<Vec<_>>();
    if genes.is_empty() {
        genes.extend(Gene::ALL.choose(rng));
    }
    let bound = i64::from(amount);
    for gene in genes {
        raw[gene.index()] += step(bound, kind, rng);
    }
    StrategyWeights::clamped(raw)
}

/// L1 distance rescaled so that opposite extremes are 200 apart.
#[must_use]
pub fn distance(a: &StrategyWeights, b: &StrategyWeights) -> u32 {
    let genes = u32::try_from(Gene::COUNT).unwrap_or(u32::MAX);
    a.l1_distance(b) * 2 / genes
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn in_range(w: &StrategyWeights) -> bool {
        w.as_array().iter().all(|&g| g <= 100)
    }

    #[test]
    fn test_single_point_swaps_tails() {
        let low = StrategyWeights::clamped([0; Gene::COUNT]);
        let high = StrategyWeights::clamped([100; Gene::COUNT]);
        let (c1, c2) = single_point_at(&low, &high, 5);
        assert_eq!(c1.as_array()[..5], [0; 5]);
        assert!(c1.as_array()[5..].iter().all(|&g| g == 100));
        assert_eq!(c2.as_array()[..5], [100; 5]);
        assert_eq!(distance(&c1, &c2), 200);
    }

    #[test]
    fn test_blend_stays_between_parents() {
        let mut rng = Pcg32::seed_from_u64(0);
        let low = StrategyWeights::clamped([20; Gene::COUNT]);
        let high = StrategyWeights::clamped([80; Gene::COUNT]);
        for _ in 0..50 {
            let (c1, c2) = blend(&low, &high, &mut rng);
            for (x, y) in c1.as_array().into_iter().zip(c2.as_array()) {
                assert!((38..=62).contains(&x), "{c1}");
                assert_eq!(x + y, 100, "{c1} / {c2}");
            }
        }
    }

    #[test]
    fn test_mutate_changes_something_and_clamps() {
        let mut rng = Pcg32::seed_from_u64(1);
        let edge = StrategyWeights::clamped([100; Gene::COUNT]);
        for kind in [MutationKind::Uniform, MutationKind::Gaussian] {
            for _ in 0..100 {
                let child = mutate(&edge, 30, kind, &mut rng);
                assert!(in_range(&child), "{child}");
            }
        }
        let base = StrategyWeights::BALANCED;
        let changed = (0..50)
            .filter(|_| mutate(&base, 20, MutationKind::Uniform, &mut rng) != base)
            .count();
        assert!(changed > 40, "{changed}");
        assert_eq!(mutate(&base, 0, MutationKind::Uniform, &mut rng), base);
    }

    #[test]
    fn test_random_covers_range() {
        let mut rng = Pcg32::seed_from_u64(2);
        let samples = (0..50).map(|_| random(&mut rng)).collect::<Vec<_>>();
        assert!(samples.iter().all(in_range));
        assert!(samples.iter().any(|w| w.get(Gene::SetTrap) < 30));
        assert!(samples.iter().any(|w| w.get(Gene::SetTrap) > 70));
    }
}
