use serde::{Deserialize, Serialize};

/// Spread of one generation's fitness values, as logged and stored per generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
}

impl FitnessStats {
    /// Returns `None` for an empty population.
    ///
    /// ```
    /// # use trike_training::stats::FitnessStats;
    /// let stats = FitnessStats::new([0.5, 0.0, 1.0, 0.25, 0.25]).unwrap();
    /// assert_eq!(stats.min, 0.0);
    /// assert_eq!(stats.max, 1.0);
    /// assert_eq!(stats.mean, 0.4);
    /// assert!(FitnessStats::new([]).is_none());
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new<I>(fitness: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let fitness = fitness.into_iter().collect::<Vec<_>>();
        let (&first, rest) = fitness.split_first()?;
        let (min, max) = rest
            .iter()
            .fold((first, first), |(lo, hi), &f| (lo.min(f), hi.max(f)));
        let count = fitness.len() as f64;
        let mean = fitness.iter().sum::<f64>() / count;
        let variance = fitness.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / count;
        Some(Self {
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_population_has_no_spread() {
        let stats = FitnessStats::new([0.5; 4]).unwrap();
        assert_eq!(stats.min, 0.5);
        assert_eq!(stats.max, 0.5);
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn test_unsorted_input() {
        let stats = FitnessStats::new([0.75, 0.0, 1.0, 0.25]).unwrap();
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 1.0);
        assert!((stats.mean - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev() {
        let stats = FitnessStats::new([0.0, 1.0]).unwrap();
        assert!((stats.std_dev - 0.5).abs() < 1e-12);
    }
}
