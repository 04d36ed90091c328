//! Binary classification metrics with zero-division treated as zero.

use serde::{Deserialize, Serialize};

/// Confusion matrix of boolean `(label, prediction)` pairs.
///
/// # Examples
///
/// ```
/// use wikialign_core::ConfusionCounts;
///
/// let counts = ConfusionCounts::from_pairs([(true, true), (false, false), (false, true)]);
/// assert_eq!(counts.precision(), 0.5);
/// assert_eq!(ConfusionCounts::default().precision(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    /// Labelled positive, predicted positive.
    pub true_positives: u64,
    /// Labelled negative, predicted positive.
    pub false_positives: u64,
    /// Labelled negative, predicted negative.
    pub true_negatives: u64,
    /// Labelled positive, predicted negative.
    pub false_negatives: u64,
}

impl ConfusionCounts {
    /// Tally `(label, prediction)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (bool, bool)>,
    {
        let mut counts = Self::default();
        for (label, prediction) in pairs {
            counts.record(label, prediction);
        }
        counts
    }

    /// Add one observation.
    pub const fn record(&mut self, label: bool, prediction: bool) {
        let slot = match (label, prediction) {
            (true, true) => &mut self.true_positives,
            (false, true) => &mut self.false_positives,
            (false, false) => &mut self.true_negatives,
            (true, false) => &mut self.false_negatives,
        };
        *slot = slot.saturating_add(1);
    }

    /// Number of observations.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.true_positives
            .saturating_add(self.false_positives)
            .saturating_add(self.true_negatives)
            .saturating_add(self.false_negatives)
    }

    /// `tp / (tp + fp)`, or zero without positive predictions.
    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives.saturating_add(self.false_positives),
        )
    }

    /// `tp / (tp + fn)`, or zero without positive labels.
    #[must_use]
    pub fn recall(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives.saturating_add(self.false_negatives),
        )
    }

    /// Harmonic mean of precision and recall, or zero when both are zero.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "F1 is a harmonic mean")]
    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        let sum = precision + recall;
        if sum == 0.0 {
            return 0.0;
        }
        2.0 * precision * recall / sum
    }

    /// Share of correct predictions, or zero without observations.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(
            self.true_positives.saturating_add(self.true_negatives),
            self.total(),
        )
    }
}

/// `numerator / denominator`, or zero when the denominator is zero.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "ratios of observation counts"
)]
pub fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn computes_all_metrics() {
        let counts = ConfusionCounts::from_pairs([
            (true, true),
            (true, true),
            (false, true),
            (true, false),
            (false, false),
        ]);
        assert_eq!(counts.total(), 5);
        assert!((counts.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((counts.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((counts.f1() - 2.0 / 3.0).abs() < 1e-12);
        assert!((counts.accuracy() - 0.6).abs() < 1e-12);
    }

    #[rstest]
    #[case(0, 0, 0.0)]
    #[case(3, 4, 0.75)]
    fn ratio_handles_zero_denominator(
        #[case] numerator: u64,
        #[case] denominator: u64,
        #[case] expected: f64,
    ) {
        assert!((ratio(numerator, denominator) - expected).abs() < f64::EPSILON);
    }

    #[rstest]
    fn empty_counts_score_zero() {
        let counts = ConfusionCounts::default();
        assert_eq!(counts.precision(), 0.0);
        assert_eq!(counts.recall(), 0.0);
        assert_eq!(counts.f1(), 0.0);
        assert_eq!(counts.accuracy(), 0.0);
    }
}
