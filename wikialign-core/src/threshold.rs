//! Grid search for the largest distance threshold that keeps precision above
//! a target.
//!
//! Every mapping entry is a binary example: the label is "both ids are the
//! same property" and the prediction is "distance is below the threshold".
//! The threshold starts at a baseline and is raised by a fixed increment
//! until precision no longer exceeds the target; the last threshold that
//! still exceeded it is returned.
//!
//! Precision with no positive predictions counts as zero, so a search whose
//! first step predicts nothing stops at the baseline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ConfusionCounts, SimilarityMapping};

/// Default step added to the threshold on each iteration.
pub const DEFAULT_INCREMENT: f32 = 0.005;
/// Default starting threshold.
pub const DEFAULT_BASELINE: f32 = 0.0;
/// Starting threshold of the alternative search variant.
pub const ALTERNATIVE_BASELINE: f32 = 0.5;

/// Parameters of a threshold search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSearch {
    /// Precision the search must stay above.
    pub min_precision: f64,
    /// Step added to the threshold on each iteration.
    pub increment: f32,
    /// Starting threshold.
    pub baseline: f32,
}

impl Default for ThresholdSearch {
    fn default() -> Self {
        Self {
            min_precision: 0.8,
            increment: DEFAULT_INCREMENT,
            baseline: DEFAULT_BASELINE,
        }
    }
}

impl ThresholdSearch {
    /// Search for `min_precision` with the default increment and baseline.
    #[must_use]
    pub fn new(min_precision: f64) -> Self {
        Self {
            min_precision,
            ..Self::default()
        }
    }

    /// Override the increment.
    #[must_use]
    pub const fn with_increment(mut self, increment: f32) -> Self {
        self.increment = increment;
        self
    }

    /// Override the baseline.
    #[must_use]
    pub const fn with_baseline(mut self, baseline: f32) -> Self {
        self.baseline = baseline;
        self
    }

    /// Check the parameters.
    ///
    /// # Errors
    /// Returns [`ThresholdError`] for a non-positive or non-finite increment,
    /// a target outside `[0, 1]`, or a non-finite baseline.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        if !(self.increment.is_finite() && self.increment > 0.0) {
            return Err(ThresholdError::InvalidIncrement {
                increment: self.increment,
            });
        }
        if !(0.0..=1.0).contains(&self.min_precision) {
            return Err(ThresholdError::InvalidPrecision {
                min_precision: self.min_precision,
            });
        }
        if !self.baseline.is_finite() {
            return Err(ThresholdError::InvalidBaseline {
                baseline: self.baseline,
            });
        }
        Ok(())
    }
}

/// Errors raised by [`find_threshold`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ThresholdError {
    /// The increment must be positive and finite.
    #[error("threshold increment must be positive and finite, got {increment}")]
    InvalidIncrement {
        /// Rejected increment.
        increment: f32,
    },
    /// The precision target must lie in `[0, 1]`.
    #[error("minimum precision must be between 0 and 1, got {min_precision}")]
    InvalidPrecision {
        /// Rejected target.
        min_precision: f64,
    },
    /// The baseline must be finite.
    #[error("threshold baseline must be finite, got {baseline}")]
    InvalidBaseline {
        /// Rejected baseline.
        baseline: f32,
    },
    /// The mapping holds no finite distance to search over.
    #[error("similarity mapping contains no finite distances")]
    EmptyMapping,
}

/// One iteration of the search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStep {
    /// Threshold evaluated at this step.
    pub threshold: f32,
    /// Precision at `threshold`.
    pub precision: f64,
    /// Confusion counts at `threshold`.
    pub counts: ConfusionCounts,
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Precision dropped to or below the target.
    PrecisionReached,
    /// The threshold passed every finite distance while precision still
    /// exceeded the target; raising it further cannot change any prediction.
    Saturated,
}

/// Result of [`find_threshold`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    /// Last threshold whose precision exceeded the target.
    pub threshold: f32,
    /// Why the search stopped.
    pub outcome: SearchOutcome,
    /// Every evaluated step in order.
    pub steps: Vec<ThresholdStep>,
}

/// Classify every mapping entry at `threshold`.
#[must_use]
pub fn evaluate_threshold(mapping: &SimilarityMapping, threshold: f32) -> ConfusionCounts {
    ConfusionCounts::from_pairs(
        mapping
            .entries()
            .map(|(from, to, distance)| (from == to, distance < threshold)),
    )
}

/// Raise the threshold until precision is no longer above the target.
///
/// # Errors
/// Returns [`ThresholdError`] for invalid parameters or a mapping without
/// finite distances.
///
/// # Examples
///
/// ```
/// use wikialign_core::{ComparisonMode, SimilarityMapping, ThresholdSearch, find_threshold};
///
/// let mut mapping = SimilarityMapping::new(ComparisonMode::Euclidean);
/// mapping.insert("P1", "P1", 0.002);
/// mapping.insert("P1", "P2", 5.0);
/// let result = find_threshold(&mapping, &ThresholdSearch::new(0.8).with_increment(0.001))?;
/// assert!(result.threshold >= 0.002);
/// # Ok::<(), wikialign_core::ThresholdError>(())
/// ```
#[expect(
    clippy::float_arithmetic,
    reason = "the threshold advances by a fixed floating-point increment"
)]
pub fn find_threshold(
    mapping: &SimilarityMapping,
    search: &ThresholdSearch,
) -> Result<ThresholdResult, ThresholdError> {
    search.validate()?;
    let ceiling = mapping
        .max_finite_distance()
        .ok_or(ThresholdError::EmptyMapping)?;

    let mut threshold = search.baseline;
    let mut steps = Vec::new();
    loop {
        let previous = threshold;
        threshold += search.increment;
        if threshold <= previous {
            // The increment vanished at this magnitude; nothing can change.
            return Ok(finish(previous, SearchOutcome::Saturated, steps));
        }
        let counts = evaluate_threshold(mapping, threshold);
        let precision = counts.precision();
        log::debug!("threshold {threshold}: precision {precision:.4} ({counts:?})");
        steps.push(ThresholdStep {
            threshold,
            precision,
            counts,
        });
        if precision <= search.min_precision {
            return Ok(finish(previous, SearchOutcome::PrecisionReached, steps));
        }
        if threshold > ceiling {
            return Ok(finish(threshold, SearchOutcome::Saturated, steps));
        }
    }
}

fn finish(threshold: f32, outcome: SearchOutcome, steps: Vec<ThresholdStep>) -> ThresholdResult {
    log::info!(
        "threshold search stopped at {threshold} after {} steps ({outcome:?})",
        steps.len()
    );
    ThresholdResult {
        threshold,
        outcome,
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComparisonMode;
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn mapping() -> SimilarityMapping {
        let mut mapping = SimilarityMapping::new(ComparisonMode::Euclidean);
        mapping.insert("P1", "P1", 0.01);
        mapping.insert("P1", "P2", 5.0);
        mapping
    }

    #[rstest]
    fn separates_match_from_non_match(mapping: SimilarityMapping) {
        let counts = evaluate_threshold(&mapping, 0.05);
        assert_eq!(counts.true_positives, 1);
        assert_eq!(counts.true_negatives, 1);
        assert_eq!(counts.precision(), 1.0);
    }

    #[rstest]
    fn stops_at_baseline_when_first_step_predicts_nothing(mapping: SimilarityMapping) {
        let result = find_threshold(&mapping, &ThresholdSearch::new(0.8)).expect("search");
        assert_eq!(result.outcome, SearchOutcome::PrecisionReached);
        assert_eq!(result.threshold, 0.0);
        assert_eq!(result.steps.len(), 1);
    }

    #[rstest]
    fn returns_last_threshold_above_target() {
        let mut mapping = SimilarityMapping::new(ComparisonMode::Euclidean);
        mapping.insert("P1", "P1", 0.0);
        mapping.insert("P2", "P2", 0.0);
        mapping.insert("P1", "P2", 0.25);
        mapping.insert("P2", "P1", 0.35);
        let search = ThresholdSearch::new(0.7).with_increment(0.1);

        let result = find_threshold(&mapping, &search).expect("search");

        // 0.1..0.2 predict only matches (precision 1.0), 0.3 adds one false
        // positive (2/3), which is at or below 0.7.
        assert_eq!(result.outcome, SearchOutcome::PrecisionReached);
        assert!((result.threshold - 0.2).abs() < 1e-6);
        assert_eq!(result.steps.len(), 3);
    }

    #[rstest]
    fn saturates_when_precision_never_drops() {
        let mut mapping = SimilarityMapping::new(ComparisonMode::Euclidean);
        mapping.insert("P1", "P1", 0.0);
        mapping.insert("P2", "P2", 0.1);
        let search = ThresholdSearch::new(0.5).with_increment(0.05);

        let result = find_threshold(&mapping, &search).expect("search");

        assert_eq!(result.outcome, SearchOutcome::Saturated);
        assert!(result.threshold > 0.1);
    }

    #[rstest]
    fn alternative_baseline_starts_higher(mapping: SimilarityMapping) {
        let search = ThresholdSearch::new(0.8).with_baseline(ALTERNATIVE_BASELINE);
        let result = find_threshold(&mapping, &search).expect("search");
        assert!(result.steps.iter().all(|step| step.threshold > 0.5));
    }

    #[rstest]
    #[case(ThresholdSearch::new(0.8).with_increment(0.0))]
    #[case(ThresholdSearch::new(0.8).with_increment(f32::NAN))]
    #[case(ThresholdSearch::new(1.5))]
    #[case(ThresholdSearch::new(0.8).with_baseline(f32::INFINITY))]
    fn rejects_invalid_parameters(mapping: SimilarityMapping, #[case] search: ThresholdSearch) {
        assert!(find_threshold(&mapping, &search).is_err());
    }

    #[rstest]
    fn rejects_empty_mapping() {
        let empty = SimilarityMapping::new(ComparisonMode::Euclidean);
        assert_eq!(
            find_threshold(&empty, &ThresholdSearch::default()),
            Err(ThresholdError::EmptyMapping)
        );
    }

    fn arbitrary_mapping() -> impl Strategy<Value = SimilarityMapping> {
        proptest::collection::vec((0_u8..4, 0_u8..4, 0.0_f32..2.0), 1..24).prop_map(|entries| {
            let mut mapping = SimilarityMapping::new(ComparisonMode::Euclidean);
            for (from, to, distance) in entries {
                mapping.insert(format!("P{from}"), format!("P{to}"), distance);
            }
            mapping
        })
    }

    proptest! {
        #[test]
        fn lower_targets_never_lower_the_threshold(
            mapping in arbitrary_mapping(),
            low in 0.0_f64..1.0,
            high in 0.0_f64..1.0,
        ) {
            let (low, high) = if low <= high { (low, high) } else { (high, low) };
            let search = |target| ThresholdSearch::new(target).with_increment(0.05);
            let loose = find_threshold(&mapping, &search(low)).expect("loose search");
            let strict = find_threshold(&mapping, &search(high)).expect("strict search");
            prop_assert!(loose.threshold >= strict.threshold);
        }
    }
}
