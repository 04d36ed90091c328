//! Summarise manually verified completions per alignment method.

use serde::{Deserialize, Serialize};

use crate::metrics::ratio;
use crate::{AlignmentMethod, CompletedCity};

/// Completion counts for one alignment method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodTally {
    /// Completions proposed.
    pub total: u64,
    /// Completions marked correct.
    pub correct: u64,
    /// Completions carrying any verification flag.
    pub verified: u64,
}

impl MethodTally {
    /// `correct / total`, or zero without completions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.total)
    }

    const fn record(&mut self, correct: Option<bool>) {
        self.total = self.total.saturating_add(1);
        if let Some(flag) = correct {
            self.verified = self.verified.saturating_add(1);
            if flag {
                self.correct = self.correct.saturating_add(1);
            }
        }
    }
}

/// Tallies for both alignment methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Completions proposed by value alignment.
    pub value: MethodTally,
    /// Completions proposed by embedding alignment.
    pub embedding: MethodTally,
}

impl EvaluationReport {
    /// Tally for `method`.
    #[must_use]
    pub const fn tally(&self, method: AlignmentMethod) -> &MethodTally {
        match method {
            AlignmentMethod::Value => &self.value,
            AlignmentMethod::Embedding => &self.embedding,
        }
    }
}

/// Count total and correct completions per method.
///
/// Unverified completions count towards the total but never as correct.
///
/// # Examples
///
/// ```
/// use wikialign_core::{Alignment, AlignmentMethod, City, CompletedCity, InfoboxCity, evaluate};
///
/// let city = CompletedCity {
///     city: InfoboxCity::new(City::new("Gouda", "Q1", "", "")),
///     completions: vec![
///         Alignment::new("Mayor", "Burgemeester", vec![], AlignmentMethod::Value).with_correct(true),
///         Alignment::new("Area", "Gebied", vec![], AlignmentMethod::Embedding).with_correct(false),
///     ],
/// };
/// let report = evaluate(&[city]);
/// assert_eq!(report.value.correct, 1);
/// assert_eq!(report.embedding.accuracy(), 0.0);
/// ```
#[must_use]
pub fn evaluate(cities: &[CompletedCity]) -> EvaluationReport {
    let mut report = EvaluationReport::default();
    for alignment in cities.iter().flat_map(|city| &city.completions) {
        let tally = match alignment.method {
            AlignmentMethod::Value => &mut report.value,
            AlignmentMethod::Embedding => &mut report.embedding,
        };
        tally.record(alignment.correct);
    }
    log::info!(
        "value alignment {}/{}, embedding alignment {}/{}",
        report.value.correct,
        report.value.total,
        report.embedding.correct,
        report.embedding.total
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Alignment;
    use crate::test_support::infobox_city;
    use rstest::rstest;

    fn completed(completions: Vec<Alignment>) -> CompletedCity {
        CompletedCity {
            city: infobox_city("Q1", &[], &[]),
            completions,
        }
    }

    #[rstest]
    fn tallies_each_method_separately() {
        let value = |correct| {
            Alignment::new("a", "b", vec![], AlignmentMethod::Value).with_correct(correct)
        };
        let unverified = Alignment::new("c", "d", vec![], AlignmentMethod::Embedding);
        let cities = vec![
            completed(vec![value(true), value(false)]),
            completed(vec![value(true), unverified]),
        ];

        let report = evaluate(&cities);

        assert_eq!(
            report.value,
            MethodTally {
                total: 3,
                correct: 2,
                verified: 3
            }
        );
        assert_eq!(report.tally(AlignmentMethod::Embedding).total, 1);
        assert_eq!(report.embedding.verified, 0);
        assert!((report.value.accuracy() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[rstest]
    fn empty_input_reports_zero_ratios() {
        let report = evaluate(&[]);
        assert_eq!(report, EvaluationReport::default());
        assert_eq!(report.value.accuracy(), 0.0);
    }
}
