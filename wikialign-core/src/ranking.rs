//! Rank evaluation of a similarity mapping.
//!
//! For each property, its row is sorted by ascending distance and the
//! 1-based position of the property itself is recorded. A perfect mapping
//! places every property at position 1.

use std::collections::{BTreeMap, BTreeSet};

use crate::{CityProperties, SimilarityMapping};

/// Histogram of 1-based positions mapped to how many properties landed there.
pub type PositionHistogram = BTreeMap<usize, u64>;

/// Rank every property against its own row.
///
/// Positions `1..=len` are always present, zero-filled. Rows that do not
/// contain their own property are skipped. Equal distances are ordered by
/// property id.
///
/// # Examples
///
/// ```
/// use wikialign_core::{ComparisonMode, SimilarityMapping, rank_positions};
///
/// let mut mapping = SimilarityMapping::new(ComparisonMode::Euclidean);
/// mapping.insert("P1", "P1", 0.1);
/// mapping.insert("P1", "P2", 0.9);
/// mapping.insert("P2", "P1", 0.2);
/// mapping.insert("P2", "P2", 0.5);
/// let histogram = rank_positions(&mapping);
/// assert_eq!(histogram.get(&1), Some(&1));
/// assert_eq!(histogram.get(&2), Some(&1));
/// ```
#[must_use]
pub fn rank_positions(mapping: &SimilarityMapping) -> PositionHistogram {
    let mut histogram: PositionHistogram = (1..=mapping.len()).map(|p| (p, 0)).collect();
    for (id, row) in mapping.rows() {
        if let Some(position) = position_in_row(id, row) {
            *histogram.entry(position).or_insert(0) += 1;
        }
    }
    histogram
}

fn position_in_row(id: &str, row: &BTreeMap<String, f32>) -> Option<usize> {
    let own = *row.get(id)?;
    let closer = row
        .iter()
        .filter(|&(other, &distance)| {
            other.as_str() != id
                && distance
                    .total_cmp(&own)
                    .then_with(|| other.as_str().cmp(id))
                    .is_lt()
        })
        .count();
    Some(closer.saturating_add(1))
}

/// Rank properties within each city and sum the histograms.
///
/// Each city's mapping is restricted to the properties that city has.
#[must_use]
pub fn rank_positions_per_city(
    mapping: &SimilarityMapping,
    city_properties: &CityProperties,
) -> PositionHistogram {
    let mut total: PositionHistogram = (1..=mapping.len()).map(|p| (p, 0)).collect();
    for properties in city_properties.values() {
        let ids: BTreeSet<String> = properties.keys().cloned().collect();
        let restricted = mapping.restrict_to(&ids);
        for (position, count) in rank_positions(&restricted) {
            *total.entry(position).or_insert(0) += count;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CityProperty, ComparisonMode};
    use rstest::{fixture, rstest};

    #[fixture]
    fn mapping() -> SimilarityMapping {
        let mut mapping = SimilarityMapping::new(ComparisonMode::Euclidean);
        let rows = [
            ("P1", [("P1", 0.1), ("P2", 0.5), ("P3", 0.9)]),
            ("P2", [("P1", 0.2), ("P2", 0.3), ("P3", 0.4)]),
            ("P3", [("P1", 0.1), ("P2", 0.2), ("P3", 0.3)]),
        ];
        for (from, row) in rows {
            for (to, distance) in row {
                mapping.insert(from, to, distance);
            }
        }
        mapping
    }

    #[rstest]
    fn ranks_each_property_in_its_row(mapping: SimilarityMapping) {
        let histogram = rank_positions(&mapping);
        assert_eq!(
            histogram,
            PositionHistogram::from([(1, 1), (2, 1), (3, 1)])
        );
    }

    #[rstest]
    fn ties_order_by_id() {
        let mut mapping = SimilarityMapping::new(ComparisonMode::Euclidean);
        mapping.insert("P2", "P1", 0.5);
        mapping.insert("P2", "P2", 0.5);
        let histogram = rank_positions(&mapping);
        assert_eq!(histogram.get(&2), Some(&1));
    }

    #[rstest]
    fn sums_city_histograms(mapping: SimilarityMapping) {
        let property = |id: &str| {
            (
                id.to_owned(),
                CityProperty {
                    id: id.to_owned(),
                    label_en: None,
                    label_nl: None,
                },
            )
        };
        let cities = CityProperties::from([
            ("Amsterdam".to_owned(), BTreeMap::from([property("P1"), property("P2")])),
            ("Utrecht".to_owned(), BTreeMap::from([property("P3"), property("P9")])),
        ]);
        let histogram = rank_positions_per_city(&mapping, &cities);
        // Amsterdam: P1 first, P2 second (0.2 < 0.3). Utrecht: P3 alone.
        assert_eq!(histogram.get(&1), Some(&2));
        assert_eq!(histogram.get(&2), Some(&1));
        assert_eq!(histogram.get(&3), Some(&0));
    }
}
