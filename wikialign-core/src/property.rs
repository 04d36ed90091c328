//! Knowledge-graph properties and their frequency across the city corpus.
//!
//! A [`PropertyTable`] is built incrementally with a [`PropertyAccumulator`]
//! while cities are scanned and is frozen once [`PropertyAccumulator::finish`]
//! runs. Labels are attached afterwards because they are resolved in batches.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::Language;

/// English and Dutch labels of a property; either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyLabels {
    /// English label.
    pub en: Option<String>,
    /// Dutch label.
    pub nl: Option<String>,
}

/// A property as recorded against a single city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityProperty {
    /// Property identifier, for example `P1082`.
    pub id: String,
    /// English label, when one exists.
    pub label_en: Option<String>,
    /// Dutch label, when one exists.
    pub label_nl: Option<String>,
}

/// Per-city property listings keyed by city name and then property id.
pub type CityProperties = BTreeMap<String, BTreeMap<String, CityProperty>>;

/// A property with its corpus-wide frequency statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Property identifier, for example `P1082`.
    pub id: String,
    /// English label, when one exists.
    pub label_en: Option<String>,
    /// Dutch label, when one exists.
    pub label_nl: Option<String>,
    /// Number of cities whose claims include this property.
    pub absolute_frequency: u64,
    /// `absolute_frequency` divided by the number of cities scanned.
    pub relative_frequency: f64,
}

impl Property {
    /// Label in `language`, if present.
    #[must_use]
    pub fn label(&self, language: Language) -> Option<&str> {
        match language {
            Language::En => self.label_en.as_deref(),
            Language::Nl => self.label_nl.as_deref(),
        }
    }

    /// Return whether both the English and the Dutch label are known.
    #[must_use]
    pub const fn has_both_labels(&self) -> bool {
        self.label_en.is_some() && self.label_nl.is_some()
    }
}

/// Counts property occurrences city by city.
///
/// # Examples
///
/// ```
/// use wikialign_core::PropertyAccumulator;
///
/// let mut accumulator = PropertyAccumulator::default();
/// accumulator.record_city(["P17", "P1082"]);
/// accumulator.record_city(["P17"]);
/// let table = accumulator.finish();
///
/// let country = table.get("P17").expect("P17 recorded");
/// assert_eq!(country.absolute_frequency, 2);
/// assert_eq!(table.get("P1082").map(|p| p.relative_frequency), Some(0.5));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PropertyAccumulator {
    counts: BTreeMap<String, u64>,
    cities: u64,
}

impl PropertyAccumulator {
    /// Record the claim set of one city. Duplicate ids count once.
    pub fn record_city<I, S>(&mut self, claims: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = claims.into_iter().map(Into::into).collect();
        for id in unique {
            *self.counts.entry(id).or_insert(0) += 1;
        }
        self.cities += 1;
    }

    /// Number of cities recorded so far.
    #[must_use]
    pub const fn cities(&self) -> u64 {
        self.cities
    }

    /// Freeze the counts into a [`PropertyTable`] with unresolved labels.
    #[must_use]
    pub fn finish(self) -> PropertyTable {
        let total = self.cities;
        let properties = self
            .counts
            .into_iter()
            .map(|(id, absolute_frequency)| {
                let property = Property {
                    id: id.clone(),
                    label_en: None,
                    label_nl: None,
                    absolute_frequency,
                    relative_frequency: relative_frequency(absolute_frequency, total),
                };
                (id, property)
            })
            .collect();
        PropertyTable {
            total_cities: total,
            properties,
        }
    }
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "relative frequency is a ratio of two city counts"
)]
fn relative_frequency(absolute: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    absolute as f64 / total as f64
}

/// Frozen, frequency-annotated property table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyTable {
    total_cities: u64,
    properties: BTreeMap<String, Property>,
}

impl PropertyTable {
    /// Number of cities the frequencies were computed over.
    #[must_use]
    pub const fn total_cities(&self) -> u64 {
        self.total_cities
    }

    /// Look up a property by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Property> {
        self.properties.get(id)
    }

    /// Iterate over properties in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    /// Property ids in id order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Number of distinct properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Return whether no property was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Attach resolved labels. Ids absent from `labels` keep `None` labels;
    /// ids unknown to the table are ignored.
    pub fn apply_labels(&mut self, labels: &BTreeMap<String, PropertyLabels>) {
        for (id, property) in &mut self.properties {
            if let Some(resolved) = labels.get(id) {
                property.label_en.clone_from(&resolved.en);
                property.label_nl.clone_from(&resolved.nl);
            }
        }
    }

    /// Properties ordered by descending absolute frequency, then by id.
    #[must_use]
    pub fn sorted_by_frequency(&self) -> Vec<&Property> {
        let mut sorted: Vec<&Property> = self.properties.values().collect();
        sorted.sort_by(|a, b| {
            b.absolute_frequency
                .cmp(&a.absolute_frequency)
                .then_with(|| a.id.cmp(&b.id))
        });
        sorted
    }

    /// Describe a city's claims using the labels held in this table.
    ///
    /// Claims the table does not know are kept with empty labels.
    pub fn city_properties<I, S>(&self, claims: I) -> BTreeMap<String, CityProperty>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        claims
            .into_iter()
            .map(|claim| {
                let id: String = claim.into();
                let known = self.properties.get(&id);
                let property = CityProperty {
                    id: id.clone(),
                    label_en: known.and_then(|p| p.label_en.clone()),
                    label_nl: known.and_then(|p| p.label_nl.clone()),
                };
                (id, property)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn table() -> PropertyTable {
        let mut accumulator = PropertyAccumulator::default();
        accumulator.record_city(["P17", "P1082", "P17"]);
        accumulator.record_city(["P17", "P856"]);
        accumulator.record_city(["P17", "P1082"]);
        accumulator.record_city(Vec::<String>::new());
        accumulator.finish()
    }

    #[rstest]
    fn counts_each_city_once(table: PropertyTable) {
        assert_eq!(table.total_cities(), 4);
        assert_eq!(table.get("P17").map(|p| p.absolute_frequency), Some(3));
        assert_eq!(table.get("P856").map(|p| p.absolute_frequency), Some(1));
    }

    #[rstest]
    fn sorts_by_descending_frequency(table: PropertyTable) {
        let ids: Vec<&str> = table
            .sorted_by_frequency()
            .into_iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["P17", "P1082", "P856"]);
    }

    #[rstest]
    fn applies_labels_and_keeps_missing_as_none(mut table: PropertyTable) {
        let labels = BTreeMap::from([(
            "P1082".to_owned(),
            PropertyLabels {
                en: Some("population".to_owned()),
                nl: Some("inwonertal".to_owned()),
            },
        )]);
        table.apply_labels(&labels);
        let population = table.get("P1082").expect("P1082 present");
        assert!(population.has_both_labels());
        assert_eq!(population.label(Language::Nl), Some("inwonertal"));
        assert_eq!(table.get("P17").and_then(|p| p.label_en.clone()), None);
    }

    #[rstest]
    fn city_properties_reuse_table_labels(mut table: PropertyTable) {
        table.apply_labels(&BTreeMap::from([(
            "P17".to_owned(),
            PropertyLabels {
                en: Some("country".to_owned()),
                nl: None,
            },
        )]));
        let listed = table.city_properties(["P17", "P999"]);
        assert_eq!(
            listed.get("P17").and_then(|p| p.label_en.as_deref()),
            Some("country")
        );
        assert_eq!(listed.get("P999").and_then(|p| p.label_en.as_deref()), None);
    }

    #[rstest]
    fn property_round_trips_through_json(table: PropertyTable) {
        let property = table.get("P1082").expect("P1082 present").clone();
        let json = serde_json::to_string(&property).expect("serialise property");
        let decoded: Property = serde_json::from_str(&json).expect("deserialise property");
        assert_eq!(decoded, property);
    }

    #[rstest]
    fn empty_accumulator_yields_empty_table() {
        let table = PropertyAccumulator::default().finish();
        assert!(table.is_empty());
        assert_eq!(table.total_cities(), 0);
    }

    proptest! {
        #[test]
        fn relative_frequency_is_absolute_over_total(
            cities in proptest::collection::vec(
                proptest::collection::btree_set("P[0-9]{1,2}", 0..6),
                1..12,
            )
        ) {
            let mut accumulator = PropertyAccumulator::default();
            for claims in &cities {
                accumulator.record_city(claims.iter().cloned());
            }
            let table = accumulator.finish();
            let total = table.total_cities();
            prop_assert_eq!(total, cities.len() as u64);
            for property in table.iter() {
                let expected = cities
                    .iter()
                    .filter(|claims| claims.contains(&property.id))
                    .count() as u64;
                prop_assert_eq!(property.absolute_frequency, expected);
                prop_assert!((0.0..=1.0).contains(&property.relative_frequency));
                let ratio = property.absolute_frequency as f64 / total as f64;
                prop_assert!((property.relative_frequency - ratio).abs() < f64::EPSILON);
            }
        }
    }
}
