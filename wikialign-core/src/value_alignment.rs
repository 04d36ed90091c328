//! Align infobox keys across languages by matching values.
//!
//! Two keys are evidence for each other whenever a city lists exactly the
//! same value lines under both. Counting that evidence over the corpus and
//! keeping the strongest Dutch partner for each English key yields the value
//! alignment map.

use std::collections::{BTreeMap, BTreeSet};

use crate::{AlignmentMap, InfoboxCity};

/// Co-occurrence counts: English key, then Dutch key, then the number of
/// cities where their values were identical.
pub type CooccurrenceCounts = BTreeMap<String, BTreeMap<String, u64>>;

/// Count identical-value key pairs across all cities.
///
/// Empty value lists are not evidence and are skipped.
#[must_use]
pub fn count_cooccurrences(cities: &[InfoboxCity]) -> CooccurrenceCounts {
    let mut counts = CooccurrenceCounts::new();
    for city in cities {
        record_city(&mut counts, city);
    }
    counts
}

fn record_city(counts: &mut CooccurrenceCounts, city: &InfoboxCity) {
    for (en_key, en_values) in &city.infobox_en {
        if en_values.is_empty() {
            continue;
        }
        for (nl_key, nl_values) in &city.infobox_nl {
            if en_values == nl_values {
                *counts
                    .entry(en_key.clone())
                    .or_default()
                    .entry(nl_key.clone())
                    .or_insert(0) += 1;
            }
        }
    }
}

/// Pick the Dutch key with the highest count for every English key.
///
/// Among tied maxima the lexicographically smallest Dutch key wins.
#[must_use]
pub fn select_best(counts: &CooccurrenceCounts) -> AlignmentMap {
    counts
        .iter()
        .filter_map(|(en_key, candidates)| {
            best_candidate(candidates).map(|nl_key| (en_key.clone(), nl_key.to_owned()))
        })
        .collect()
}

fn best_candidate(candidates: &BTreeMap<String, u64>) -> Option<&str> {
    let mut best: Option<(&str, u64)> = None;
    for (key, &count) in candidates {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((key.as_str(), count));
        }
    }
    best.map(|(key, _)| key)
}

/// Count co-occurrences and select the best Dutch key for each English key.
///
/// # Examples
///
/// ```
/// use wikialign_core::{City, Infobox, InfoboxCity, Language, align_by_value};
///
/// let city = |name: &str| {
///     InfoboxCity::new(City::new(name, name, "", ""))
///         .with_infobox(Language::En, Infobox::from([("Population".into(), vec!["500000".into()])]))
///         .with_infobox(Language::Nl, Infobox::from([("Inwoners".into(), vec!["500000".into()])]))
/// };
/// let alignments = align_by_value(&[city("A"), city("B")]);
/// assert_eq!(alignments.get("Population").map(String::as_str), Some("Inwoners"));
/// ```
#[must_use]
pub fn align_by_value(cities: &[InfoboxCity]) -> AlignmentMap {
    let counts = count_cooccurrences(cities);
    log::info!(
        "value alignment found evidence for {} English keys across {} cities",
        counts.len(),
        cities.len()
    );
    select_best(&counts)
}

/// Unique English and Dutch keys occurring anywhere in the corpus.
#[must_use]
pub fn unique_keys(cities: &[InfoboxCity]) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut en = BTreeSet::new();
    let mut nl = BTreeSet::new();
    for city in cities {
        en.extend(city.infobox_en.keys().cloned());
        nl.extend(city.infobox_nl.keys().cloned());
    }
    (en, nl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{City, Infobox, Language};
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    fn city(name: &str, en: &[(&str, &str)], nl: &[(&str, &str)]) -> InfoboxCity {
        let to_infobox = |rows: &[(&str, &str)]| -> Infobox {
            rows.iter()
                .map(|(k, v)| ((*k).to_owned(), vec![(*v).to_owned()]))
                .collect()
        };
        InfoboxCity::new(City::new(name, name, "", ""))
            .with_infobox(Language::En, to_infobox(en))
            .with_infobox(Language::Nl, to_infobox(nl))
    }

    #[fixture]
    fn corpus() -> Vec<InfoboxCity> {
        vec![
            city(
                "A",
                &[("Population", "500000"), ("Mayor", "Jan")],
                &[("Inwoners", "500000"), ("Burgemeester", "Jan")],
            ),
            city(
                "B",
                &[("Population", "250000")],
                &[("Inwoners", "250000"), ("Oppervlakte", "250000")],
            ),
        ]
    }

    #[rstest]
    fn counts_identical_value_pairs(corpus: Vec<InfoboxCity>) {
        let counts = count_cooccurrences(&corpus);
        let population = counts.get("Population").expect("population counted");
        assert_eq!(population.get("Inwoners"), Some(&2));
        assert_eq!(population.get("Oppervlakte"), Some(&1));
        assert_eq!(counts.get("Mayor").and_then(|c| c.get("Burgemeester")), Some(&1));
    }

    #[rstest]
    fn selects_maximum_count(corpus: Vec<InfoboxCity>) {
        let alignments = align_by_value(&corpus);
        assert_eq!(
            alignments.get("Population").map(String::as_str),
            Some("Inwoners")
        );
        assert_eq!(
            alignments.get("Mayor").map(String::as_str),
            Some("Burgemeester")
        );
    }

    #[rstest]
    fn ties_prefer_smallest_dutch_key() {
        let cities = vec![city("A", &[("Area", "10")], &[("Zone", "10"), ("Gebied", "10")])];
        let alignments = align_by_value(&cities);
        assert_eq!(alignments.get("Area").map(String::as_str), Some("Gebied"));
    }

    #[rstest]
    fn empty_infoboxes_contribute_nothing() {
        let cities = vec![
            city("A", &[], &[("Inwoners", "1")]),
            city("B", &[("Population", "1")], &[]),
        ];
        assert!(align_by_value(&cities).is_empty());
    }

    #[rstest]
    fn empty_value_lists_are_not_evidence() {
        let mut empty = city("A", &[], &[]);
        empty.infobox_en.insert("Motto".to_owned(), Vec::new());
        empty.infobox_nl.insert("Motto".to_owned(), Vec::new());
        assert!(count_cooccurrences(&[empty]).is_empty());
    }

    #[rstest]
    fn collects_unique_keys(corpus: Vec<InfoboxCity>) {
        let (en, nl) = unique_keys(&corpus);
        assert_eq!(en.len(), 2);
        assert_eq!(nl.len(), 3);
        assert!(nl.contains("Oppervlakte"));
    }

    proptest! {
        #[test]
        fn aligned_dutch_keys_occur_in_corpus(
            rows in proptest::collection::vec(
                (
                    proptest::collection::btree_map("[a-c]", "[0-2]", 0..4),
                    proptest::collection::btree_map("[x-z]", "[0-2]", 0..4),
                ),
                0..6,
            )
        ) {
            let cities: Vec<InfoboxCity> = rows
                .into_iter()
                .enumerate()
                .map(|(index, (en, nl))| {
                    let wrap = |rows: std::collections::BTreeMap<String, String>| -> Infobox {
                        rows.into_iter().map(|(k, v)| (k, vec![v])).collect()
                    };
                    let name = format!("city-{index}");
                    InfoboxCity::new(City::new(name.clone(), name, "", ""))
                        .with_infobox(Language::En, wrap(en))
                        .with_infobox(Language::Nl, wrap(nl))
                })
                .collect();
            let (_, nl_keys) = unique_keys(&cities);
            for target in align_by_value(&cities).values() {
                prop_assert!(nl_keys.contains(target));
            }
        }
    }
}
