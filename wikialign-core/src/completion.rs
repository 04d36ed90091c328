//! Complete Dutch infoboxes from their English counterparts.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Alignment, AlignmentMap, AlignmentMethod, Infobox, InfoboxCity};

/// Which alignment maps the completer may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// Only the value alignment map.
    #[default]
    ValueAlignment,
    /// Value alignment first, then embedding alignment.
    All,
}

impl fmt::Display for CompletionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ValueAlignment => "value_alignment",
            Self::All => "all",
        })
    }
}

/// Error returned when parsing an unknown [`CompletionMode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown completion mode {0:?} (expected value_alignment or all)")]
pub struct ParseCompletionModeError(String);

impl FromStr for CompletionMode {
    type Err = ParseCompletionModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "value_alignment" => Ok(Self::ValueAlignment),
            "all" => Ok(Self::All),
            other => Err(ParseCompletionModeError(other.to_owned())),
        }
    }
}

/// A city and the completions proposed for its Dutch infobox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedCity {
    /// The city with its original infoboxes.
    #[serde(flatten)]
    pub city: InfoboxCity,
    /// Completions in the order they were proposed.
    #[serde(default)]
    pub completions: Vec<Alignment>,
}

impl CompletedCity {
    /// Completions proposed by `method`.
    pub fn completions_by(&self, method: AlignmentMethod) -> impl Iterator<Item = &Alignment> {
        self.completions
            .iter()
            .filter(move |alignment| alignment.method == method)
    }

    /// Dutch infobox with every completion applied.
    #[must_use]
    pub fn completed_infobox(&self) -> Infobox {
        let mut infobox = self.city.infobox_nl.clone();
        for alignment in &self.completions {
            infobox
                .entry(alignment.target_key.clone())
                .or_insert_with(|| alignment.value.clone());
        }
        infobox
    }
}

/// Propose completions for every city.
///
/// For each non-empty English row whose values do not already appear in the
/// Dutch infobox, the value map is consulted; in [`CompletionMode::All`] the
/// embedding map is consulted for rows the value map did not complete.
/// A target key already present in the Dutch infobox is never written, and
/// a target key completed once for a city is not completed again.
///
/// # Examples
///
/// ```
/// use wikialign_core::{
///     AlignmentMap, City, CompletionMode, Infobox, InfoboxCity, Language, complete_infoboxes,
/// };
///
/// let city = InfoboxCity::new(City::new("Gouda", "Q1", "", ""))
///     .with_infobox(Language::En, Infobox::from([("Mayor".into(), vec!["Pieter".into()])]));
/// let value_map = AlignmentMap::from([("Mayor".into(), "Burgemeester".into())]);
/// let completed = complete_infoboxes(CompletionMode::ValueAlignment, vec![city], &value_map, None);
/// assert_eq!(completed[0].completions[0].target_key, "Burgemeester");
/// ```
#[must_use]
pub fn complete_infoboxes(
    mode: CompletionMode,
    cities: Vec<InfoboxCity>,
    value_alignments: &AlignmentMap,
    embedding_alignments: Option<&AlignmentMap>,
) -> Vec<CompletedCity> {
    let completed: Vec<CompletedCity> = cities
        .into_iter()
        .map(|city| complete_city(mode, city, value_alignments, embedding_alignments))
        .collect();
    log::info!(
        "proposed {} completions for {} cities ({mode})",
        completed.iter().map(|c| c.completions.len()).sum::<usize>(),
        completed.len()
    );
    completed
}

fn complete_city(
    mode: CompletionMode,
    city: InfoboxCity,
    value_alignments: &AlignmentMap,
    embedding_alignments: Option<&AlignmentMap>,
) -> CompletedCity {
    let mut completions = Vec::new();
    let mut written: BTreeSet<String> = BTreeSet::new();
    let mut propose = |source: &str, target: &String, value: &[String], method| -> bool {
        if city.infobox_nl.contains_key(target) || !written.insert(target.clone()) {
            return false;
        }
        completions.push(Alignment::new(source, target.clone(), value.to_vec(), method));
        true
    };

    for (key, value) in &city.infobox_en {
        if value.is_empty() {
            continue;
        }
        let mut used_value_alignment = false;
        if !city.nl_contains_values(value)
            && let Some(target) = value_alignments.get(key)
        {
            used_value_alignment = propose(key, target, value, AlignmentMethod::Value);
        }
        if mode == CompletionMode::All
            && !used_value_alignment
            && let Some(target) = embedding_alignments.and_then(|map| map.get(key))
        {
            propose(key, target, value, AlignmentMethod::Embedding);
        }
    }
    CompletedCity { city, completions }
}
