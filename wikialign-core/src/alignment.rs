//! Alignment maps produced by the aligners and the completion records built
//! from them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// English infobox key mapped to the Dutch key it aligns with.
pub type AlignmentMap = BTreeMap<String, String>;

/// How an alignment was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMethod {
    /// Keys whose values coincided across cities.
    Value,
    /// Keys whose label embeddings were close enough.
    Embedding,
}

impl fmt::Display for AlignmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Value => "value",
            Self::Embedding => "embedding",
        })
    }
}

/// Error returned when parsing an unknown [`AlignmentMethod`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown alignment method {0:?} (expected value or embedding)")]
pub struct ParseAlignmentMethodError(String);

impl FromStr for AlignmentMethod {
    type Err = ParseAlignmentMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "value" => Ok(Self::Value),
            "embedding" => Ok(Self::Embedding),
            other => Err(ParseAlignmentMethodError(other.to_owned())),
        }
    }
}

/// A single completion: an English value copied under an aligned Dutch key.
///
/// `correct` is absent until someone verifies the completion by hand.
///
/// # Examples
///
/// ```
/// use wikialign_core::{Alignment, AlignmentMethod};
///
/// let alignment = Alignment::new("Population", "Inwoners", vec!["500000".into()], AlignmentMethod::Value)
///     .with_correct(true);
/// assert_eq!(alignment.correct, Some(true));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    /// Key in the English infobox.
    pub source_key: String,
    /// Aligned key written into the Dutch infobox.
    pub target_key: String,
    /// Values carried over from the English infobox.
    pub value: Vec<String>,
    /// Aligner that proposed `target_key`.
    pub method: AlignmentMethod,
    /// Manual verification outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

impl Alignment {
    /// Construct an unverified alignment record.
    pub fn new(
        source_key: impl Into<String>,
        target_key: impl Into<String>,
        value: Vec<String>,
        method: AlignmentMethod,
    ) -> Self {
        Self {
            source_key: source_key.into(),
            target_key: target_key.into(),
            value,
            method,
            correct: None,
        }
    }

    /// Record the manual verification outcome.
    #[must_use]
    pub const fn with_correct(mut self, correct: bool) -> Self {
        self.correct = Some(correct);
        self
    }
}
