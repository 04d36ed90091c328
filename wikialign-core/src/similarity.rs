//! Vector comparison and the property-by-property similarity mapping.
//!
//! A [`SimilarityMapping`] always stores *distances*, so smaller is closer
//! whichever [`ComparisonMode`] produced it: Euclidean mode stores the L2
//! norm of the difference and cosine mode stores `1 - cos`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Embedding, EmbeddingError, EmbeddingProvider, PropertyTable};

/// How two embeddings are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMode {
    /// Cosine similarity; higher scores are closer.
    Cosine,
    /// Euclidean distance; lower scores are closer.
    #[default]
    Euclidean,
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
        })
    }
}

/// Error returned when parsing an unknown [`ComparisonMode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown comparison mode {0:?} (expected cosine or euclidean)")]
pub struct ParseComparisonModeError(String);

impl FromStr for ComparisonMode {
    type Err = ParseComparisonModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            other => Err(ParseComparisonModeError(other.to_owned())),
        }
    }
}

/// Errors raised while comparing embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SimilarityError {
    /// The embeddings have different dimensionality.
    #[error("cannot compare embeddings of {left} and {right} dimensions")]
    DimensionMismatch {
        /// Width of the left operand.
        left: usize,
        /// Width of the right operand.
        right: usize,
    },
}

impl ComparisonMode {
    /// Raw score of `a` against `b`: cosine similarity or Euclidean distance.
    ///
    /// # Errors
    /// Returns [`SimilarityError::DimensionMismatch`] for vectors of
    /// different widths.
    pub fn score(self, a: &Embedding, b: &Embedding) -> Result<f32, SimilarityError> {
        check_dimensions(a, b)?;
        Ok(match self {
            Self::Cosine => cosine_similarity(a.as_slice(), b.as_slice()),
            Self::Euclidean => euclidean_distance(a.as_slice(), b.as_slice()),
        })
    }

    /// Distance of `a` from `b`, where smaller is always closer.
    ///
    /// # Errors
    /// Returns [`SimilarityError::DimensionMismatch`] for vectors of
    /// different widths.
    #[expect(
        clippy::float_arithmetic,
        reason = "cosine distance is one minus the similarity"
    )]
    pub fn distance(self, a: &Embedding, b: &Embedding) -> Result<f32, SimilarityError> {
        let score = self.score(a, b)?;
        Ok(match self {
            Self::Cosine => 1.0 - score,
            Self::Euclidean => score,
        })
    }

    /// Return whether `score` strictly passes `threshold`.
    #[must_use]
    pub fn accepts(self, score: f32, threshold: f32) -> bool {
        match self {
            Self::Cosine => score > threshold,
            Self::Euclidean => score < threshold,
        }
    }

    /// Return whether `candidate` is strictly better than `incumbent`.
    #[must_use]
    pub fn is_better(self, candidate: f32, incumbent: f32) -> bool {
        match self {
            Self::Cosine => candidate > incumbent,
            Self::Euclidean => candidate < incumbent,
        }
    }
}

const fn check_dimensions(a: &Embedding, b: &Embedding) -> Result<(), SimilarityError> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(SimilarityError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        })
    }
}

/// Cosine similarity of two equally sized slices; zero when either is a
/// zero vector.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "cosine similarity is a normalised dot product"
)]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Euclidean distance between two equally sized slices.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "euclidean distance is the norm of the difference"
)]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Label embeddings of one property. Missing labels have no embedding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyEmbedding {
    /// English label.
    pub label_en: Option<String>,
    /// Dutch label.
    pub label_nl: Option<String>,
    /// Embedding of the English label.
    pub emb_en: Option<Embedding>,
    /// Embedding of the Dutch label.
    pub emb_nl: Option<Embedding>,
}

impl PropertyEmbedding {
    /// Return whether both label embeddings are available.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.emb_en.is_some() && self.emb_nl.is_some()
    }
}

/// Property embeddings keyed by property id.
pub type PropertyEmbeddings = BTreeMap<String, PropertyEmbedding>;

/// Embed the English and Dutch labels of every property in `table`.
///
/// Identical label texts are embedded once.
///
/// # Errors
/// Propagates the first [`EmbeddingError`] from `provider`.
pub fn embed_properties<P>(
    table: &PropertyTable,
    provider: &P,
) -> Result<PropertyEmbeddings, EmbeddingError>
where
    P: EmbeddingProvider + ?Sized,
{
    let mut cache: HashMap<String, Embedding> = HashMap::new();
    let mut embed = |label: Option<&String>| -> Result<Option<Embedding>, EmbeddingError> {
        let Some(text) = label else {
            return Ok(None);
        };
        if let Some(hit) = cache.get(text) {
            return Ok(Some(hit.clone()));
        }
        let embedding = provider.embed(text)?;
        cache.insert(text.clone(), embedding.clone());
        Ok(Some(embedding))
    };

    let mut embeddings = PropertyEmbeddings::new();
    for property in table.iter() {
        let entry = PropertyEmbedding {
            label_en: property.label_en.clone(),
            label_nl: property.label_nl.clone(),
            emb_en: embed(property.label_en.as_ref())?,
            emb_nl: embed(property.label_nl.as_ref())?,
        };
        embeddings.insert(property.id.clone(), entry);
    }
    log::info!(
        "embedded labels of {} properties ({} distinct texts)",
        embeddings.len(),
        cache.len()
    );
    Ok(embeddings)
}

/// Pairwise distances between property labels.
///
/// Entry `[a][b]` is the distance between the Dutch label of `a` and the
/// English label of `b`, so the diagonal holds each property's own
/// cross-language distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMapping {
    mode: ComparisonMode,
    distances: BTreeMap<String, BTreeMap<String, f32>>,
}

impl SimilarityMapping {
    /// Create an empty mapping for `mode`.
    #[must_use]
    pub const fn new(mode: ComparisonMode) -> Self {
        Self {
            mode,
            distances: BTreeMap::new(),
        }
    }

    /// Materialise the full mapping from property embeddings.
    ///
    /// Properties lacking either embedding are skipped.
    ///
    /// # Errors
    /// Returns [`SimilarityError::DimensionMismatch`] when embeddings differ
    /// in width.
    pub fn from_embeddings(
        embeddings: &PropertyEmbeddings,
        mode: ComparisonMode,
    ) -> Result<Self, SimilarityError> {
        let complete: Vec<(&String, &Embedding, &Embedding)> = embeddings
            .iter()
            .filter_map(|(id, entry)| match (&entry.emb_en, &entry.emb_nl) {
                (Some(en), Some(nl)) => Some((id, en, nl)),
                _ => None,
            })
            .collect();

        let mut mapping = Self::new(mode);
        for &(id1, _, nl) in &complete {
            for &(id2, en, _) in &complete {
                mapping.insert(id1.clone(), id2.clone(), mode.distance(nl, en)?);
            }
        }
        log::info!(
            "built {mode:?} similarity mapping over {} properties",
            complete.len()
        );
        Ok(mapping)
    }

    /// Comparison mode the distances were computed with.
    #[must_use]
    pub const fn mode(&self) -> ComparisonMode {
        self.mode
    }

    /// Record a distance.
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>, distance: f32) {
        self.distances
            .entry(from.into())
            .or_default()
            .insert(to.into(), distance);
    }

    /// Distance from `from` to `to`.
    #[must_use]
    pub fn get(&self, from: &str, to: &str) -> Option<f32> {
        self.distances.get(from)?.get(to).copied()
    }

    /// Row of distances starting at `from`.
    #[must_use]
    pub fn row(&self, from: &str) -> Option<&BTreeMap<String, f32>> {
        self.distances.get(from)
    }

    /// Iterate over rows in id order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, f32>)> {
        self.distances.iter().map(|(id, row)| (id.as_str(), row))
    }

    /// Iterate over every `(from, to, distance)` entry.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, f32)> {
        self.rows().flat_map(|(from, row)| {
            row.iter()
                .map(move |(to, &distance)| (from, to.as_str(), distance))
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Return whether the mapping holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Largest finite distance in the mapping.
    #[must_use]
    pub fn max_finite_distance(&self) -> Option<f32> {
        self.entries()
            .map(|(_, _, distance)| distance)
            .filter(|distance| distance.is_finite())
            .reduce(f32::max)
    }

    /// Sub-mapping restricted to `ids` on both axes.
    #[must_use]
    pub fn restrict_to(&self, ids: &BTreeSet<String>) -> Self {
        let distances = self
            .distances
            .iter()
            .filter(|(from, _)| ids.contains(*from))
            .map(|(from, row)| {
                let kept = row
                    .iter()
                    .filter(|(to, _)| ids.contains(*to))
                    .map(|(to, &distance)| (to.clone(), distance))
                    .collect();
                (from.clone(), kept)
            })
            .collect();
        Self {
            mode: self.mode,
            distances,
        }
    }
}
