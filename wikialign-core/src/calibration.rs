//! Heuristic threshold estimate from correct and sampled incorrect label
//! pairs.
//!
//! For every property with both label embeddings the distance between its
//! own Dutch and English labels is a "correct" sample. A handful of other
//! properties are drawn at random and their English labels compared with
//! the property's Dutch label; the closest few are the "hardest incorrect"
//! samples. The estimate is the midpoint of the two means. Sampling is
//! seeded so repeated runs agree.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ComparisonMode, Embedding, PropertyEmbedding, PropertyEmbeddings, SimilarityError};

/// Seed used unless overridden.
pub const DEFAULT_SEED: u64 = 42;
/// Other properties drawn per property.
pub const DEFAULT_SAMPLE_SIZE: usize = 8;
/// Closest incorrect samples kept per property.
pub const DEFAULT_LOWEST_KEPT: usize = 3;
/// Share of properties used for calibration; the rest is held out.
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

/// Parameters for calibration and its held-out test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Comparison used between label embeddings.
    pub mode: ComparisonMode,
    /// Random seed for sampling.
    pub seed: u64,
    /// Other properties drawn per property.
    pub sample_size: usize,
    /// Closest incorrect samples kept per property.
    pub lowest_kept: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            mode: ComparisonMode::default(),
            seed: DEFAULT_SEED,
            sample_size: DEFAULT_SAMPLE_SIZE,
            lowest_kept: DEFAULT_LOWEST_KEPT,
        }
    }
}

/// Errors raised during calibration.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum CalibrationError {
    /// No property has both label embeddings.
    #[error("no property has both an English and a Dutch label embedding")]
    NoLabelledProperties,
    /// Sampling never produced an incorrect pair.
    #[error("sampling produced no incorrect label pairs")]
    NoIncorrectSamples,
    /// The train fraction lies outside `[0, 1]`.
    #[error("train fraction must be between 0 and 1, got {fraction}")]
    InvalidFraction {
        /// Rejected fraction.
        fraction: f64,
    },
    /// Two label embeddings could not be compared.
    #[error("failed to compare labels of {id} and {other}: {source}")]
    Compare {
        /// Property whose Dutch label was compared.
        id: String,
        /// Property whose English label was compared.
        other: String,
        /// Comparison failure.
        #[source]
        source: SimilarityError,
    },
}

/// Calibrated threshold and the statistics behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Mode the distances were computed with.
    pub mode: ComparisonMode,
    /// Midpoint of the two means, in distance space.
    pub threshold: f32,
    /// Mean distance of correct label pairs.
    pub mean_correct: f32,
    /// Mean distance of the hardest incorrect pairs.
    pub mean_lowest_incorrect: f32,
    /// Properties contributing a correct sample.
    pub properties: usize,
}

impl CalibrationResult {
    /// Threshold expressed in the score space used by the embedding aligner:
    /// a distance for Euclidean mode, a similarity for cosine mode.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "cosine similarity is one minus the cosine distance"
    )]
    pub fn alignment_threshold(&self) -> f32 {
        match self.mode {
            ComparisonMode::Euclidean => self.threshold,
            ComparisonMode::Cosine => 1.0 - self.threshold,
        }
    }
}

/// Outcome of testing a calibration on held-out properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTest {
    /// Properties with both labels and at least one incorrect sample.
    pub evaluated: usize,
    /// Properties whose correct pair beat every sampled incorrect pair.
    pub correct: usize,
    /// `correct / evaluated`, zero when nothing was evaluated.
    pub accuracy: f64,
}

/// Split embeddings in id order into calibration and held-out sets.
///
/// # Errors
/// Returns [`CalibrationError::InvalidFraction`] for a fraction outside
/// `[0, 1]`.
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "the split point is the floor of a fraction of the property count"
)]
pub fn split_for_calibration(
    embeddings: &PropertyEmbeddings,
    train_fraction: f64,
) -> Result<(PropertyEmbeddings, PropertyEmbeddings), CalibrationError> {
    if !(0.0..=1.0).contains(&train_fraction) {
        return Err(CalibrationError::InvalidFraction {
            fraction: train_fraction,
        });
    }
    let split = ((embeddings.len() as f64) * train_fraction).floor() as usize;
    let train = embeddings
        .iter()
        .take(split)
        .map(|(id, entry)| (id.clone(), entry.clone()))
        .collect();
    let test = embeddings
        .iter()
        .skip(split)
        .map(|(id, entry)| (id.clone(), entry.clone()))
        .collect();
    Ok((train, test))
}

struct Samples {
    correct: f32,
    incorrect: Vec<f32>,
}

struct Sampler<'a> {
    all: Vec<(&'a String, &'a PropertyEmbedding)>,
    config: CalibrationConfig,
    rng: ChaCha8Rng,
}

impl<'a> Sampler<'a> {
    fn new(embeddings: &'a PropertyEmbeddings, config: CalibrationConfig) -> Self {
        Self {
            all: embeddings.iter().collect(),
            config,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        }
    }

    fn sample(
        &mut self,
        id: &str,
        entry: &PropertyEmbedding,
    ) -> Result<Option<Samples>, CalibrationError> {
        let (Some(en), Some(nl)) = (&entry.emb_en, &entry.emb_nl) else {
            return Ok(None);
        };
        let correct = self.distance(id, id, nl, en)?;
        let drawn: Vec<(&String, &PropertyEmbedding)> = self
            .all
            .choose_multiple(&mut self.rng, self.config.sample_size)
            .copied()
            .collect();
        let mut incorrect = Vec::with_capacity(drawn.len());
        for (other_id, other) in drawn {
            if other.label_en.is_some() && other.label_en == entry.label_en {
                continue;
            }
            if let (Some(other_en), Some(_)) = (&other.emb_en, &other.emb_nl) {
                incorrect.push(self.distance(id, other_id, nl, other_en)?);
            }
        }
        incorrect.sort_by(f32::total_cmp);
        Ok(Some(Samples { correct, incorrect }))
    }

    fn distance(
        &self,
        id: &str,
        other: &str,
        nl: &Embedding,
        en: &Embedding,
    ) -> Result<f32, CalibrationError> {
        self.config
            .mode
            .distance(nl, en)
            .map_err(|source| CalibrationError::Compare {
                id: id.to_owned(),
                other: other.to_owned(),
                source,
            })
    }
}

/// Estimate a distance threshold from `embeddings`.
///
/// # Errors
/// Returns [`CalibrationError`] when no property has both labels, when no
/// incorrect pair could be sampled, or when embeddings cannot be compared.
#[expect(
    clippy::float_arithmetic,
    reason = "the threshold is the midpoint of two means"
)]
pub fn calibrate_threshold(
    embeddings: &PropertyEmbeddings,
    config: CalibrationConfig,
) -> Result<CalibrationResult, CalibrationError> {
    let mut sampler = Sampler::new(embeddings, config);
    let mut correct = Vec::new();
    let mut lowest_incorrect = Vec::new();
    for (id, entry) in embeddings {
        if let Some(samples) = sampler.sample(id, entry)? {
            correct.push(samples.correct);
            lowest_incorrect.extend(samples.incorrect.into_iter().take(config.lowest_kept));
        }
    }
    let mean_correct = mean(&correct).ok_or(CalibrationError::NoLabelledProperties)?;
    let mean_lowest_incorrect =
        mean(&lowest_incorrect).ok_or(CalibrationError::NoIncorrectSamples)?;
    let threshold = (mean_correct + mean_lowest_incorrect) / 2.0;
    log::info!(
        "calibrated threshold {threshold} from {} correct and {} incorrect samples",
        correct.len(),
        lowest_incorrect.len()
    );
    Ok(CalibrationResult {
        mode: config.mode,
        threshold,
        mean_correct,
        mean_lowest_incorrect,
        properties: correct.len(),
    })
}

/// Count held-out properties whose correct pair is closer than every
/// sampled incorrect pair.
///
/// Properties without both labels, or whose sample held no incorrect pair,
/// are not evaluated.
///
/// # Errors
/// Returns [`CalibrationError::Compare`] when embeddings cannot be compared.
pub fn test_calibration(
    embeddings: &PropertyEmbeddings,
    config: CalibrationConfig,
) -> Result<CalibrationTest, CalibrationError> {
    let mut sampler = Sampler::new(embeddings, config);
    let mut evaluated = 0_usize;
    let mut correct = 0_usize;
    for (id, entry) in embeddings {
        let Some(samples) = sampler.sample(id, entry)? else {
            continue;
        };
        let Some(&closest) = samples.incorrect.first() else {
            continue;
        };
        evaluated += 1;
        if samples.correct < closest {
            correct += 1;
        }
    }
    let accuracy = crate::metrics::ratio(correct as u64, evaluated as u64);
    Ok(CalibrationTest {
        evaluated,
        correct,
        accuracy,
    })
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "arithmetic mean of sampled distances"
)]
fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f32>() / values.len() as f32)
}
