//! Align infobox keys by the similarity of their label embeddings.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::{
    AlignmentMap, ComparisonMode, Embedding, EmbeddingError, EmbeddingProvider, InfoboxCity,
    SimilarityError,
};

/// Settings for [`align_by_embedding`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddingAlignmentConfig {
    /// Comparison used between label embeddings.
    pub mode: ComparisonMode,
    /// Score a candidate must strictly beat to be kept.
    pub threshold: f32,
}

impl EmbeddingAlignmentConfig {
    /// Create a configuration.
    #[must_use]
    pub const fn new(mode: ComparisonMode, threshold: f32) -> Self {
        Self { mode, threshold }
    }
}

/// Errors raised by [`align_by_embedding`].
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum EmbeddingAlignmentError {
    /// The threshold is NaN or infinite.
    #[error("alignment threshold must be finite, got {threshold}")]
    InvalidThreshold {
        /// Rejected threshold.
        threshold: f32,
    },
    /// An infobox key could not be embedded.
    #[error("failed to embed key {key:?}: {source}")]
    Embed {
        /// Key being embedded.
        key: String,
        /// Provider failure.
        #[source]
        source: EmbeddingError,
    },
    /// Two key embeddings could not be compared.
    #[error("failed to compare {en_key:?} with {nl_key:?}: {source}")]
    Compare {
        /// English key.
        en_key: String,
        /// Dutch key.
        nl_key: String,
        /// Comparison failure.
        #[source]
        source: SimilarityError,
    },
}

/// Align English keys with Dutch keys by embedding similarity.
///
/// Every unique English key (from `infobox_en`) is compared with every
/// unique Dutch key (from `infobox_nl`). For each English key the best Dutch
/// key strictly passing the threshold is kept; keys with no passing
/// candidate are absent from the result. Among equal scores the Dutch key
/// that sorts first wins. Each key text is embedded once.
///
/// # Errors
/// Returns [`EmbeddingAlignmentError`] when the threshold is not finite or
/// when embedding or comparison fails.
pub fn align_by_embedding<P>(
    cities: &[InfoboxCity],
    config: EmbeddingAlignmentConfig,
    provider: &P,
) -> Result<AlignmentMap, EmbeddingAlignmentError>
where
    P: EmbeddingProvider + ?Sized,
{
    if !config.threshold.is_finite() {
        return Err(EmbeddingAlignmentError::InvalidThreshold {
            threshold: config.threshold,
        });
    }

    let en_keys: BTreeSet<&str> = cities
        .iter()
        .flat_map(|city| city.infobox_en.keys().map(String::as_str))
        .collect();
    let nl_keys: BTreeSet<&str> = cities
        .iter()
        .flat_map(|city| city.infobox_nl.keys().map(String::as_str))
        .collect();

    let mut cache = KeyEmbeddings::new(provider);
    let nl_embedded: Vec<(&str, Embedding)> = nl_keys
        .iter()
        .map(|&key| cache.embed(key).map(|embedding| (key, embedding)))
        .collect::<Result<_, _>>()?;

    let mut alignments = AlignmentMap::new();
    for &en_key in &en_keys {
        let en_embedding = cache.embed(en_key)?;
        if let Some(nl_key) = best_match(en_key, &en_embedding, &nl_embedded, config)? {
            alignments.insert(en_key.to_owned(), nl_key.to_owned());
        }
    }
    log::info!(
        "embedding alignment kept {} of {} English keys ({:?}, threshold {})",
        alignments.len(),
        en_keys.len(),
        config.mode,
        config.threshold
    );
    Ok(alignments)
}

fn best_match<'a>(
    en_key: &str,
    en_embedding: &Embedding,
    candidates: &'a [(&'a str, Embedding)],
    config: EmbeddingAlignmentConfig,
) -> Result<Option<&'a str>, EmbeddingAlignmentError> {
    let mut best: Option<(&str, f32)> = None;
    for (nl_key, nl_embedding) in candidates {
        let score = config
            .mode
            .score(en_embedding, nl_embedding)
            .map_err(|source| EmbeddingAlignmentError::Compare {
                en_key: en_key.to_owned(),
                nl_key: (*nl_key).to_owned(),
                source,
            })?;
        if !config.mode.accepts(score, config.threshold) {
            continue;
        }
        if best.is_none_or(|(_, top)| config.mode.is_better(score, top)) {
            best = Some((nl_key, score));
        }
    }
    Ok(best.map(|(key, _)| key))
}

/// Memoises key embeddings so keys shared by both languages are embedded once.
struct KeyEmbeddings<'p, P: ?Sized> {
    provider: &'p P,
    cache: HashMap<String, Embedding>,
}

impl<'p, P> KeyEmbeddings<'p, P>
where
    P: EmbeddingProvider + ?Sized,
{
    fn new(provider: &'p P) -> Self {
        Self {
            provider,
            cache: HashMap::new(),
        }
    }

    fn embed(&mut self, key: &str) -> Result<Embedding, EmbeddingAlignmentError> {
        if let Some(hit) = self.cache.get(key) {
            return Ok(hit.clone());
        }
        let embedding =
            self.provider
                .embed(key)
                .map_err(|source| EmbeddingAlignmentError::Embed {
                    key: key.to_owned(),
                    source,
                })?;
        self.cache.insert(key.to_owned(), embedding.clone());
        Ok(embedding)
    }
}
