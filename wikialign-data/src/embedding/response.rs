//! Wire format of feature-extraction responses.

use serde::Deserialize;
use wikialign_core::{Embedding, EmbeddingError, mean_pool};

/// Per-token vectors, with or without the batch dimension.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum FeatureResponse {
    Batched(Vec<Vec<Vec<f32>>>),
    Tokens(Vec<Vec<f32>>),
    Pooled(Vec<f32>),
}

impl FeatureResponse {
    /// Mean-pool the token vectors of the first (only) input.
    pub(super) fn into_embedding(self) -> Result<Embedding, EmbeddingError> {
        match self {
            Self::Batched(batch) => {
                let tokens = batch.into_iter().next().ok_or(EmbeddingError::NoTokens)?;
                mean_pool(&tokens)
            }
            Self::Tokens(tokens) => mean_pool(&tokens),
            Self::Pooled(values) if values.is_empty() => Err(EmbeddingError::NoTokens),
            Self::Pooled(values) => Ok(Embedding::new(values)),
        }
    }
}

/// Decode a response body into a pooled embedding.
pub(super) fn parse_embedding(mut body: Vec<u8>) -> Result<Embedding, EmbeddingError> {
    let response: FeatureResponse =
        simd_json::from_slice(body.as_mut_slice()).map_err(|err| EmbeddingError::ParseError {
            message: err.to_string(),
        })?;
    response.into_embedding()
}
