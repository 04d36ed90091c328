//! Label embeddings and the provider seam that produces them.
//!
//! The [`EmbeddingProvider`] trait is synchronous so the aligners stay usable
//! from plain loops. Network-backed providers live in `wikialign-data` and
//! bridge to their async clients internally.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed-size vector representing a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// Wrap raw components.
    #[must_use]
    pub const fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Borrow the components.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Dimensionality of the vector.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Return whether the vector has no components.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the wrapper and return the components.
    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// Errors raised while producing embeddings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EmbeddingError {
    /// Empty text cannot be embedded.
    #[error("cannot embed empty text")]
    EmptyInput,
    /// The model returned no token vectors to pool.
    #[error("model returned no token vectors")]
    NoTokens,
    /// Token vectors disagreed on dimensionality.
    #[error("token vector has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        /// Dimensionality of the first token vector.
        expected: usize,
        /// Dimensionality of the offending token vector.
        found: usize,
    },
    /// The request exceeded its timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Fully qualified request URL.
        url: String,
        /// Timeout applied to the request.
        timeout_secs: u64,
    },
    /// The service answered with an error status.
    #[error("request to {url} failed with status {status}: {message}")]
    HttpError {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },
    /// The service could not be reached.
    #[error("network error contacting {url}: {message}")]
    NetworkError {
        /// Fully qualified request URL.
        url: String,
        /// Error description.
        message: String,
    },
    /// The response body did not have the expected shape.
    #[error("failed to parse embedding response: {message}")]
    ParseError {
        /// Parser error description.
        message: String,
    },
}

/// Produce an embedding for a text.
///
/// # Examples
///
/// ```
/// use wikialign_core::{Embedding, EmbeddingError, EmbeddingProvider};
///
/// struct LengthProvider;
///
/// impl EmbeddingProvider for LengthProvider {
///     fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
///         if text.is_empty() {
///             return Err(EmbeddingError::EmptyInput);
///         }
///         Ok(Embedding::new(vec![text.len() as f32]))
///     }
/// }
///
/// let embedding = LengthProvider.embed("Population")?;
/// assert_eq!(embedding.as_slice(), &[10.0]);
/// # Ok::<(), EmbeddingError>(())
/// ```
pub trait EmbeddingProvider {
    /// Embed `text`.
    ///
    /// Implementations must return `Err(EmbeddingError::EmptyInput)` for an
    /// empty string.
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for &P {
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        (**self).embed(text)
    }
}

/// Average per-token vectors into a single embedding.
///
/// # Errors
/// Returns [`EmbeddingError::NoTokens`] for an empty token list and
/// [`EmbeddingError::DimensionMismatch`] when token widths differ.
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "mean pooling sums token components and divides by the token count"
)]
pub fn mean_pool(tokens: &[Vec<f32>]) -> Result<Embedding, EmbeddingError> {
    let Some(first) = tokens.first() else {
        return Err(EmbeddingError::NoTokens);
    };
    let width = first.len();
    let mut sums = vec![0.0_f32; width];
    for token in tokens {
        if token.len() != width {
            return Err(EmbeddingError::DimensionMismatch {
                expected: width,
                found: token.len(),
            });
        }
        for (sum, value) in sums.iter_mut().zip(token) {
            *sum += value;
        }
    }
    let count = tokens.len() as f32;
    Ok(Embedding::new(sums.into_iter().map(|sum| sum / count).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn mean_pool_averages_tokens() {
        let pooled = mean_pool(&[vec![1.0, 2.0], vec![3.0, 6.0]]).expect("pool tokens");
        assert_eq!(pooled.as_slice(), &[2.0, 4.0]);
    }

    #[rstest]
    fn mean_pool_rejects_empty_input() {
        assert_eq!(mean_pool(&[]), Err(EmbeddingError::NoTokens));
    }

    #[rstest]
    fn mean_pool_rejects_ragged_tokens() {
        let err = mean_pool(&[vec![1.0, 2.0], vec![3.0]]).expect_err("ragged tokens");
        assert_eq!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[rstest]
    fn embedding_serialises_as_plain_array() {
        let json = serde_json::to_string(&Embedding::new(vec![0.5, 1.0])).expect("serialise");
        assert_eq!(json, "[0.5,1.0]");
    }
}
