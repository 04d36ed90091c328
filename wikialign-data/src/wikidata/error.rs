//! Error types produced by the Wikidata helpers.

use thiserror::Error;

use crate::http::TransportError;

/// Errors produced while querying Wikidata.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WikidataError {
    /// The request could not be completed.
    #[error("Wikidata request failed: {source}")]
    Transport {
        /// Underlying transport failure.
        #[from]
        source: TransportError,
    },
    /// A response body was not the expected JSON.
    #[error("failed to parse {what}: {source}")]
    Parse {
        /// Which response failed to parse.
        what: String,
        /// Decoder error.
        source: simd_json::Error,
    },
    /// The entity data response did not contain the requested entity.
    #[error("entity data for {entity_id} did not contain that entity")]
    MissingEntity {
        /// Requested entity identifier.
        entity_id: String,
    },
}
