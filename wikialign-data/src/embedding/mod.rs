//! Label embeddings from a feature-extraction HTTP service.
//!
//! [`HttpEmbeddingProvider`] implements the synchronous
//! [`wikialign_core::EmbeddingProvider`] trait by blocking on its own
//! current-thread runtime, so the core aligners can call it from plain
//! loops.

mod provider;
mod response;

pub use provider::{
    DEFAULT_EMBEDDING_URL, DEFAULT_MODEL, FeatureExtractionConfig, HttpEmbeddingProvider,
};
