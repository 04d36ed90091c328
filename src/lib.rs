//! Facade crate for the bilingual infobox alignment pipeline.
//!
//! This crate re-exports the core domain types and algorithms, and exposes
//! the Wikidata, Wikipedia and feature-extraction adapters behind the
//! `data` feature.

#![forbid(unsafe_code)]

pub use wikialign_core::{
    Alignment, AlignmentMap, AlignmentMethod, CalibrationConfig, CalibrationResult, City,
    CompletedCity, CompletionMode, ComparisonMode, Embedding, EmbeddingError, EmbeddingProvider,
    EvaluationReport, Infobox, InfoboxCity, Language, PropertyEmbeddings, PropertyTable,
    SimilarityMapping, ThresholdResult, ThresholdSearch, align_by_embedding, align_by_value,
    calibrate_threshold, complete_infoboxes, evaluate, find_threshold, rank_positions,
};

#[cfg(feature = "data")]
pub use wikialign_data as data;
