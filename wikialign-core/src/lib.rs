//! Domain model and alignment algorithms for bilingual infobox research.
//!
//! The crate is pure: it never touches the network or the filesystem.
//! Everything it needs from the outside world arrives as plain data or
//! through the [`EmbeddingProvider`] trait.
//!
//! - **Corpus types** describe cities, their English and Dutch infoboxes,
//!   and the Wikidata property table with frequencies and labels.
//! - **Value alignment** pairs English and Dutch infobox keys whose values
//!   coincide across cities.
//! - **Embedding alignment** pairs keys whose label embeddings are close.
//! - **Threshold search and calibration** pick a distance threshold from a
//!   property similarity mapping, and [`rank_positions`] measures how well
//!   the mapping ranks each property against itself.
//! - **Completion and evaluation** copy English values into missing Dutch
//!   rows and tally manually verified completions.
//!
//! # Examples
//!
//! ```
//! use wikialign_core::{
//!     City, CompletionMode, Infobox, InfoboxCity, Language, align_by_value,
//!     complete_infoboxes, evaluate,
//! };
//!
//! let row = |key: &str, value: &str| Infobox::from([(key.to_owned(), vec![value.to_owned()])]);
//! let corpus = vec![
//!     InfoboxCity::new(City::new("Gouda", "Q1", "", ""))
//!         .with_infobox(Language::En, row("Mayor", "Jan"))
//!         .with_infobox(Language::Nl, row("Burgemeester", "Jan")),
//!     InfoboxCity::new(City::new("Delft", "Q2", "", ""))
//!         .with_infobox(Language::En, row("Mayor", "Els")),
//! ];
//! let value_map = align_by_value(&corpus);
//! let completed = complete_infoboxes(CompletionMode::ValueAlignment, corpus, &value_map, None);
//! assert_eq!(evaluate(&completed).value.total, 1);
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod alignment;
mod calibration;
mod city;
mod completion;
mod embedding;
mod embedding_alignment;
mod evaluation;
mod infobox;
mod metrics;
mod property;
mod ranking;
mod similarity;
mod threshold;
mod value_alignment;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use alignment::{Alignment, AlignmentMap, AlignmentMethod, ParseAlignmentMethodError};
pub use calibration::{
    CalibrationConfig, CalibrationError, CalibrationResult, CalibrationTest, DEFAULT_LOWEST_KEPT,
    DEFAULT_SAMPLE_SIZE, DEFAULT_SEED, DEFAULT_TRAIN_FRACTION, calibrate_threshold,
    split_for_calibration, test_calibration,
};
pub use city::{City, Language};
pub use completion::{CompletedCity, CompletionMode, ParseCompletionModeError, complete_infoboxes};
pub use embedding::{Embedding, EmbeddingError, EmbeddingProvider, mean_pool};
pub use embedding_alignment::{
    EmbeddingAlignmentConfig, EmbeddingAlignmentError, align_by_embedding,
};
pub use evaluation::{EvaluationReport, MethodTally, evaluate};
pub use infobox::{Infobox, InfoboxCity};
pub use metrics::{ConfusionCounts, ratio};
pub use property::{
    CityProperties, CityProperty, Property, PropertyAccumulator, PropertyLabels, PropertyTable,
};
pub use ranking::{PositionHistogram, rank_positions, rank_positions_per_city};
pub use similarity::{
    ComparisonMode, ParseComparisonModeError, PropertyEmbedding, PropertyEmbeddings,
    SimilarityError, SimilarityMapping, cosine_similarity, embed_properties, euclidean_distance,
};
pub use threshold::{
    ALTERNATIVE_BASELINE, DEFAULT_BASELINE, DEFAULT_INCREMENT, SearchOutcome, ThresholdError,
    ThresholdResult, ThresholdSearch, ThresholdStep, evaluate_threshold, find_threshold,
};
pub use value_alignment::{
    CooccurrenceCounts, align_by_value, count_cooccurrences, select_best, unique_keys,
};
