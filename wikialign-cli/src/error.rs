//! Error types emitted by the wikialign CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use wikialign_core::{
    CalibrationError, EmbeddingAlignmentError, EmbeddingError, SimilarityError, ThresholdError,
};
use wikialign_data::artefact::ArtefactError;
use wikialign_data::http::ClientBuildError;
use wikialign_data::wikidata::WikidataError;
use wikialign_data::wikipedia::WikipediaError;

/// Errors emitted by the wikialign CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The Tokio runtime driving network stages could not be built.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Constructing an HTTP adapter failed.
    #[error("failed to build {adapter} client: {source}")]
    BuildClient {
        adapter: &'static str,
        #[source]
        source: ClientBuildError,
    },
    /// Reading or writing an artefact failed.
    #[error(transparent)]
    Artefact(#[from] ArtefactError),
    /// A Wikidata request or response failed.
    #[error(transparent)]
    Wikidata(#[from] WikidataError),
    /// A Wikipedia request failed.
    #[error(transparent)]
    Wikipedia(#[from] WikipediaError),
    /// Embedding property labels failed.
    #[error("failed to embed property labels: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Building the similarity mapping failed.
    #[error("failed to build similarity mapping: {0}")]
    Similarity(#[from] SimilarityError),
    /// The threshold search rejected its input.
    #[error("threshold search failed: {0}")]
    Threshold(#[from] ThresholdError),
    /// Calibration failed.
    #[error("calibration failed: {0}")]
    Calibration(#[from] CalibrationError),
    /// Embedding alignment failed.
    #[error("embedding alignment failed: {0}")]
    EmbeddingAlignment(#[from] EmbeddingAlignmentError),
    /// Serialising a report failed.
    #[error("failed to serialise {what}: {source}")]
    SerialiseReport {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// Writing to standard output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
