//! Command-line interface for the bilingual infobox alignment pipeline.
//!
//! Each subcommand is one pipeline stage: it reads the artefacts named on
//! the command line and writes its own artefact or prints a JSON report.
//! Tuning values can also come from configuration files or `WIKIALIGN_*`
//! environment variables.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};
use serde::Serialize;

mod align;
mod collect;
mod embed;
mod error;
mod evaluate;
mod services;

pub use error::CliError;

use align::{AlignArgs, RankArgs, ThresholdArgs};
use collect::{CitiesArgs, InfoboxesArgs, PropertiesArgs};
use embed::{CalibrateArgs, EmbedArgs, SimilarityArgs};
use evaluate::{CompleteArgs, EvaluateArgs};
use services::{HttpServices, Services};

pub(crate) const ARG_CITIES: &str = "cities";
pub(crate) const ARG_INFOBOXES: &str = "infoboxes";
pub(crate) const ARG_PROPERTIES: &str = "properties";
pub(crate) const ARG_EMBEDDINGS: &str = "embeddings";
pub(crate) const ARG_SIMILARITY: &str = "similarity";
pub(crate) const ARG_COMPLETED: &str = "completed";
pub(crate) const ARG_VALUE_ALIGNMENTS: &str = "value-alignments";
pub(crate) const ARG_EMBEDDING_ALIGNMENTS: &str = "embedding-alignments";
pub(crate) const ARG_CITY_PROPERTIES: &str = "city-properties";
pub(crate) const ARG_LABELS_FROM: &str = "labels-from";
pub(crate) const ARG_SORTED_OUTPUT: &str = "sorted-output";
pub(crate) const ARG_THRESHOLD: &str = "threshold";

pub(crate) const ENV_INFOBOXES_CITIES: &str = "WIKIALIGN_CMDS_INFOBOXES_CITIES_PATH";
pub(crate) const ENV_PROPERTIES_CITIES: &str = "WIKIALIGN_CMDS_PROPERTIES_CITIES_PATH";
pub(crate) const ENV_EMBED_PROPERTIES: &str = "WIKIALIGN_CMDS_EMBED_PROPERTIES_PATH";
pub(crate) const ENV_SIMILARITY_EMBEDDINGS: &str = "WIKIALIGN_CMDS_SIMILARITY_EMBEDDINGS_PATH";
pub(crate) const ENV_CALIBRATE_EMBEDDINGS: &str = "WIKIALIGN_CMDS_CALIBRATE_EMBEDDINGS_PATH";
pub(crate) const ENV_THRESHOLD_SIMILARITY: &str = "WIKIALIGN_CMDS_THRESHOLD_SIMILARITY_PATH";
pub(crate) const ENV_RANK_SIMILARITY: &str = "WIKIALIGN_CMDS_RANK_SIMILARITY_PATH";
pub(crate) const ENV_ALIGN_INFOBOXES: &str = "WIKIALIGN_CMDS_ALIGN_INFOBOXES_PATH";
pub(crate) const ENV_ALIGN_THRESHOLD: &str = "WIKIALIGN_CMDS_ALIGN_THRESHOLD";
pub(crate) const ENV_COMPLETE_INFOBOXES: &str = "WIKIALIGN_CMDS_COMPLETE_INFOBOXES_PATH";
pub(crate) const ENV_COMPLETE_VALUE_ALIGNMENTS: &str = "WIKIALIGN_CMDS_COMPLETE_VALUE_ALIGNMENTS";
pub(crate) const ENV_COMPLETE_EMBEDDING_ALIGNMENTS: &str =
    "WIKIALIGN_CMDS_COMPLETE_EMBEDDING_ALIGNMENTS";
pub(crate) const ENV_EVALUATE_COMPLETED: &str = "WIKIALIGN_CMDS_EVALUATE_COMPLETED_PATH";

/// Run the wikialign CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when argument parsing, configuration or the selected
/// stage fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    run_command_with(cli.command, &HttpServices, &mut stdout)
}

pub(crate) fn run_command_with(
    command: Command,
    services: &dyn Services,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Command::Cities(args) => collect::run_cities(args, services),
        Command::Infoboxes(args) => collect::run_infoboxes(args, services),
        Command::Properties(args) => collect::run_properties(args, services),
        Command::Embed(args) => embed::run_embed(args, services),
        Command::Similarity(args) => embed::run_similarity(args),
        Command::Calibrate(args) => embed::run_calibrate(args, writer),
        Command::Threshold(args) => align::run_threshold(args, writer),
        Command::Align(args) => align::run_align(args, services),
        Command::Rank(args) => align::run_rank(args, writer),
        Command::Complete(args) => evaluate::run_complete(args),
        Command::Evaluate(args) => evaluate::run_evaluate(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "wikialign",
    about = "Align English and Dutch Wikipedia infobox properties",
    version
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Query Wikidata for cities with English and Dutch articles.
    Cities(CitiesArgs),
    /// Scrape the English and Dutch infoboxes of each city.
    Infoboxes(InfoboxesArgs),
    /// Collect Wikidata property frequencies and labels.
    Properties(PropertiesArgs),
    /// Embed the English and Dutch labels of each property.
    Embed(EmbedArgs),
    /// Build (or load) the property similarity mapping.
    Similarity(SimilarityArgs),
    /// Calibrate an alignment threshold from label embeddings.
    Calibrate(CalibrateArgs),
    /// Search for the threshold that keeps a target precision.
    Threshold(ThresholdArgs),
    /// Align English and Dutch infobox keys.
    Align(AlignArgs),
    /// Rank each property against its own translation.
    Rank(RankArgs),
    /// Complete Dutch infoboxes from aligned English rows.
    Complete(CompleteArgs),
    /// Tally verified completions per alignment method.
    Evaluate(EvaluateArgs),
}

/// Print `report` as pretty JSON followed by a newline.
pub(crate) fn write_report<T: Serialize + ?Sized>(
    writer: &mut dyn Write,
    what: &'static str,
    report: &T,
) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(report)
        .map_err(|source| CliError::SerialiseReport { what, source })?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
