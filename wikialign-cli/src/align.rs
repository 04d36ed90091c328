//! Alignment stages: threshold search, key alignment and self-ranking.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wikialign_core::{
    AlignmentMap, AlignmentMethod, CityProperties, ComparisonMode, EmbeddingAlignmentConfig,
    InfoboxCity, PositionHistogram, SimilarityMapping, ThresholdResult, ThresholdSearch,
    align_by_embedding, align_by_value, find_threshold, rank_positions, rank_positions_per_city,
};
use wikialign_data::artefact::{read_json, write_json};

use crate::embed::feature_extraction_config;
use crate::services::{Services, require_existing};
use crate::{
    ARG_CITY_PROPERTIES, ARG_INFOBOXES, ARG_SIMILARITY, ARG_THRESHOLD, CliError,
    ENV_ALIGN_INFOBOXES, ENV_ALIGN_THRESHOLD, ENV_RANK_SIMILARITY, ENV_THRESHOLD_SIMILARITY,
    write_report,
};

/// CLI arguments for the `threshold` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Raise a distance threshold step by step over a similarity \
                 mapping, treating the diagonal as the true matches, and \
                 report the last threshold whose precision stayed above the \
                 target.",
    about = "Search for a precision-preserving threshold"
)]
#[ortho_config(prefix = "WIKIALIGN")]
pub(crate) struct ThresholdArgs {
    /// Similarity mapping written by the `similarity` command.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) similarity_path: Option<Utf8PathBuf>,
    /// Precision the threshold must keep.
    #[arg(long, value_name = "ratio")]
    #[serde(default)]
    pub(crate) min_precision: Option<f64>,
    /// Step added on each iteration.
    #[arg(long, value_name = "step")]
    #[serde(default)]
    pub(crate) increment: Option<f32>,
    /// Starting threshold.
    #[arg(long, value_name = "value")]
    #[serde(default)]
    pub(crate) baseline: Option<f32>,
    /// Print only the final threshold and outcome.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "bool")]
    #[serde(default)]
    pub(crate) summary: Option<bool>,
}

/// Resolved `threshold` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ThresholdConfig {
    pub(crate) similarity_path: Utf8PathBuf,
    pub(crate) search: ThresholdSearch,
    pub(crate) summary: bool,
}

impl TryFrom<ThresholdArgs> for ThresholdConfig {
    type Error = CliError;

    fn try_from(args: ThresholdArgs) -> Result<Self, Self::Error> {
        let similarity_path = args.similarity_path.ok_or(CliError::MissingArgument {
            field: ARG_SIMILARITY,
            env: ENV_THRESHOLD_SIMILARITY,
        })?;
        let defaults = ThresholdSearch::default();
        let search = ThresholdSearch {
            min_precision: args.min_precision.unwrap_or(defaults.min_precision),
            increment: args.increment.unwrap_or(defaults.increment),
            baseline: args.baseline.unwrap_or(defaults.baseline),
        };
        search.validate()?;
        Ok(Self {
            similarity_path,
            search,
            summary: args.summary.unwrap_or(false),
        })
    }
}

pub(crate) fn run_threshold(args: ThresholdArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = ThresholdConfig::try_from(merged)?;
    let mut result = execute_threshold(&config)?;
    if config.summary {
        result.steps.clear();
    }
    write_report(writer, "threshold result", &result)
}

fn execute_threshold(config: &ThresholdConfig) -> Result<ThresholdResult, CliError> {
    require_existing(&config.similarity_path, ARG_SIMILARITY)?;
    let mapping: SimilarityMapping = read_json(&config.similarity_path)?;
    Ok(find_threshold(&mapping, &config.search)?)
}

#[cfg(test)]
pub(crate) fn threshold_config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ThresholdConfig, CliError> {
    let merged = ThresholdArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ThresholdConfig::try_from(merged)
}

/// CLI arguments for the `align` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Align English infobox keys with Dutch keys, either by \
                 counting cities where both keys hold the same value or by \
                 comparing key embeddings against a threshold.",
    about = "Align English and Dutch infobox keys"
)]
#[ortho_config(prefix = "WIKIALIGN")]
pub(crate) struct AlignArgs {
    /// Infobox cities written by the `infoboxes` command.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) infoboxes_path: Option<Utf8PathBuf>,
    /// Alignment method: `value` or `embedding`.
    #[arg(long, value_name = "method")]
    #[serde(default)]
    pub(crate) method: Option<AlignmentMethod>,
    /// Where to write the alignment map.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Comparison mode for embedding alignment.
    #[arg(long, value_name = "mode")]
    #[serde(default)]
    pub(crate) mode: Option<ComparisonMode>,
    /// Score a key pair must strictly beat (embedding alignment).
    #[arg(long = ARG_THRESHOLD, value_name = "value")]
    #[serde(default)]
    pub(crate) threshold: Option<f32>,
    /// Feature-extraction service base URL.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) embedding_url: Option<String>,
    /// Model name.
    #[arg(long, value_name = "name")]
    #[serde(default)]
    pub(crate) model: Option<String>,
    /// Bearer token for the service.
    #[arg(long, value_name = "token")]
    #[serde(default)]
    pub(crate) api_token: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Attempts per request, including the first.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) max_attempts: Option<u32>,
}

pub(crate) fn run_align(args: AlignArgs, services: &dyn Services) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let infoboxes_path = merged.infoboxes_path.ok_or(CliError::MissingArgument {
        field: ARG_INFOBOXES,
        env: ENV_ALIGN_INFOBOXES,
    })?;
    require_existing(&infoboxes_path, ARG_INFOBOXES)?;
    let method = merged.method.unwrap_or(AlignmentMethod::Value);
    let output = merged
        .output
        .unwrap_or_else(|| Utf8PathBuf::from(format!("{method}_alignment.json")));
    let cities: Vec<InfoboxCity> = read_json(&infoboxes_path)?;

    let alignments: AlignmentMap = match method {
        AlignmentMethod::Value => align_by_value(&cities),
        AlignmentMethod::Embedding => {
            let threshold = merged.threshold.ok_or(CliError::MissingArgument {
                field: ARG_THRESHOLD,
                env: ENV_ALIGN_THRESHOLD,
            })?;
            let config =
                EmbeddingAlignmentConfig::new(merged.mode.unwrap_or_default(), threshold);
            let provider = services.embedder(feature_extraction_config(
                merged.embedding_url,
                merged.model,
                merged.api_token,
                merged.timeout_secs,
                merged.max_attempts,
            ))?;
            align_by_embedding(&cities, config, &*provider)?
        }
    };
    write_json(&output, &alignments)?;
    log::info!("wrote {} {method} alignments to {output}", alignments.len());
    Ok(())
}

/// CLI arguments for the `rank` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "For every property, find the position of its own English \
                 label among all English labels ordered by distance from its \
                 Dutch label, and print how often each position occurs. \
                 With --city-properties, rank within each city's properties \
                 and sum the histograms.",
    about = "Histogram of self-match positions"
)]
#[ortho_config(prefix = "WIKIALIGN")]
pub(crate) struct RankArgs {
    /// Similarity mapping written by the `similarity` command.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) similarity_path: Option<Utf8PathBuf>,
    /// Per-city property listing written by `properties --labels-from`.
    #[arg(long = ARG_CITY_PROPERTIES, value_name = "path")]
    #[serde(default)]
    pub(crate) city_properties: Option<Utf8PathBuf>,
}

pub(crate) fn run_rank(args: RankArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let similarity_path = merged.similarity_path.ok_or(CliError::MissingArgument {
        field: ARG_SIMILARITY,
        env: ENV_RANK_SIMILARITY,
    })?;
    require_existing(&similarity_path, ARG_SIMILARITY)?;
    let mapping: SimilarityMapping = read_json(&similarity_path)?;
    let histogram: PositionHistogram = match &merged.city_properties {
        Some(path) => {
            require_existing(path, ARG_CITY_PROPERTIES)?;
            let per_city: CityProperties = read_json(path)?;
            rank_positions_per_city(&mapping, &per_city)
        }
        None => rank_positions(&mapping),
    };
    write_report(writer, "position histogram", &histogram)
}
