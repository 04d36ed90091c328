//! Embedding stages: label embeddings, the similarity mapping and
//! threshold calibration.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wikialign_core::{
    CalibrationConfig, CalibrationResult, CalibrationTest, ComparisonMode, DEFAULT_LOWEST_KEPT,
    DEFAULT_SAMPLE_SIZE, DEFAULT_SEED, DEFAULT_TRAIN_FRACTION, PropertyEmbeddings, PropertyTable,
    SimilarityMapping, calibrate_threshold, embed_properties, split_for_calibration,
    test_calibration,
};
use wikialign_data::artefact::{load_or_build_similarity, read_json, write_json};
use wikialign_data::embedding::FeatureExtractionConfig;

use crate::services::{Services, http_config, require_existing};
use crate::{
    ARG_EMBEDDINGS, ARG_PROPERTIES, CliError, ENV_CALIBRATE_EMBEDDINGS, ENV_EMBED_PROPERTIES,
    ENV_SIMILARITY_EMBEDDINGS, write_report,
};

/// CLI arguments for the `embed` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Embed the English and Dutch label of every property in a \
                 property table with a multilingual feature-extraction model.",
    about = "Embed property labels"
)]
#[ortho_config(prefix = "WIKIALIGN")]
pub(crate) struct EmbedArgs {
    /// Property table written by the `properties` command.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) properties_path: Option<Utf8PathBuf>,
    /// Where to write the property embeddings.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
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

/// Feature-extraction settings from the shared service flags.
pub(crate) fn feature_extraction_config(
    embedding_url: Option<String>,
    model: Option<String>,
    api_token: Option<String>,
    timeout_secs: Option<u64>,
    max_attempts: Option<u32>,
) -> FeatureExtractionConfig {
    let base = match embedding_url {
        Some(url) => FeatureExtractionConfig::new(url),
        None => FeatureExtractionConfig::default(),
    };
    let mut config = base.with_http(http_config(timeout_secs, max_attempts));
    if let Some(name) = model {
        config = config.with_model(name);
    }
    if let Some(token) = api_token {
        config = config.with_api_token(token);
    }
    config
}

pub(crate) fn run_embed(args: EmbedArgs, services: &dyn Services) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let properties_path = merged.properties_path.ok_or(CliError::MissingArgument {
        field: ARG_PROPERTIES,
        env: ENV_EMBED_PROPERTIES,
    })?;
    require_existing(&properties_path, ARG_PROPERTIES)?;
    let output = merged
        .output
        .unwrap_or_else(|| Utf8PathBuf::from("property_embeddings.json"));
    let provider = services.embedder(feature_extraction_config(
        merged.embedding_url,
        merged.model,
        merged.api_token,
        merged.timeout_secs,
        merged.max_attempts,
    ))?;

    let table: PropertyTable = read_json(&properties_path)?;
    let embeddings = embed_properties(&table, &*provider)?;
    write_json(&output, &embeddings)?;
    log::info!("wrote embeddings of {} properties to {output}", embeddings.len());
    Ok(())
}

/// CLI arguments for the `similarity` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Compare the Dutch label embedding of every property with \
                 the English label embedding of every other property. The \
                 mapping is cached at --output and rebuilt when the cache is \
                 missing, unreadable or computed in another mode.",
    about = "Build the property similarity mapping"
)]
#[ortho_config(prefix = "WIKIALIGN")]
pub(crate) struct SimilarityArgs {
    /// Property embeddings written by the `embed` command.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) embeddings_path: Option<Utf8PathBuf>,
    /// Comparison mode: `euclidean` or `cosine`.
    #[arg(long, value_name = "mode")]
    #[serde(default)]
    pub(crate) mode: Option<ComparisonMode>,
    /// Cache path for the mapping.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

/// Resolved `similarity` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SimilarityConfig {
    pub(crate) embeddings_path: Utf8PathBuf,
    pub(crate) mode: ComparisonMode,
    pub(crate) output: Utf8PathBuf,
}

impl TryFrom<SimilarityArgs> for SimilarityConfig {
    type Error = CliError;

    fn try_from(args: SimilarityArgs) -> Result<Self, Self::Error> {
        let embeddings_path = args.embeddings_path.ok_or(CliError::MissingArgument {
            field: ARG_EMBEDDINGS,
            env: ENV_SIMILARITY_EMBEDDINGS,
        })?;
        let mode = args.mode.unwrap_or_default();
        let output = args
            .output
            .unwrap_or_else(|| Utf8PathBuf::from(format!("similarity_{mode}.json")));
        Ok(Self {
            embeddings_path,
            mode,
            output,
        })
    }
}

pub(crate) fn run_similarity(args: SimilarityArgs) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = SimilarityConfig::try_from(merged)?;
    let mapping = load_or_build_similarity(&config.output, config.mode, || {
        require_existing(&config.embeddings_path, ARG_EMBEDDINGS)?;
        let embeddings: PropertyEmbeddings = read_json(&config.embeddings_path)?;
        Ok::<SimilarityMapping, CliError>(SimilarityMapping::from_embeddings(
            &embeddings,
            config.mode,
        )?)
    })?;
    log::info!("similarity mapping at {} has {} rows", config.output, mapping.len());
    Ok(())
}

/// CLI arguments for the `calibrate` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Split the property embeddings into a calibration and a \
                 held-out set, derive a threshold from correct and sampled \
                 incorrect label pairs, and test it on the held-out set.",
    about = "Calibrate an alignment threshold"
)]
#[ortho_config(prefix = "WIKIALIGN")]
pub(crate) struct CalibrateArgs {
    /// Property embeddings written by the `embed` command.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) embeddings_path: Option<Utf8PathBuf>,
    /// Comparison mode: `euclidean` or `cosine`.
    #[arg(long, value_name = "mode")]
    #[serde(default)]
    pub(crate) mode: Option<ComparisonMode>,
    /// Random seed for sampling.
    #[arg(long, value_name = "seed")]
    #[serde(default)]
    pub(crate) seed: Option<u64>,
    /// Other properties drawn per property.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) sample_size: Option<usize>,
    /// Closest incorrect samples kept per property.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) lowest_kept: Option<usize>,
    /// Share of properties used for calibration.
    #[arg(long, value_name = "fraction")]
    #[serde(default)]
    pub(crate) train_fraction: Option<f64>,
}

/// Resolved `calibrate` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CalibrateConfig {
    pub(crate) embeddings_path: Utf8PathBuf,
    pub(crate) calibration: CalibrationConfig,
    pub(crate) train_fraction: f64,
}

impl TryFrom<CalibrateArgs> for CalibrateConfig {
    type Error = CliError;

    fn try_from(args: CalibrateArgs) -> Result<Self, Self::Error> {
        let embeddings_path = args.embeddings_path.ok_or(CliError::MissingArgument {
            field: ARG_EMBEDDINGS,
            env: ENV_CALIBRATE_EMBEDDINGS,
        })?;
        Ok(Self {
            embeddings_path,
            calibration: CalibrationConfig {
                mode: args.mode.unwrap_or_default(),
                seed: args.seed.unwrap_or(DEFAULT_SEED),
                sample_size: args.sample_size.unwrap_or(DEFAULT_SAMPLE_SIZE),
                lowest_kept: args.lowest_kept.unwrap_or(DEFAULT_LOWEST_KEPT),
            },
            train_fraction: args.train_fraction.unwrap_or(DEFAULT_TRAIN_FRACTION),
        })
    }
}

/// Calibration on the training split and its held-out test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct CalibrationReport {
    pub(crate) calibration: CalibrationResult,
    /// Threshold in the score space of the embedding aligner.
    pub(crate) alignment_threshold: f32,
    pub(crate) test: CalibrationTest,
}

pub(crate) fn run_calibrate(args: CalibrateArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = CalibrateConfig::try_from(merged)?;
    let report = execute_calibrate(&config)?;
    write_report(writer, "calibration report", &report)
}

fn execute_calibrate(config: &CalibrateConfig) -> Result<CalibrationReport, CliError> {
    require_existing(&config.embeddings_path, ARG_EMBEDDINGS)?;
    let embeddings: PropertyEmbeddings = read_json(&config.embeddings_path)?;
    let (train, held_out) = split_for_calibration(&embeddings, config.train_fraction)?;
    let calibration = calibrate_threshold(&train, config.calibration)?;
    let test = test_calibration(&held_out, config.calibration)?;
    Ok(CalibrationReport {
        calibration,
        alignment_threshold: calibration.alignment_threshold(),
        test,
    })
}
