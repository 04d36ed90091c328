//! Completion of Dutch infoboxes and evaluation of verified completions.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wikialign_core::{
    AlignmentMap, CompletedCity, CompletionMode, InfoboxCity, complete_infoboxes, evaluate,
};
use wikialign_data::artefact::{read_json, write_json};

use crate::services::require_existing;
use crate::{
    ARG_COMPLETED, ARG_EMBEDDING_ALIGNMENTS, ARG_INFOBOXES, ARG_VALUE_ALIGNMENTS, CliError,
    ENV_COMPLETE_EMBEDDING_ALIGNMENTS, ENV_COMPLETE_INFOBOXES, ENV_COMPLETE_VALUE_ALIGNMENTS,
    ENV_EVALUATE_COMPLETED, write_report,
};

/// CLI arguments for the `complete` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Copy the values of aligned English infobox rows into Dutch \
                 infoboxes that lack the aligned key. Value alignments are \
                 tried first; with --mode all, embedding alignments fill \
                 whatever remains.",
    about = "Complete Dutch infoboxes from English rows"
)]
#[ortho_config(prefix = "WIKIALIGN")]
pub(crate) struct CompleteArgs {
    /// Infobox cities written by the `infoboxes` command.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) infoboxes_path: Option<Utf8PathBuf>,
    /// Alignment map written by `align --method value`.
    #[arg(long = ARG_VALUE_ALIGNMENTS, value_name = "path")]
    #[serde(default)]
    pub(crate) value_alignments: Option<Utf8PathBuf>,
    /// Alignment map written by `align --method embedding`.
    #[arg(long = ARG_EMBEDDING_ALIGNMENTS, value_name = "path")]
    #[serde(default)]
    pub(crate) embedding_alignments: Option<Utf8PathBuf>,
    /// Completion mode: `value_alignment` or `all`.
    #[arg(long, value_name = "mode")]
    #[serde(default)]
    pub(crate) mode: Option<CompletionMode>,
    /// Where to write the completed cities.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

/// Resolved `complete` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompleteConfig {
    pub(crate) infoboxes_path: Utf8PathBuf,
    pub(crate) value_alignments: Utf8PathBuf,
    pub(crate) embedding_alignments: Option<Utf8PathBuf>,
    pub(crate) mode: CompletionMode,
    pub(crate) output: Utf8PathBuf,
}

impl TryFrom<CompleteArgs> for CompleteConfig {
    type Error = CliError;

    fn try_from(args: CompleteArgs) -> Result<Self, Self::Error> {
        let infoboxes_path = args.infoboxes_path.ok_or(CliError::MissingArgument {
            field: ARG_INFOBOXES,
            env: ENV_COMPLETE_INFOBOXES,
        })?;
        let value_alignments = args.value_alignments.ok_or(CliError::MissingArgument {
            field: ARG_VALUE_ALIGNMENTS,
            env: ENV_COMPLETE_VALUE_ALIGNMENTS,
        })?;
        let mode = args.mode.unwrap_or_default();
        if mode == CompletionMode::All && args.embedding_alignments.is_none() {
            return Err(CliError::MissingArgument {
                field: ARG_EMBEDDING_ALIGNMENTS,
                env: ENV_COMPLETE_EMBEDDING_ALIGNMENTS,
            });
        }
        Ok(Self {
            infoboxes_path,
            value_alignments,
            embedding_alignments: args.embedding_alignments,
            mode,
            output: args
                .output
                .unwrap_or_else(|| Utf8PathBuf::from("completed_infoboxes.json")),
        })
    }
}

pub(crate) fn run_complete(args: CompleteArgs) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = CompleteConfig::try_from(merged)?;
    let completed = execute_complete(&config)?;
    write_json(&config.output, &completed)?;
    log::info!(
        "wrote {} completions over {} cities to {}",
        completed.iter().map(|city| city.completions.len()).sum::<usize>(),
        completed.len(),
        config.output
    );
    Ok(())
}

fn execute_complete(config: &CompleteConfig) -> Result<Vec<CompletedCity>, CliError> {
    require_existing(&config.infoboxes_path, ARG_INFOBOXES)?;
    require_existing(&config.value_alignments, ARG_VALUE_ALIGNMENTS)?;
    let cities: Vec<InfoboxCity> = read_json(&config.infoboxes_path)?;
    let value_map: AlignmentMap = read_json(&config.value_alignments)?;
    let embedding_map: Option<AlignmentMap> = match &config.embedding_alignments {
        Some(path) if config.mode == CompletionMode::All => {
            require_existing(path, ARG_EMBEDDING_ALIGNMENTS)?;
            Some(read_json(path)?)
        }
        _ => None,
    };
    Ok(complete_infoboxes(
        config.mode,
        cities,
        &value_map,
        embedding_map.as_ref(),
    ))
}

#[cfg(test)]
pub(crate) fn complete_config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<CompleteConfig, CliError> {
    let merged = CompleteArgs::merge_from_layers(layers).map_err(CliError::from)?;
    CompleteConfig::try_from(merged)
}

/// CLI arguments for the `evaluate` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Count the completions proposed by each alignment method \
                 and how many of them were marked correct after manual \
                 verification.",
    about = "Tally verified completions"
)]
#[ortho_config(prefix = "WIKIALIGN")]
pub(crate) struct EvaluateArgs {
    /// Completed cities, with `correct` flags filled in by hand.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) completed_path: Option<Utf8PathBuf>,
}

pub(crate) fn run_evaluate(args: EvaluateArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let completed_path = merged.completed_path.ok_or(CliError::MissingArgument {
        field: ARG_COMPLETED,
        env: ENV_EVALUATE_COMPLETED,
    })?;
    require_existing(&completed_path, ARG_COMPLETED)?;
    let completed: Vec<CompletedCity> = read_json(&completed_path)?;
    write_report(writer, "evaluation report", &evaluate(&completed))
}
