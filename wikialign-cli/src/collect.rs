//! Collection stages: cities, infoboxes and Wikidata properties.

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wikialign_core::{City, PropertyTable};
use wikialign_data::artefact::{read_json, write_json};
use wikialign_data::http::HttpClientConfig;
use wikialign_data::wikidata::{
    DEFAULT_MIN_POPULATION, WikidataConfig, collect_city_properties, collect_properties,
    fetch_cities,
};
use wikialign_data::wikipedia::{InfoboxParser, scrape_infoboxes};

use crate::services::{Services, block_on, http_config, require_existing};
use crate::{
    ARG_CITIES, ARG_LABELS_FROM, ARG_SORTED_OUTPUT, CliError, ENV_INFOBOXES_CITIES,
    ENV_PROPERTIES_CITIES,
};

/// CLI arguments for the `cities` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Query the Wikidata SPARQL endpoint for cities above a \
                 population threshold that have both an English and a Dutch \
                 Wikipedia article, and store them as JSON.",
    about = "Fetch the city corpus from Wikidata"
)]
#[ortho_config(prefix = "WIKIALIGN")]
pub(crate) struct CitiesArgs {
    /// Where to write the city list.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Minimum population of a selected city.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) min_population: Option<u64>,
    /// SPARQL endpoint URL.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) sparql_url: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Attempts per request, including the first.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) max_attempts: Option<u32>,
}

/// Resolved `cities` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CitiesConfig {
    pub(crate) output: Utf8PathBuf,
    pub(crate) min_population: u64,
    pub(crate) wikidata: WikidataConfig,
}

impl From<CitiesArgs> for CitiesConfig {
    fn from(args: CitiesArgs) -> Self {
        let mut wikidata =
            WikidataConfig::default().with_http(http_config(args.timeout_secs, args.max_attempts));
        if let Some(url) = args.sparql_url {
            wikidata = wikidata.with_sparql_url(url);
        }
        Self {
            output: args.output.unwrap_or_else(|| Utf8PathBuf::from("cities.json")),
            min_population: args.min_population.unwrap_or(DEFAULT_MIN_POPULATION),
            wikidata,
        }
    }
}

pub(crate) fn run_cities(args: CitiesArgs, services: &dyn Services) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = CitiesConfig::from(merged);
    let source = services.wikidata(config.wikidata)?;
    let cities = block_on(fetch_cities(&*source, config.min_population))??;
    write_json(&config.output, &cities)?;
    log::info!("wrote {} cities to {}", cities.len(), config.output);
    Ok(())
}

/// CLI arguments for the `infoboxes` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Fetch the rendered English and Dutch article of every city \
                 and extract the rows of its first infobox table.",
    about = "Scrape English and Dutch infoboxes"
)]
#[ortho_config(prefix = "WIKIALIGN")]
pub(crate) struct InfoboxesArgs {
    /// City list written by the `cities` command.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) cities_path: Option<Utf8PathBuf>,
    /// Where to write the infobox cities.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Per-request timeout in seconds.
    #[arg(long, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Attempts per request, including the first.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) max_attempts: Option<u32>,
}

/// Resolved `infoboxes` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InfoboxesConfig {
    pub(crate) cities_path: Utf8PathBuf,
    pub(crate) output: Utf8PathBuf,
    pub(crate) http: HttpClientConfig,
}

impl TryFrom<InfoboxesArgs> for InfoboxesConfig {
    type Error = CliError;

    fn try_from(args: InfoboxesArgs) -> Result<Self, Self::Error> {
        let cities_path = args.cities_path.ok_or(CliError::MissingArgument {
            field: ARG_CITIES,
            env: ENV_INFOBOXES_CITIES,
        })?;
        Ok(Self {
            cities_path,
            output: args.output.unwrap_or_else(|| Utf8PathBuf::from("infoboxes.json")),
            http: http_config(args.timeout_secs, args.max_attempts),
        })
    }
}

pub(crate) fn run_infoboxes(args: InfoboxesArgs, services: &dyn Services) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = InfoboxesConfig::try_from(merged)?;
    require_existing(&config.cities_path, ARG_CITIES)?;
    let cities: Vec<City> = read_json(&config.cities_path)?;
    let source = services.pages(&config.http)?;
    let parser = InfoboxParser::new()?;
    let scraped = block_on(scrape_infoboxes(&*source, &parser, cities))??;
    write_json(&config.output, &scraped)?;
    log::info!("wrote infoboxes of {} cities to {}", scraped.len(), config.output);
    Ok(())
}

/// CLI arguments for the `properties` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read the claims of every city entity and count how many \
                 cities use each property, then resolve English and Dutch \
                 property labels. With --labels-from, list each city's own \
                 properties instead, labelled from an existing table.",
    about = "Collect Wikidata properties and their labels"
)]
#[ortho_config(prefix = "WIKIALIGN")]
pub(crate) struct PropertiesArgs {
    /// City list written by the `cities` command.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) cities_path: Option<Utf8PathBuf>,
    /// Where to write the property table (or per-city listing).
    #[arg(long, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Existing property table; switches to the per-city listing.
    #[arg(long = ARG_LABELS_FROM, value_name = "path")]
    #[serde(default)]
    pub(crate) labels_from: Option<Utf8PathBuf>,
    /// Also write the table as a list ordered by descending frequency.
    #[arg(long = ARG_SORTED_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) sorted_output: Option<Utf8PathBuf>,
    /// Base URL for entity data and the action API.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    pub(crate) api_url: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Attempts per request, including the first.
    #[arg(long, value_name = "count")]
    #[serde(default)]
    pub(crate) max_attempts: Option<u32>,
}

/// Resolved `properties` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PropertiesConfig {
    pub(crate) cities_path: Utf8PathBuf,
    pub(crate) output: Utf8PathBuf,
    pub(crate) labels_from: Option<Utf8PathBuf>,
    pub(crate) sorted_output: Option<Utf8PathBuf>,
    pub(crate) wikidata: WikidataConfig,
}

impl TryFrom<PropertiesArgs> for PropertiesConfig {
    type Error = CliError;

    fn try_from(args: PropertiesArgs) -> Result<Self, Self::Error> {
        let cities_path = args.cities_path.ok_or(CliError::MissingArgument {
            field: ARG_CITIES,
            env: ENV_PROPERTIES_CITIES,
        })?;
        let default_output = if args.labels_from.is_some() {
            "city_properties.json"
        } else {
            "properties.json"
        };
        let mut wikidata =
            WikidataConfig::default().with_http(http_config(args.timeout_secs, args.max_attempts));
        if let Some(url) = args.api_url {
            wikidata = wikidata.with_api_url(url);
        }
        Ok(Self {
            cities_path,
            output: args.output.unwrap_or_else(|| Utf8PathBuf::from(default_output)),
            labels_from: args.labels_from,
            sorted_output: args.sorted_output,
            wikidata,
        })
    }
}

pub(crate) fn run_properties(
    args: PropertiesArgs,
    services: &dyn Services,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = PropertiesConfig::try_from(merged)?;
    require_existing(&config.cities_path, ARG_CITIES)?;
    let cities: Vec<City> = read_json(&config.cities_path)?;
    let source = services.wikidata(config.wikidata.clone())?;
    match &config.labels_from {
        Some(table_path) => {
            require_existing(table_path, ARG_LABELS_FROM)?;
            let table: PropertyTable = read_json(table_path)?;
            let per_city = block_on(collect_city_properties(&*source, &cities, &table))??;
            write_json(&config.output, &per_city)?;
            if config.sorted_output.is_some() {
                log::warn!("--{ARG_SORTED_OUTPUT} is ignored with --{ARG_LABELS_FROM}");
            }
        }
        None => {
            let table = block_on(collect_properties(&*source, &cities))??;
            write_json(&config.output, &table)?;
            if let Some(sorted_path) = &config.sorted_output {
                write_json(sorted_path, &table.sorted_by_frequency())?;
                log::info!("wrote properties by frequency to {sorted_path}");
            }
            log_most_frequent(&table);
        }
    }
    log::info!("wrote properties to {}", config.output);
    Ok(())
}

const MOST_FREQUENT_LOGGED: usize = 10;

fn log_most_frequent(table: &PropertyTable) {
    for property in table.sorted_by_frequency().into_iter().take(MOST_FREQUENT_LOGGED) {
        log::info!(
            "{} ({}): {} cities, {:.1}%",
            property.id,
            property.label_en.as_deref().unwrap_or("unlabelled"),
            property.absolute_frequency,
            property.relative_frequency * 100.0
        );
    }
}
