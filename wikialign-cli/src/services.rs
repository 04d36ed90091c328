//! Construction of the network adapters used by the collection stages.
//!
//! Commands receive a [`Services`] implementation instead of building
//! clients themselves, so tests can swap in in-memory sources.

use std::future::Future;
use std::time::Duration;

use camino::Utf8Path;
use wikialign_core::EmbeddingProvider;
use wikialign_data::embedding::{FeatureExtractionConfig, HttpEmbeddingProvider};
use wikialign_data::http::{HttpClientConfig, RetryPolicy};
use wikialign_data::wikidata::{HttpWikidataSource, WikidataConfig, WikidataSource};
use wikialign_data::wikipedia::{HttpPageSource, PageSource};

use crate::CliError;

/// Builds the remote sources a command talks to.
pub(crate) trait Services {
    fn wikidata(&self, config: WikidataConfig) -> Result<Box<dyn WikidataSource>, CliError>;
    fn pages(&self, http: &HttpClientConfig) -> Result<Box<dyn PageSource>, CliError>;
    fn embedder(
        &self,
        config: FeatureExtractionConfig,
    ) -> Result<Box<dyn EmbeddingProvider>, CliError>;
}

/// Live HTTP adapters.
pub(crate) struct HttpServices;

impl Services for HttpServices {
    fn wikidata(&self, config: WikidataConfig) -> Result<Box<dyn WikidataSource>, CliError> {
        let source = HttpWikidataSource::new(config).map_err(|source| CliError::BuildClient {
            adapter: "Wikidata",
            source,
        })?;
        Ok(Box::new(source))
    }

    fn pages(&self, http: &HttpClientConfig) -> Result<Box<dyn PageSource>, CliError> {
        let source = HttpPageSource::new(http).map_err(|source| CliError::BuildClient {
            adapter: "Wikipedia",
            source,
        })?;
        Ok(Box::new(source))
    }

    fn embedder(
        &self,
        config: FeatureExtractionConfig,
    ) -> Result<Box<dyn EmbeddingProvider>, CliError> {
        let provider =
            HttpEmbeddingProvider::new(config).map_err(|source| CliError::BuildClient {
                adapter: "feature-extraction",
                source,
            })?;
        Ok(Box::new(provider))
    }
}

/// Client settings from the optional timeout and attempt overrides.
pub(crate) fn http_config(timeout_secs: Option<u64>, max_attempts: Option<u32>) -> HttpClientConfig {
    let mut config = HttpClientConfig::default();
    if let Some(secs) = timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(attempts) = max_attempts {
        config = config.with_retry(RetryPolicy::default().with_max_attempts(attempts));
    }
    config
}

/// Drive an async collection stage to completion.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    Ok(runtime.block_on(future))
}

/// Fail unless `path` names an existing file.
pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match wikialign_fs::file_is_file(path) {
        Ok(true) => Ok(()),
        Ok(false) if path.exists() => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Ok(false) => Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}
