//! Test helpers: in-memory services and a scratch workspace of artefacts.

use super::*;
use crate::services::Services;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use std::cell::RefCell;
use tempfile::TempDir;
use wikialign_core::test_support::StubEmbeddingProvider;
use wikialign_core::EmbeddingProvider;
use wikialign_data::artefact::write_json;
use wikialign_data::embedding::FeatureExtractionConfig;
use wikialign_data::http::HttpClientConfig;
use wikialign_data::wikidata::{StubWikidataSource, WikidataConfig, WikidataSource};
use wikialign_data::wikipedia::{PageSource, StubPageSource};

/// Services handing out pre-built stubs, each at most once.
#[derive(Default)]
pub(super) struct StubServices {
    wikidata: RefCell<Option<StubWikidataSource>>,
    pages: RefCell<Option<StubPageSource>>,
    embedder: RefCell<Option<StubEmbeddingProvider>>,
}

impl StubServices {
    pub(super) fn with_wikidata(self, source: StubWikidataSource) -> Self {
        self.wikidata.replace(Some(source));
        self
    }

    pub(super) fn with_pages(self, source: StubPageSource) -> Self {
        self.pages.replace(Some(source));
        self
    }

    pub(super) fn with_embedder(self, provider: StubEmbeddingProvider) -> Self {
        self.embedder.replace(Some(provider));
        self
    }
}

impl Services for StubServices {
    fn wikidata(&self, _config: WikidataConfig) -> Result<Box<dyn WikidataSource>, CliError> {
        let source = self.wikidata.take().unwrap_or_default();
        Ok(Box::new(source))
    }

    fn pages(&self, _http: &HttpClientConfig) -> Result<Box<dyn PageSource>, CliError> {
        let source = self.pages.take().unwrap_or_default();
        Ok(Box::new(source))
    }

    fn embedder(
        &self,
        _config: FeatureExtractionConfig,
    ) -> Result<Box<dyn EmbeddingProvider>, CliError> {
        let provider = self.embedder.take().unwrap_or_default();
        Ok(Box::new(provider))
    }
}

/// A temporary directory addressed through UTF-8 paths.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn write<T: serde::Serialize + ?Sized>(&self, name: &str, value: &T) -> Utf8PathBuf {
        let path = self.path(name);
        write_json(&path, value).expect("write artefact");
        path
    }

    pub(super) fn write_raw(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("write raw file");
        path
    }
}

pub(super) const SPARQL_BODY: &str = r#"{"results":{"bindings":[
    {"cid":{"value":"http://www.wikidata.org/entity/Q1"},
     "city":{"value":"Gouda"},
     "article_en":{"value":"https://en.wikipedia.org/wiki/Gouda"},
     "article_nl":{"value":"https://nl.wikipedia.org/wiki/Gouda"}},
    {"cid":{"value":"http://www.wikidata.org/entity/Q2"},
     "city":{"value":"Delft"},
     "article_en":{"value":"https://en.wikipedia.org/wiki/Delft"},
     "article_nl":{"value":"https://nl.wikipedia.org/wiki/Delft"}}
]}}"#;

pub(super) fn rest_url(language: &str, title: &str) -> String {
    format!("https://{language}.wikipedia.org/api/rest_v1/page/html/{title}")
}

pub(super) fn infobox_html(rows: &[(&str, &str)]) -> String {
    let body: String = rows
        .iter()
        .map(|(key, value)| format!("<tr><th>{key}</th><td>{value}</td></tr>"))
        .collect();
    format!(r#"<html><body><table class="infobox"><tbody>{body}</tbody></table></body></html>"#)
}

/// Pages for the two stub cities: Gouda has both infoboxes, Delft lacks the Dutch
/// mayor row.
pub(super) fn corpus_pages() -> StubPageSource {
    StubPageSource::default()
        .with_page(
            rest_url("en", "Gouda"),
            infobox_html(&[("Mayor", "Pieter Verhoeve"), ("Area", "18.1 km2")]),
        )
        .with_page(
            rest_url("nl", "Gouda"),
            infobox_html(&[("Burgemeester", "Pieter Verhoeve"), ("Oppervlakte", "18.1 km2")]),
        )
        .with_page(
            rest_url("en", "Delft"),
            infobox_html(&[("Mayor", "Marja van Bijsterveldt"), ("Area", "24.1 km2")]),
        )
        .with_page(
            rest_url("nl", "Delft"),
            infobox_html(&[("Oppervlakte", "24.1 km2")]),
        )
}

pub(super) fn corpus_wikidata() -> StubWikidataSource {
    StubWikidataSource::default()
        .with_sparql(SPARQL_BODY)
        .with_claims("Q1", &["P6", "P2046"])
        .with_claims("Q2", &["P6", "P2046"])
        .with_labels("P6", Some("head of government"), Some("regeringsleider"))
        .with_labels("P2046", Some("area"), Some("oppervlakte"))
}

/// Embeddings placing each property label next to its translation.
pub(super) fn label_embedder() -> StubEmbeddingProvider {
    StubEmbeddingProvider::default()
        .with_embedding("head of government", vec![1.0, 0.0])
        .with_embedding("regeringsleider", vec![0.9, 0.1])
        .with_embedding("area", vec![0.0, 1.0])
        .with_embedding("oppervlakte", vec![0.1, 0.9])
}

/// Embeddings placing each infobox key next to its translation.
pub(super) fn key_embedder() -> StubEmbeddingProvider {
    StubEmbeddingProvider::default()
        .with_embedding("Mayor", vec![1.0, 0.0])
        .with_embedding("Burgemeester", vec![0.9, 0.1])
        .with_embedding("Area", vec![0.0, 1.0])
        .with_embedding("Oppervlakte", vec![0.1, 0.9])
}

pub(super) fn run_cli(
    argv: &[&str],
    services: &dyn Services,
    stdout: &mut Vec<u8>,
) -> Result<(), CliError> {
    let mut invocation = vec!["wikialign"];
    invocation.extend_from_slice(argv);
    let cli = Cli::try_parse_from(invocation).map_err(CliError::from)?;
    run_command_with(cli.command, services, stdout)
}

pub(super) fn expect_missing(result: Result<impl std::fmt::Debug, CliError>, field: &str, env: &str) {
    match result.expect_err("missing argument should error") {
        CliError::MissingArgument {
            field: missing,
            env: variable,
        } => {
            assert_eq!(missing, field);
            assert_eq!(variable, env);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}
