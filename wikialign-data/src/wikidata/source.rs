use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;

use crate::http::{
    ClientBuildError, HttpClientConfig, TransportError, check_status, convert_reqwest_error,
    read_body, retry, sanitise_base_url,
};

/// Default SPARQL endpoint.
pub const DEFAULT_SPARQL_URL: &str = "https://query.wikidata.org/sparql";
/// Default base URL for entity data and the action API.
pub const DEFAULT_API_URL: &str = "https://www.wikidata.org";

const SPARQL_ACCEPT: &str = "application/sparql-results+json,*/*;q=0.9";

/// Raw access to the Wikidata endpoints used by the pipeline.
#[async_trait(?Send)]
pub trait WikidataSource {
    /// Run a SPARQL query and return the JSON result body.
    async fn sparql(&self, query: &str) -> Result<Vec<u8>, TransportError>;
    /// Fetch `Special:EntityData/{entity_id}.json`.
    async fn entity_data(&self, entity_id: &str) -> Result<Vec<u8>, TransportError>;
    /// Fetch English and Dutch labels for up to 50 entity ids.
    async fn labels(&self, ids: &[String]) -> Result<Vec<u8>, TransportError>;
}

/// Endpoints and client settings for [`HttpWikidataSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikidataConfig {
    /// SPARQL endpoint URL.
    pub sparql_url: String,
    /// Base URL for entity data and `w/api.php`.
    pub api_url: String,
    /// Shared client settings.
    pub http: HttpClientConfig,
}

impl Default for WikidataConfig {
    fn default() -> Self {
        Self {
            sparql_url: DEFAULT_SPARQL_URL.to_owned(),
            api_url: DEFAULT_API_URL.to_owned(),
            http: HttpClientConfig::default(),
        }
    }
}

impl WikidataConfig {
    /// Override the SPARQL endpoint.
    #[must_use]
    pub fn with_sparql_url(mut self, url: impl Into<String>) -> Self {
        self.sparql_url = sanitise_base_url(url, DEFAULT_SPARQL_URL);
        self
    }

    /// Override the entity data and action API base URL.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = sanitise_base_url(url, DEFAULT_API_URL);
        self
    }

    /// Override the client settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }
}

/// HTTP implementation of [`WikidataSource`].
#[derive(Debug)]
pub struct HttpWikidataSource {
    client: Client,
    config: WikidataConfig,
}

impl HttpWikidataSource {
    /// Construct a source using `config`.
    ///
    /// # Errors
    /// Returns [`ClientBuildError`] when the HTTP client cannot be built.
    pub fn new(config: WikidataConfig) -> Result<Self, ClientBuildError> {
        let client = config.http.build_client()?;
        Ok(Self { client, config })
    }

    fn entity_data_url(&self, entity_id: &str) -> String {
        format!(
            "{}/wiki/Special:EntityData/{entity_id}.json",
            self.config.api_url
        )
    }

    fn api_url(&self) -> String {
        format!("{}/w/api.php", self.config.api_url)
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Vec<u8>, TransportError> {
        retry(&self.config.http.retry, url, || async move {
            let response = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .map_err(|err| convert_reqwest_error(err, url))?;
            read_body(check_status(response, url)?, url).await
        })
        .await
    }
}

#[async_trait(?Send)]
impl WikidataSource for HttpWikidataSource {
    async fn sparql(&self, query: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.config.sparql_url.as_str();
        let form = [("query", query), ("format", "json")];
        retry(&self.config.http.retry, url, || async move {
            let response = self
                .client
                .post(url)
                .header(ACCEPT, SPARQL_ACCEPT)
                .form(&form)
                .send()
                .await
                .map_err(|err| convert_reqwest_error(err, url))?;
            read_body(check_status(response, url)?, url).await
        })
        .await
    }

    async fn entity_data(&self, entity_id: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.entity_data_url(entity_id);
        self.get(&url, &[]).await
    }

    async fn labels(&self, ids: &[String]) -> Result<Vec<u8>, TransportError> {
        let url = self.api_url();
        let joined = ids.join("|");
        let query = [
            ("action", "wbgetentities"),
            ("props", "labels"),
            ("ids", joined.as_str()),
            ("languages", "en|nl"),
            ("format", "json"),
        ];
        self.get(&url, &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn builds_endpoint_urls() {
        let source = HttpWikidataSource::new(
            WikidataConfig::default().with_api_url("https://wikidata.example/"),
        )
        .expect("source should build");

        assert_eq!(
            source.entity_data_url("Q727"),
            "https://wikidata.example/wiki/Special:EntityData/Q727.json"
        );
        assert_eq!(source.api_url(), "https://wikidata.example/w/api.php");
    }

    #[rstest]
    fn empty_overrides_fall_back_to_defaults() {
        let config = WikidataConfig::default()
            .with_sparql_url("")
            .with_api_url("/");
        assert_eq!(config.sparql_url, DEFAULT_SPARQL_URL);
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }
}
