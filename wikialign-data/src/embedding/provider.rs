use std::fmt;
use std::io;

use reqwest::Client;
use serde_json::json;
use tokio::runtime::Runtime;
use wikialign_core::{Embedding, EmbeddingError, EmbeddingProvider};

use super::response::parse_embedding;
use crate::http::{
    ClientBuildError, HttpClientConfig, TransportError, block_on, build_runtime, check_status,
    convert_reqwest_error, read_body, retry, sanitise_base_url,
};

/// Default feature-extraction service.
pub const DEFAULT_EMBEDDING_URL: &str = "https://api-inference.huggingface.co";

/// Default multilingual model.
pub const DEFAULT_MODEL: &str = "xlm-roberta-base";

/// Settings for [`HttpEmbeddingProvider`].
///
/// ```
/// use wikialign_data::embedding::FeatureExtractionConfig;
///
/// let config = FeatureExtractionConfig::new("http://localhost:8080/").with_model("bert-base");
/// assert_eq!(config.endpoint(), "http://localhost:8080/pipeline/feature-extraction/bert-base");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct FeatureExtractionConfig {
    /// Service base URL.
    pub base_url: String,
    /// Model name appended to the pipeline path.
    pub model: String,
    /// Bearer token sent when present.
    pub api_token: Option<String>,
    /// Shared client settings.
    pub http: HttpClientConfig,
}

impl fmt::Debug for FeatureExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureExtractionConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("http", &self.http)
            .finish()
    }
}

impl Default for FeatureExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EMBEDDING_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            api_token: None,
            http: HttpClientConfig::default(),
        }
    }
}

impl FeatureExtractionConfig {
    /// Configuration for the service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: sanitise_base_url(base_url, DEFAULT_EMBEDDING_URL),
            ..Self::default()
        }
    }

    /// Use `model` instead of [`DEFAULT_MODEL`].
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Authenticate with `token`.
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Override the client settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    /// Fully qualified feature-extraction URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/pipeline/feature-extraction/{}",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Feature-extraction client behind the synchronous [`EmbeddingProvider`]
/// trait.
///
/// The provider owns its HTTP client and a current-thread runtime that is
/// reused across calls. Inside a multi-threaded runtime it borrows the
/// caller's handle through `block_in_place` instead.
pub struct HttpEmbeddingProvider {
    client: Client,
    config: FeatureExtractionConfig,
    runtime: Runtime,
}

impl fmt::Debug for HttpEmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEmbeddingProvider")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl HttpEmbeddingProvider {
    /// Build a provider from `config`.
    ///
    /// # Errors
    /// Returns [`ClientBuildError`] if the HTTP client or runtime cannot be
    /// built.
    pub fn new(config: FeatureExtractionConfig) -> Result<Self, ClientBuildError> {
        let client = config.http.build_client()?;
        let runtime = build_runtime()?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// Model the provider queries.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn fetch(&self, text: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.config.endpoint();
        let url = url.as_str();
        let payload = json!({ "inputs": text });
        let payload = &payload;
        retry(&self.config.http.retry, url, || async move {
            let mut request = self.client.post(url).json(payload);
            if let Some(token) = &self.config.api_token {
                request = request.bearer_auth(token);
            }
            let response = request
                .send()
                .await
                .map_err(|err| convert_reqwest_error(err, url))?;
            read_body(check_status(response, url)?, url).await
        })
        .await
    }

    fn convert_transport_error(&self, error: &TransportError) -> EmbeddingError {
        match error.last_attempt() {
            TransportError::Http {
                url,
                status,
                message,
            } => EmbeddingError::HttpError {
                url: url.clone(),
                status: *status,
                message: message.clone(),
            },
            TransportError::Network { url, source } if source.kind() == io::ErrorKind::TimedOut => {
                EmbeddingError::Timeout {
                    url: url.clone(),
                    timeout_secs: self.config.http.timeout.as_secs(),
                }
            }
            TransportError::Network { url, source } => EmbeddingError::NetworkError {
                url: url.clone(),
                message: source.to_string(),
            },
            other => EmbeddingError::NetworkError {
                url: self.config.endpoint(),
                message: other.to_string(),
            },
        }
    }
}

impl EmbeddingProvider for HttpEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        let body = block_on(&self.runtime, self.fetch(text))
            .map_err(|err| self.convert_transport_error(&err))?;
        let embedding = parse_embedding(body)?;
        log::debug!("embedded {text:?} into {} dimensions", embedding.len());
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn provider() -> HttpEmbeddingProvider {
        HttpEmbeddingProvider::new(FeatureExtractionConfig::new("http://embeddings.invalid"))
            .expect("provider should build")
    }

    #[rstest]
    fn defaults_to_multilingual_model() {
        let config = FeatureExtractionConfig::default();
        assert_eq!(
            config.endpoint(),
            "https://api-inference.huggingface.co/pipeline/feature-extraction/xlm-roberta-base"
        );
        assert!(config.api_token.is_none());
    }

    #[rstest]
    fn redacts_token_in_debug_output() {
        let config = FeatureExtractionConfig::default().with_api_token("hf_secret");
        let rendered = format!("{config:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("hf_secret"));
    }

    #[rstest]
    fn empty_text_is_rejected_before_any_request() {
        assert_eq!(provider().embed(""), Err(EmbeddingError::EmptyInput));
    }

    #[rstest]
    fn maps_exhausted_http_errors_to_last_status() {
        let err = TransportError::RetriesExhausted {
            url: "http://embeddings.invalid".to_owned(),
            attempts: 5,
            source: Box::new(TransportError::Http {
                url: "http://embeddings.invalid".to_owned(),
                status: 503,
                message: "loading".to_owned(),
            }),
        };
        let converted = provider().convert_transport_error(&err);
        assert!(matches!(
            converted,
            EmbeddingError::HttpError { status: 503, .. }
        ));
    }

    #[rstest]
    fn maps_timeouts() {
        let err = TransportError::Network {
            url: "http://embeddings.invalid".to_owned(),
            source: io::Error::new(io::ErrorKind::TimedOut, "deadline"),
        };
        let converted = provider().convert_transport_error(&err);
        assert_eq!(
            converted,
            EmbeddingError::Timeout {
                url: "http://embeddings.invalid".to_owned(),
                timeout_secs: 30,
            }
        );
    }
}
