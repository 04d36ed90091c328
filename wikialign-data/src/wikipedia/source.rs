use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;

use crate::http::{
    ClientBuildError, HttpClientConfig, RetryPolicy, TransportError, check_status,
    convert_reqwest_error, retry,
};

/// `Accept` header asking for Parsoid HTML.
pub const PARSOID_ACCEPT: &str =
    r#"text/html; charset=utf-8; profile="https://www.mediawiki.org/wiki/Specs/HTML/2.1.0""#;

/// Source of rendered article HTML.
#[async_trait(?Send)]
pub trait PageSource {
    /// Fetch the HTML served at `url`.
    async fn fetch_html(&self, url: &str) -> Result<String, TransportError>;
}

/// HTTP implementation of [`PageSource`].
#[derive(Debug)]
pub struct HttpPageSource {
    client: Client,
    retry: RetryPolicy,
}

impl HttpPageSource {
    /// Construct a page source using `config`.
    ///
    /// # Errors
    /// Returns [`ClientBuildError`] when the HTTP client cannot be built.
    pub fn new(config: &HttpClientConfig) -> Result<Self, ClientBuildError> {
        Ok(Self {
            client: config.build_client()?,
            retry: config.retry,
        })
    }
}

#[async_trait(?Send)]
impl PageSource for HttpPageSource {
    async fn fetch_html(&self, url: &str) -> Result<String, TransportError> {
        retry(&self.retry, url, || async move {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, PARSOID_ACCEPT)
                .send()
                .await
                .map_err(|err| convert_reqwest_error(err, url))?;
            check_status(response, url)?
                .text()
                .await
                .map_err(|err| convert_reqwest_error(err, url))
        })
        .await
    }
}
