//! Error types produced by the Wikipedia helpers.

use thiserror::Error;

use crate::http::TransportError;

/// Errors produced while scraping infoboxes.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WikipediaError {
    /// The page could not be fetched.
    #[error("Wikipedia request failed: {source}")]
    Transport {
        /// Underlying transport failure.
        #[from]
        source: TransportError,
    },
    /// The article URL does not point at a `/wiki/` page.
    #[error("not a Wikipedia article URL: {url}")]
    InvalidArticleUrl {
        /// Offending URL.
        url: String,
    },
    /// A built-in CSS selector or pattern failed to compile.
    #[error("invalid infobox pattern {pattern:?}: {message}")]
    Pattern {
        /// Selector or regular expression.
        pattern: String,
        /// Compiler message.
        message: String,
    },
}
