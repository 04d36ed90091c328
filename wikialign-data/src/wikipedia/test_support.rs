//! In-memory [`PageSource`] used by tests and examples.

use std::cell::RefCell;
use std::collections::BTreeMap;

use async_trait::async_trait;

use super::PageSource;
use crate::http::TransportError;

const EMPTY_PAGE: &str = "<html><body><p>No infobox here.</p></body></html>";

/// Stub [`PageSource`] serving registered pages by URL.
///
/// Unregistered URLs return a page without an infobox.
#[derive(Debug, Default)]
pub struct StubPageSource {
    pages: BTreeMap<String, String>,
    failing: BTreeMap<String, u16>,
    requested: RefCell<Vec<String>>,
}

impl StubPageSource {
    /// Serve `html` at `url`.
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Fail requests for `url` with HTTP `status`.
    #[must_use]
    pub fn failing_at(mut self, url: impl Into<String>, status: u16) -> Self {
        self.failing.insert(url.into(), status);
        self
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn requested(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

#[async_trait(?Send)]
impl PageSource for StubPageSource {
    async fn fetch_html(&self, url: &str) -> Result<String, TransportError> {
        self.requested.borrow_mut().push(url.to_owned());
        if let Some(&status) = self.failing.get(url) {
            return Err(TransportError::Http {
                url: url.to_owned(),
                status,
                message: "stubbed failure".to_owned(),
            });
        }
        Ok(self
            .pages
            .get(url)
            .map_or_else(|| EMPTY_PAGE.to_owned(), Clone::clone))
    }
}
