//! Wikipedia access: rendered article HTML and infobox extraction.
#![forbid(unsafe_code)]

mod error;
mod ops;
mod parse;
mod source;

#[doc(hidden)]
pub mod test_support;
#[doc(hidden)]
pub use test_support::StubPageSource;

pub use error::WikipediaError;
pub use ops::{rest_html_url, scrape_infoboxes};
pub use parse::InfoboxParser;
pub use source::{HttpPageSource, PageSource, PARSOID_ACCEPT};

#[cfg(test)]
mod tests;
