//! Wikidata access: the city query, per-entity claims and property labels.
//!
//! [`WikidataSource`] returns raw response bodies so the parsing in
//! [`fetch_cities`], [`collect_properties`] and friends can be exercised
//! against canned JSON. [`HttpWikidataSource`] is the live implementation.
#![forbid(unsafe_code)]

mod error;
mod ops;
mod source;

#[doc(hidden)]
pub mod test_support;
#[doc(hidden)]
pub use test_support::StubWikidataSource;

pub use error::WikidataError;
pub use ops::{
    DEFAULT_MIN_POPULATION, LABEL_BATCH_SIZE, city_query, collect_city_properties,
    collect_properties, fetch_cities, fetch_claim_ids, fetch_labels,
};
pub use source::{
    DEFAULT_API_URL, DEFAULT_SPARQL_URL, HttpWikidataSource, WikidataConfig, WikidataSource,
};
