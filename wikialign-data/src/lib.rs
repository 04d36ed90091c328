//! Network and filesystem adapters for the infobox alignment pipeline.
//!
//! Responsibilities:
//! - Query Wikidata for cities, claimed properties and their labels.
//! - Fetch rendered Wikipedia articles and extract their infoboxes.
//! - Embed property labels through a feature-extraction HTTP service.
//! - Persist every stage's output as a JSON artefact.
//!
//! Boundaries:
//! - Do not encode alignment rules (live in `wikialign-core`).
//! - Every request goes through the bounded retry in [`http`].
//!
//! Invariants:
//! - No global mutable state; clients and runtimes belong to their adapter.

pub mod artefact;
pub mod embedding;
pub mod http;
pub mod wikidata;
pub mod wikipedia;
