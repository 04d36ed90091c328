//! Scraped infoboxes attached to their city.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{City, Language};

/// Raw infobox: label text mapped to the ordered value lines of that row.
///
/// A `BTreeMap` keeps iteration, and therefore alignment output, stable
/// between runs.
pub type Infobox = BTreeMap<String, Vec<String>>;

/// A city together with its English and Dutch infoboxes.
///
/// Serialises flat, so the city fields sit next to `infobox_en` and
/// `infobox_nl` in the JSON artefact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoboxCity {
    /// The city the infoboxes belong to.
    #[serde(flatten)]
    pub city: City,
    /// Infobox scraped from the English article.
    #[serde(default)]
    pub infobox_en: Infobox,
    /// Infobox scraped from the Dutch article.
    #[serde(default)]
    pub infobox_nl: Infobox,
}

impl InfoboxCity {
    /// Wrap `city` with empty infoboxes.
    #[must_use]
    pub const fn new(city: City) -> Self {
        Self {
            city,
            infobox_en: Infobox::new(),
            infobox_nl: Infobox::new(),
        }
    }

    /// Replace the infobox for `language`.
    #[must_use]
    pub fn with_infobox(mut self, language: Language, infobox: Infobox) -> Self {
        match language {
            Language::En => self.infobox_en = infobox,
            Language::Nl => self.infobox_nl = infobox,
        }
        self
    }

    /// Borrow the infobox for `language`.
    #[must_use]
    pub const fn infobox(&self, language: Language) -> &Infobox {
        match language {
            Language::En => &self.infobox_en,
            Language::Nl => &self.infobox_nl,
        }
    }

    /// Return whether the Dutch infobox already holds `values` under any key.
    #[must_use]
    pub fn nl_contains_values(&self, values: &[String]) -> bool {
        self.infobox_nl.values().any(|existing| existing == values)
    }
}
