//! Cities drawn from the knowledge graph and the languages they are read in.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wikipedia editions the pipeline reads infoboxes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English Wikipedia, the completion source.
    En,
    /// Dutch Wikipedia, the completion target.
    Nl,
}

impl Language {
    /// Both supported languages in source-then-target order.
    pub const ALL: [Self; 2] = [Self::En, Self::Nl];

    /// ISO 639-1 code used in Wikipedia host names and label requests.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Nl => "nl",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A city with an English and a Dutch Wikipedia article.
///
/// Identity is the knowledge-graph URI; records are not mutated after the
/// fetch stage.
///
/// # Examples
///
/// ```
/// use wikialign_core::{City, Language};
///
/// let city = City::new(
///     "Amsterdam",
///     "http://www.wikidata.org/entity/Q727",
///     "https://en.wikipedia.org/wiki/Amsterdam",
///     "https://nl.wikipedia.org/wiki/Amsterdam",
/// );
/// assert_eq!(city.entity_id(), "Q727");
/// assert_eq!(city.article_url(Language::Nl), "https://nl.wikipedia.org/wiki/Amsterdam");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct City {
    /// English display name.
    pub name: String,
    /// Knowledge-graph entity URI.
    pub uri: String,
    /// English Wikipedia article URL.
    pub url_en: String,
    /// Dutch Wikipedia article URL.
    pub url_nl: String,
}

impl City {
    /// Construct a city record.
    pub fn new(
        name: impl Into<String>,
        uri: impl Into<String>,
        url_en: impl Into<String>,
        url_nl: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            url_en: url_en.into(),
            url_nl: url_nl.into(),
        }
    }

    /// Entity identifier: the final path segment of [`City::uri`].
    #[must_use]
    pub fn entity_id(&self) -> &str {
        let trimmed = self.uri.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }

    /// Article URL for `language`.
    #[must_use]
    pub fn article_url(&self, language: Language) -> &str {
        match language {
            Language::En => &self.url_en,
            Language::Nl => &self.url_nl,
        }
    }
}
