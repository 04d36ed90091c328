//! Test-only, in-memory doubles and corpus builders used by unit and
//! behaviour tests.

use std::cell::Cell;
use std::collections::HashMap;

use crate::{City, Embedding, EmbeddingError, EmbeddingProvider, Infobox, InfoboxCity, Language};

/// Deterministic `EmbeddingProvider` answering from a lookup table.
///
/// Texts without a configured vector fail with
/// [`EmbeddingError::ParseError`], which keeps accidental lookups visible in
/// tests.
#[derive(Debug, Default)]
pub struct StubEmbeddingProvider {
    embeddings: HashMap<String, Embedding>,
    error: Option<EmbeddingError>,
    calls: Cell<usize>,
}

impl StubEmbeddingProvider {
    /// Register the vector returned for `text`.
    #[must_use]
    pub fn with_embedding(mut self, text: impl Into<String>, values: Vec<f32>) -> Self {
        self.embeddings.insert(text.into(), Embedding::new(values));
        self
    }

    /// Create a provider failing every non-empty request with `error`.
    #[must_use]
    pub fn with_error(error: EmbeddingError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Number of non-empty requests served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl EmbeddingProvider for StubEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        self.calls.set(self.calls.get().saturating_add(1));
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        self.embeddings
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::ParseError {
                message: format!("no stub embedding for {text:?}"),
            })
    }
}

/// Build an [`InfoboxCity`] whose rows each hold a single value line.
#[must_use]
pub fn infobox_city(name: &str, en: &[(&str, &str)], nl: &[(&str, &str)]) -> InfoboxCity {
    let uri = format!("http://www.wikidata.org/entity/{name}");
    let city = City::new(
        name,
        uri,
        format!("https://en.wikipedia.org/wiki/{name}"),
        format!("https://nl.wikipedia.org/wiki/{name}"),
    );
    InfoboxCity::new(city)
        .with_infobox(Language::En, single_line_infobox(en))
        .with_infobox(Language::Nl, single_line_infobox(nl))
}

fn single_line_infobox(rows: &[(&str, &str)]) -> Infobox {
    rows.iter()
        .map(|(key, value)| ((*key).to_owned(), vec![(*value).to_owned()]))
        .collect()
}
