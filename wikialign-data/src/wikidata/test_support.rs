//! In-memory [`WikidataSource`] used by tests and examples.

use std::cell::RefCell;
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::WikidataSource;
use crate::http::TransportError;

/// Stub [`WikidataSource`] answering from canned data.
///
/// Entity data and label responses are rendered from the registered claims
/// and labels, so tests describe the data rather than the wire format.
#[derive(Debug, Default)]
pub struct StubWikidataSource {
    sparql: Option<String>,
    claims: BTreeMap<String, Vec<String>>,
    raw_entities: BTreeMap<String, String>,
    labels: BTreeMap<String, (Option<String>, Option<String>)>,
    failing_status: Option<u16>,
    label_batches: RefCell<Vec<usize>>,
}

impl StubWikidataSource {
    /// Return `body` for every SPARQL query.
    #[must_use]
    pub fn with_sparql(mut self, body: impl Into<String>) -> Self {
        self.sparql = Some(body.into());
        self
    }

    /// Register the claimed property ids of `entity_id`.
    #[must_use]
    pub fn with_claims(mut self, entity_id: &str, properties: &[&str]) -> Self {
        self.claims.insert(
            entity_id.to_owned(),
            properties.iter().map(|&id| id.to_owned()).collect(),
        );
        self
    }

    /// Return `body` verbatim as the entity data of `entity_id`.
    #[must_use]
    pub fn with_entity_body(mut self, entity_id: &str, body: impl Into<String>) -> Self {
        self.raw_entities.insert(entity_id.to_owned(), body.into());
        self
    }

    /// Register labels for `id`.
    #[must_use]
    pub fn with_labels(mut self, id: &str, en: Option<&str>, nl: Option<&str>) -> Self {
        self.labels
            .insert(id.to_owned(), (en.map(str::to_owned), nl.map(str::to_owned)));
        self
    }

    /// Fail every request with HTTP `status`.
    #[must_use]
    pub fn failing_with(mut self, status: u16) -> Self {
        self.failing_status = Some(status);
        self
    }

    /// Sizes of the label batches requested so far.
    #[must_use]
    pub fn label_batches(&self) -> Vec<usize> {
        self.label_batches.borrow().clone()
    }

    fn check(&self, url: &str) -> Result<(), TransportError> {
        match self.failing_status {
            Some(status) => Err(TransportError::Http {
                url: url.to_owned(),
                status,
                message: "stubbed failure".to_owned(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait(?Send)]
impl WikidataSource for StubWikidataSource {
    async fn sparql(&self, _query: &str) -> Result<Vec<u8>, TransportError> {
        self.check("stub://sparql")?;
        let body = self
            .sparql
            .clone()
            .unwrap_or_else(|| r#"{"results":{"bindings":[]}}"#.to_owned());
        Ok(body.into_bytes())
    }

    async fn entity_data(&self, entity_id: &str) -> Result<Vec<u8>, TransportError> {
        let url = format!("stub://entity/{entity_id}");
        self.check(&url)?;
        if let Some(raw) = self.raw_entities.get(entity_id) {
            return Ok(raw.clone().into_bytes());
        }
        let Some(properties) = self.claims.get(entity_id) else {
            return Err(TransportError::Http {
                url,
                status: 404,
                message: "no such entity".to_owned(),
            });
        };
        let claims: Map<String, Value> = properties
            .iter()
            .map(|id| (id.clone(), json!([])))
            .collect();
        let body = json!({ "entities": { entity_id: { "id": entity_id, "claims": claims } } });
        Ok(body.to_string().into_bytes())
    }

    async fn labels(&self, ids: &[String]) -> Result<Vec<u8>, TransportError> {
        self.check("stub://labels")?;
        self.label_batches.borrow_mut().push(ids.len());
        let mut entities = Map::new();
        for id in ids {
            let Some((en, nl)) = self.labels.get(id) else {
                continue;
            };
            let mut labels = Map::new();
            for (language, label) in [("en", en), ("nl", nl)] {
                if let Some(value) = label {
                    labels.insert(
                        language.to_owned(),
                        json!({ "language": language, "value": value }),
                    );
                }
            }
            entities.insert(id.clone(), json!({ "id": id, "labels": labels }));
        }
        Ok(json!({ "entities": entities }).to_string().into_bytes())
    }
}
