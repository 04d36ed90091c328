use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use wikialign_core::{
    City, CityProperties, CityProperty, PropertyAccumulator, PropertyLabels, PropertyTable,
};

use super::{WikidataError, WikidataSource};

/// Population threshold used when none is configured.
pub const DEFAULT_MIN_POPULATION: u64 = 125_000;

/// Maximum number of ids accepted by a single `wbgetentities` call.
pub const LABEL_BATCH_SIZE: usize = 50;

/// SPARQL query selecting cities above `min_population` that have both an
/// English and a Dutch Wikipedia article.
///
/// # Examples
/// ```
/// use wikialign_data::wikidata::city_query;
///
/// let query = city_query(1_000_000);
/// assert!(query.contains("?population > 1000000"));
/// assert!(query.contains("wdt:P31 wd:Q515"));
/// ```
#[must_use]
pub fn city_query(min_population: u64) -> String {
    format!(
        r#"PREFIX schema: <http://schema.org/>
PREFIX wikibase: <http://wikiba.se/ontology#>
PREFIX wd: <http://www.wikidata.org/entity/>
PREFIX wdt: <http://www.wikidata.org/prop/direct/>

SELECT DISTINCT ?cid ?city ?article_en ?article_nl
WHERE {{
    ?cid wdt:P31 wd:Q515 .
    ?cid wdt:P1082 ?population .
    ?cid rdfs:label ?city filter (lang(?city) = "en") .
    ?article_en schema:about ?cid .
    ?article_en schema:inLanguage "en" .
    ?article_nl schema:about ?cid .
    ?article_nl schema:inLanguage "nl"
    FILTER (
        SUBSTR(str(?article_en), 1, 25) = "https://en.wikipedia.org/"
        && SUBSTR(str(?article_nl), 1, 25) = "https://nl.wikipedia.org/"
        && ?population > {min_population}
    )
}}"#
    )
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<BTreeMap<String, SparqlTerm>>,
}

#[derive(Debug, Deserialize)]
struct SparqlTerm {
    value: String,
}

#[derive(Debug, Deserialize)]
struct EntityDataResponse {
    #[serde(default)]
    entities: BTreeMap<String, EntityRecord>,
}

#[derive(Debug, Deserialize)]
struct EntityRecord {
    #[serde(default)]
    claims: BTreeMap<String, IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct LabelsResponse {
    #[serde(default)]
    entities: BTreeMap<String, LabelledEntity>,
}

#[derive(Debug, Deserialize)]
struct LabelledEntity {
    #[serde(default)]
    labels: BTreeMap<String, SparqlTerm>,
}

fn parse<T: DeserializeOwned>(mut body: Vec<u8>, what: impl Into<String>) -> Result<T, WikidataError> {
    simd_json::from_slice(body.as_mut_slice()).map_err(|source| WikidataError::Parse {
        what: what.into(),
        source,
    })
}

fn city_from_binding(binding: &BTreeMap<String, SparqlTerm>) -> Option<City> {
    let field = |name: &str| binding.get(name).map(|term| term.value.clone());
    Some(City::new(
        field("city")?,
        field("cid")?,
        field("article_en")?,
        field("article_nl")?,
    ))
}

/// Query the cities above `min_population`.
///
/// Bindings missing any field are skipped with a warning.
///
/// # Errors
/// Returns [`WikidataError`] when the query fails or the response is not
/// SPARQL JSON.
///
/// # Examples
/// ```
/// use wikialign_data::wikidata::{StubWikidataSource, fetch_cities};
///
/// let source = StubWikidataSource::default().with_sparql(
///     r#"{"results":{"bindings":[{
///         "cid":{"value":"http://www.wikidata.org/entity/Q727"},
///         "city":{"value":"Amsterdam"},
///         "article_en":{"value":"https://en.wikipedia.org/wiki/Amsterdam"},
///         "article_nl":{"value":"https://nl.wikipedia.org/wiki/Amsterdam"}}]}}"#,
/// );
/// let runtime = tokio::runtime::Builder::new_current_thread().build()?;
/// let cities = runtime.block_on(fetch_cities(&source, 125_000))?;
/// assert_eq!(cities[0].entity_id(), "Q727");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub async fn fetch_cities<S: WikidataSource + ?Sized>(
    source: &S,
    min_population: u64,
) -> Result<Vec<City>, WikidataError> {
    let body = source.sparql(&city_query(min_population)).await?;
    let response: SparqlResponse = parse(body, "SPARQL city results")?;
    let mut cities = Vec::with_capacity(response.results.bindings.len());
    for binding in &response.results.bindings {
        match city_from_binding(binding) {
            Some(city) => cities.push(city),
            None => log::warn!(
                "skipping incomplete city binding with fields {:?}",
                binding.keys().collect::<Vec<_>>()
            ),
        }
    }
    log::info!(
        "fetched {} cities with population above {min_population}",
        cities.len()
    );
    Ok(cities)
}

/// Property ids among the claims of `entity_id`.
///
/// A redirected entity (the response holds a single, differently named
/// entity) is accepted.
///
/// # Errors
/// Returns [`WikidataError`] when the request fails, the body is malformed
/// or the entity is missing from the response.
pub async fn fetch_claim_ids<S: WikidataSource + ?Sized>(
    source: &S,
    entity_id: &str,
) -> Result<BTreeSet<String>, WikidataError> {
    let body = source.entity_data(entity_id).await?;
    let mut response: EntityDataResponse =
        parse(body, format!("entity data for {entity_id}"))?;
    let record = match response.entities.remove(entity_id) {
        Some(record) => record,
        None if response.entities.len() == 1 => {
            let (resolved, record) = response
                .entities
                .pop_first()
                .ok_or_else(|| WikidataError::MissingEntity {
                    entity_id: entity_id.to_owned(),
                })?;
            log::debug!("{entity_id} redirects to {resolved}");
            record
        }
        None => {
            return Err(WikidataError::MissingEntity {
                entity_id: entity_id.to_owned(),
            });
        }
    };
    Ok(record.claims.into_keys().collect())
}

/// English and Dutch labels for `ids`, requested in batches of
/// [`LABEL_BATCH_SIZE`].
///
/// Ids the API does not return are absent from the result; missing
/// languages are `None`.
///
/// # Errors
/// Returns [`WikidataError`] when a batch request fails or is malformed.
pub async fn fetch_labels<S: WikidataSource + ?Sized>(
    source: &S,
    ids: &[String],
) -> Result<BTreeMap<String, PropertyLabels>, WikidataError> {
    let mut labels = BTreeMap::new();
    for batch in ids.chunks(LABEL_BATCH_SIZE) {
        let body = source.labels(batch).await?;
        let response: LabelsResponse = parse(body, "wbgetentities labels")?;
        for (id, mut entity) in response.entities {
            let entry = PropertyLabels {
                en: entity.labels.remove("en").map(|term| term.value),
                nl: entity.labels.remove("nl").map(|term| term.value),
            };
            labels.insert(id, entry);
        }
        log::debug!("resolved labels for a batch of {} ids", batch.len());
    }
    Ok(labels)
}

/// Aggregate property frequencies over `cities` and resolve their labels.
///
/// # Errors
/// Returns [`WikidataError`] when any entity or label request fails.
pub async fn collect_properties<S: WikidataSource + ?Sized>(
    source: &S,
    cities: &[City],
) -> Result<PropertyTable, WikidataError> {
    let mut accumulator = PropertyAccumulator::default();
    for city in cities {
        let claims = fetch_claim_ids(source, city.entity_id()).await?;
        log::debug!("{} has {} claimed properties", city.name, claims.len());
        accumulator.record_city(claims);
    }
    let mut table = accumulator.finish();
    let ids: Vec<String> = table.ids().map(str::to_owned).collect();
    let labels = fetch_labels(source, &ids).await?;
    table.apply_labels(&labels);
    log::info!(
        "collected {} properties over {} cities",
        table.len(),
        table.total_cities()
    );
    Ok(table)
}

/// Record each city's properties, labelled from an existing `table`.
///
/// No label requests are made; properties unknown to `table` are kept
/// without labels.
///
/// # Errors
/// Returns [`WikidataError`] when an entity request fails.
pub async fn collect_city_properties<S: WikidataSource + ?Sized>(
    source: &S,
    cities: &[City],
    table: &PropertyTable,
) -> Result<CityProperties, WikidataError> {
    let mut per_city: CityProperties = BTreeMap::new();
    for city in cities {
        let claims = fetch_claim_ids(source, city.entity_id()).await?;
        let properties: BTreeMap<String, CityProperty> = table.city_properties(claims);
        per_city.insert(city.name.clone(), properties);
    }
    log::info!("recorded properties for {} cities", per_city.len());
    Ok(per_city)
}
