//! Behavioural tests for infobox completion and its evaluation.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use wikialign_core::{
    AlignmentMap, AlignmentMethod, City, CompletedCity, CompletionMode, Infobox, InfoboxCity,
    Language, complete_infoboxes, evaluate,
};

fn rows(pairs: &[(&str, &str)]) -> Infobox {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), vec![(*value).to_owned()]))
        .collect()
}

fn leiden(en: &[(&str, &str)], nl: &[(&str, &str)]) -> InfoboxCity {
    InfoboxCity::new(City::new(
        "Leiden",
        "http://www.wikidata.org/entity/Q43631",
        "https://en.wikipedia.org/wiki/Leiden",
        "https://nl.wikipedia.org/wiki/Leiden",
    ))
    .with_infobox(Language::En, rows(en))
    .with_infobox(Language::Nl, rows(nl))
}

fn value_map() -> AlignmentMap {
    AlignmentMap::from([("Mayor".to_owned(), "Burgemeester".to_owned())])
}

fn embedding_map() -> AlignmentMap {
    AlignmentMap::from([("Area".to_owned(), "Oppervlakte".to_owned())])
}

#[fixture]
fn cities() -> RefCell<Vec<InfoboxCity>> {
    RefCell::new(Vec::new())
}

#[fixture]
fn completed() -> RefCell<Vec<CompletedCity>> {
    RefCell::new(Vec::new())
}

#[given("a city whose Dutch infobox lacks the mayor")]
fn missing_mayor(#[from(cities)] cities: &RefCell<Vec<InfoboxCity>>) {
    *cities.borrow_mut() = vec![leiden(&[("Mayor", "Peter")], &[("Provincie", "Zuid-Holland")])];
}

#[given("a city whose Dutch infobox already names a mayor")]
fn existing_mayor(#[from(cities)] cities: &RefCell<Vec<InfoboxCity>>) {
    *cities.borrow_mut() = vec![leiden(&[("Mayor", "Peter")], &[("Burgemeester", "Henri")])];
}

#[given("a city whose Dutch infobox lacks the area")]
fn missing_area(#[from(cities)] cities: &RefCell<Vec<InfoboxCity>>) {
    *cities.borrow_mut() = vec![leiden(&[("Area", "23 km2")], &[])];
}

fn complete(
    mode: CompletionMode,
    cities: &RefCell<Vec<InfoboxCity>>,
    completed: &RefCell<Vec<CompletedCity>>,
) {
    let input = cities.borrow().clone();
    let embeddings = embedding_map();
    *completed.borrow_mut() = complete_infoboxes(mode, input, &value_map(), Some(&embeddings));
}

#[when("I complete the infoboxes using value alignment only")]
fn complete_by_value(
    #[from(cities)] cities: &RefCell<Vec<InfoboxCity>>,
    #[from(completed)] completed: &RefCell<Vec<CompletedCity>>,
) {
    complete(CompletionMode::ValueAlignment, cities, completed);
}

#[when("I complete the infoboxes using all alignments")]
fn complete_all(
    #[from(cities)] cities: &RefCell<Vec<InfoboxCity>>,
    #[from(completed)] completed: &RefCell<Vec<CompletedCity>>,
) {
    complete(CompletionMode::All, cities, completed);
}

fn proposed(completed: &RefCell<Vec<CompletedCity>>, method: AlignmentMethod) -> Vec<String> {
    completed
        .borrow()
        .iter()
        .flat_map(|city| city.completions_by(method))
        .map(|alignment| alignment.target_key.clone())
        .collect()
}

#[then("the Dutch key \"Burgemeester\" is proposed by value alignment")]
fn burgemeester_proposed(#[from(completed)] completed: &RefCell<Vec<CompletedCity>>) {
    assert_eq!(
        proposed(completed, AlignmentMethod::Value),
        vec!["Burgemeester".to_owned()]
    );
}

#[then("no completions are proposed")]
fn nothing_proposed(#[from(completed)] completed: &RefCell<Vec<CompletedCity>>) {
    assert!(
        completed
            .borrow()
            .iter()
            .all(|city| city.completions.is_empty())
    );
}

#[then("the Dutch key \"Oppervlakte\" is proposed by embedding alignment")]
fn oppervlakte_proposed(#[from(completed)] completed: &RefCell<Vec<CompletedCity>>) {
    assert_eq!(
        proposed(completed, AlignmentMethod::Embedding),
        vec!["Oppervlakte".to_owned()]
    );
}

#[then("the evaluation counts one embedding completion")]
fn evaluation_counts(#[from(completed)] completed: &RefCell<Vec<CompletedCity>>) {
    let report = evaluate(&completed.borrow());
    assert_eq!(report.embedding.total, 1);
    assert_eq!(report.embedding.correct, 0);
    assert_eq!(report.value.total, 0);
}

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/infobox_completion.feature", name = $title)]
        fn $fn_name(cities: RefCell<Vec<InfoboxCity>>, completed: RefCell<Vec<CompletedCity>>) {
            let _ = (cities, completed);
        }
    };
}

register_scenario!(completing_by_value, "completing a missing row by value alignment");
register_scenario!(keeping_existing_rows, "keeping existing Dutch rows");
register_scenario!(falling_back_to_embeddings, "falling back to embedding alignment");
