//! Behavioural tests for the precision-driven threshold search.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use wikialign_core::{
    ComparisonMode, SearchOutcome, SimilarityMapping, ThresholdError, ThresholdResult,
    ThresholdSearch, find_threshold,
};

type ResultCell = RefCell<Option<Result<ThresholdResult, ThresholdError>>>;

#[fixture]
fn mapping() -> RefCell<SimilarityMapping> {
    RefCell::new(SimilarityMapping::new(ComparisonMode::Euclidean))
}

#[fixture]
fn result() -> ResultCell {
    RefCell::new(None)
}

#[given("a mapping with matches at distance 0 and non-matches at 0.25 and 0.35")]
fn separable_mapping(#[from(mapping)] mapping: &RefCell<SimilarityMapping>) {
    let mut mapping = mapping.borrow_mut();
    mapping.insert("P1", "P1", 0.0);
    mapping.insert("P2", "P2", 0.0);
    mapping.insert("P1", "P2", 0.25);
    mapping.insert("P2", "P1", 0.35);
}

#[given("a mapping with a match at distance 0.01 and a non-match at 5")]
fn sparse_mapping(#[from(mapping)] mapping: &RefCell<SimilarityMapping>) {
    let mut mapping = mapping.borrow_mut();
    mapping.insert("P1", "P1", 0.01);
    mapping.insert("P1", "P2", 5.0);
}

#[given("a mapping with matches only")]
fn matches_only(#[from(mapping)] mapping: &RefCell<SimilarityMapping>) {
    let mut mapping = mapping.borrow_mut();
    mapping.insert("P1", "P1", 0.0);
    mapping.insert("P2", "P2", 0.1);
}

fn search(mapping: &RefCell<SimilarityMapping>, result: &ResultCell, target: f64, increment: f32) {
    let search = ThresholdSearch::new(target).with_increment(increment);
    *result.borrow_mut() = Some(find_threshold(&mapping.borrow(), &search));
}

#[when("I search for a threshold with target 0.7 and increment 0.1")]
fn search_coarse(
    #[from(mapping)] mapping: &RefCell<SimilarityMapping>,
    #[from(result)] result: &ResultCell,
) {
    search(mapping, result, 0.7, 0.1);
}

#[when("I search for a threshold with target 0.8 and increment 0.005")]
fn search_default(
    #[from(mapping)] mapping: &RefCell<SimilarityMapping>,
    #[from(result)] result: &ResultCell,
) {
    search(mapping, result, 0.8, 0.005);
}

#[when("I search for a threshold with target 0.5 and increment 0.05")]
fn search_loose(
    #[from(mapping)] mapping: &RefCell<SimilarityMapping>,
    #[from(result)] result: &ResultCell,
) {
    search(mapping, result, 0.5, 0.05);
}

fn outcome(result: &ResultCell) -> ThresholdResult {
    match result.borrow().as_ref() {
        Some(Ok(found)) => found.clone(),
        other => panic!("expected a successful search, got {other:?}"),
    }
}

#[then("the threshold is 0.2")]
fn threshold_point_two(#[from(result)] result: &ResultCell) {
    let found = outcome(result);
    assert!((found.threshold - 0.2).abs() < 1e-6, "got {}", found.threshold);
}

#[then("the threshold is 0")]
fn threshold_zero(#[from(result)] result: &ResultCell) {
    assert_eq!(outcome(result).threshold, 0.0);
}

#[then("the search stopped because precision dropped")]
fn precision_dropped(#[from(result)] result: &ResultCell) {
    assert_eq!(outcome(result).outcome, SearchOutcome::PrecisionReached);
}

#[then("the search saturated above every distance")]
fn saturated(#[from(result)] result: &ResultCell) {
    let found = outcome(result);
    assert_eq!(found.outcome, SearchOutcome::Saturated);
    assert!(found.threshold > 0.1);
}

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/threshold_search.feature", name = $title)]
        fn $fn_name(mapping: RefCell<SimilarityMapping>, result: ResultCell) {
            let _ = (mapping, result);
        }
    };
}

register_scenario!(stopping_on_false_positive, "stopping when a false positive enters");
register_scenario!(stopping_at_baseline, "stopping at the baseline when nothing is predicted");
register_scenario!(saturating, "saturating when precision never drops");
