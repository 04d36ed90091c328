use proptest::prelude::*;
use rstest::{fixture, rstest};
use wikialign_core::City;

use super::*;
use crate::http::TransportError;

const AMSTERDAM_EN: &str = r#"<html><body>
<table class="navbox"><tr><th>Ignored</th><td>navbox</td></tr></table>
<table class="infobox vcard">
  <tr><th colspan="2">Amsterdam</th></tr>
  <tr><th scope="row">Country</th><td>Netherlands</td></tr>
  <tr><th scope="row">Mayor<sup>[3]</sup></th><td>Femke Halsema
(GL)</td></tr>
  <tr><th scope="row">Area</th><td><ul><li>Capital city</li>
<li>219.32 km<sup>2</sup></li></ul></td></tr>
  <tr><td>Row without a header</td></tr>
</table>
<table class="infobox"><tr><th>Second</th><td>ignored</td></tr></table>
</body></html>"#;

#[fixture]
fn parser() -> InfoboxParser {
    InfoboxParser::new().expect("built-in patterns compile")
}

fn city(name: &str) -> City {
    City::new(
        name,
        format!("http://www.wikidata.org/entity/{name}"),
        format!("https://en.wikipedia.org/wiki/{name}"),
        format!("https://nl.wikipedia.org/wiki/{name}"),
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

#[rstest]
fn parses_first_infobox_rows(parser: InfoboxParser) {
    let infobox = parser.parse(AMSTERDAM_EN);

    assert_eq!(infobox.len(), 3);
    assert_eq!(infobox["Country"], vec!["Netherlands".to_owned()]);
    assert_eq!(
        infobox["Mayor"],
        vec!["Femke Halsema".to_owned(), "(GL)".to_owned()]
    );
    assert_eq!(
        infobox["Area"],
        vec!["Capital city".to_owned(), "219.32 km2".to_owned()]
    );
    assert!(!infobox.contains_key("Second"));
}

#[rstest]
fn page_without_infobox_is_empty(parser: InfoboxParser) {
    assert!(parser.parse("<p>Stub article</p>").is_empty());
}

#[rstest]
fn rows_with_blank_cells_are_skipped(parser: InfoboxParser) {
    let html = r#"<table class="infobox"><tr><th></th><td>x</td></tr><tr><th>Motto</th><td></td></tr></table>"#;
    assert!(parser.parse(html).is_empty());
}

#[rstest]
#[case("<tr><th>\u{2022}</th><td>12</td></tr>")]
#[case("<tr><th>\u{a0}[a]</th><td>12</td></tr>")]
#[case("<tr><th>Motto</th><td>\u{25aa}\u{200b}\n[1]</td></tr>")]
fn rows_cleaning_to_nothing_are_skipped(parser: InfoboxParser, #[case] row: &str) {
    let html =
        format!(r#"<table class="infobox">{row}<tr><th>Inwoners</th><td>5</td></tr></table>"#);
    let infobox = parser.parse(&html);
    assert_eq!(infobox.keys().collect::<Vec<_>>(), vec!["Inwoners"]);
}

#[rstest]
#[case("Population[12]", "Population")]
#[case("\u{feff}Rotterdam\u{a0}", "Rotterdam")]
#[case("\u{25b2} 4.1%", "4.1%")]
#[case("ﬁeld", "field")]
#[case("[note 3]", "[note 3]")]
fn cleans_text(parser: InfoboxParser, #[case] raw: &str, #[case] expected: &str) {
    assert_eq!(parser.clean_text(raw), expected);
}

#[rstest]
#[case(
    "https://en.wikipedia.org/wiki/The_Hague",
    "https://en.wikipedia.org/api/rest_v1/page/html/The_Hague"
)]
#[case(
    "https://nl.wikipedia.org/wiki/%27s-Hertogenbosch?oldid=1#Geschiedenis",
    "https://nl.wikipedia.org/api/rest_v1/page/html/%27s-Hertogenbosch"
)]
fn derives_rest_urls(#[case] article: &str, #[case] expected: &str) {
    assert_eq!(rest_html_url(article).expect("valid article url"), expected);
}

#[rstest]
#[case("not a url")]
#[case("https://en.wikipedia.org/w/index.php?title=Delft")]
#[case("https://en.wikipedia.org/wiki/")]
fn rejects_non_article_urls(#[case] article: &str) {
    assert!(matches!(
        rest_html_url(article),
        Err(WikipediaError::InvalidArticleUrl { .. })
    ));
}

#[rstest]
fn scrapes_both_languages(parser: InfoboxParser) {
    let source = StubPageSource::default()
        .with_page(
            "https://en.wikipedia.org/api/rest_v1/page/html/Amsterdam",
            AMSTERDAM_EN,
        )
        .with_page(
            "https://nl.wikipedia.org/api/rest_v1/page/html/Amsterdam",
            r#"<table class="infobox"><tr><th>Burgemeester</th><td>Femke Halsema</td></tr></table>"#,
        );

    let scraped = runtime()
        .block_on(scrape_infoboxes(&source, &parser, vec![city("Amsterdam"), city("Utrecht")]))
        .expect("scrape succeeds");

    assert_eq!(scraped.len(), 2);
    assert_eq!(scraped[0].infobox_en["Country"], vec!["Netherlands".to_owned()]);
    assert_eq!(
        scraped[0].infobox_nl["Burgemeester"],
        vec!["Femke Halsema".to_owned()]
    );
    assert!(scraped[1].infobox_en.is_empty());
    assert_eq!(source.requested().len(), 4);
}

#[rstest]
fn propagates_fetch_failures(parser: InfoboxParser) {
    let source = StubPageSource::default().failing_at(
        "https://nl.wikipedia.org/api/rest_v1/page/html/Delft",
        404,
    );

    let err = runtime()
        .block_on(scrape_infoboxes(&source, &parser, vec![city("Delft")]))
        .expect_err("dutch page fails");

    assert!(matches!(
        err,
        WikipediaError::Transport {
            source: TransportError::Http { status: 404, .. }
        }
    ));
}

const DECORATIVE: [char; 5] = ['\u{a0}', '\u{200b}', '\u{feff}', '\u{2022}', '\u{25aa}'];

proptest! {
    #[test]
    fn cleaned_text_is_trimmed_and_undecorated(
        raw in "[a-zA-Z0-9 .,\\[\\]\u{a0}\u{200b}\u{feff}\u{2022}\u{25aa}\u{b2}\u{bd}]{0,40}",
    ) {
        let parser = InfoboxParser::new().expect("built-in patterns compile");
        let cleaned = parser.clean_text(&raw);
        prop_assert_eq!(cleaned.trim(), cleaned.as_str());
        prop_assert!(!cleaned.chars().any(|ch| DECORATIVE.contains(&ch)));
    }

    #[test]
    fn cleaning_text_without_brackets_is_idempotent(
        raw in "[a-zA-Z0-9 .,\u{a0}\u{200b}\u{feff}\u{2022}\u{25aa}\u{b2}\u{bd}]{0,40}",
    ) {
        let parser = InfoboxParser::new().expect("built-in patterns compile");
        let once = parser.clean_text(&raw);
        prop_assert_eq!(parser.clean_text(&once), once);
    }
}
