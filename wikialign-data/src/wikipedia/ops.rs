use url::Url;
use wikialign_core::{City, Infobox, InfoboxCity, Language};

use super::{InfoboxParser, PageSource, WikipediaError};

/// Map an article URL to the REST endpoint serving its rendered HTML.
///
/// # Errors
/// Returns [`WikipediaError::InvalidArticleUrl`] unless the URL has a
/// `/wiki/{title}` path.
///
/// # Examples
/// ```
/// use wikialign_data::wikipedia::rest_html_url;
///
/// let url = rest_html_url("https://nl.wikipedia.org/wiki/Den_Haag")?;
/// assert_eq!(url, "https://nl.wikipedia.org/api/rest_v1/page/html/Den_Haag");
/// # Ok::<(), wikialign_data::wikipedia::WikipediaError>(())
/// ```
pub fn rest_html_url(article_url: &str) -> Result<String, WikipediaError> {
    let invalid = || WikipediaError::InvalidArticleUrl {
        url: article_url.to_owned(),
    };
    let mut url = Url::parse(article_url).map_err(|_| invalid())?;
    let title = url
        .path()
        .strip_prefix("/wiki/")
        .filter(|title| !title.is_empty())
        .ok_or_else(invalid)?
        .to_owned();
    url.set_path(&format!("/api/rest_v1/page/html/{title}"));
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.into())
}

async fn fetch_infobox<S: PageSource + ?Sized>(
    source: &S,
    parser: &InfoboxParser,
    city: &City,
    language: Language,
) -> Result<Infobox, WikipediaError> {
    let url = rest_html_url(city.article_url(language))?;
    let html = source.fetch_html(&url).await?;
    let infobox = parser.parse(&html);
    if infobox.is_empty() {
        log::warn!("no {language} infobox found for {}", city.name);
    }
    Ok(infobox)
}

/// Scrape the English and Dutch infoboxes of every city.
///
/// # Errors
/// Returns [`WikipediaError`] when an article URL is malformed or a page
/// cannot be fetched.
///
/// # Examples
/// ```
/// use wikialign_core::City;
/// use wikialign_data::wikipedia::{InfoboxParser, StubPageSource, scrape_infoboxes};
///
/// let source = StubPageSource::default().with_page(
///     "https://en.wikipedia.org/api/rest_v1/page/html/Delft",
///     r#"<table class="infobox"><tr><th>Province</th><td>South Holland</td></tr></table>"#,
/// );
/// let city = City::new(
///     "Delft",
///     "http://www.wikidata.org/entity/Q690",
///     "https://en.wikipedia.org/wiki/Delft",
///     "https://nl.wikipedia.org/wiki/Delft",
/// );
/// let runtime = tokio::runtime::Builder::new_current_thread().build()?;
/// let parser = InfoboxParser::new()?;
/// let scraped = runtime.block_on(scrape_infoboxes(&source, &parser, vec![city]))?;
/// assert_eq!(scraped[0].infobox_en["Province"], vec!["South Holland".to_owned()]);
/// assert!(scraped[0].infobox_nl.is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub async fn scrape_infoboxes<S: PageSource + ?Sized>(
    source: &S,
    parser: &InfoboxParser,
    cities: Vec<City>,
) -> Result<Vec<InfoboxCity>, WikipediaError> {
    let total = cities.len();
    let mut scraped = Vec::with_capacity(total);
    for (index, city) in cities.into_iter().enumerate() {
        let mut entry = InfoboxCity::new(city);
        for language in Language::ALL {
            let infobox = fetch_infobox(source, parser, &entry.city, language).await?;
            entry = entry.with_infobox(language, infobox);
        }
        log::debug!("scraped infoboxes for {} ({}/{total})", entry.city.name, index + 1);
        scraped.push(entry);
    }
    log::info!("scraped infoboxes for {total} cities");
    Ok(scraped)
}
