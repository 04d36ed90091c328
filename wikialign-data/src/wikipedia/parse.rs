//! Infobox extraction from rendered article HTML.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use unicode_normalization::UnicodeNormalization;
use wikialign_core::Infobox;

use super::WikipediaError;

const INFOBOX_SELECTOR: &str = "table.infobox";
const REFERENCE_PATTERN: &str = r"\[[0-9\w]+\]";

const REMOVABLE_CHARACTERS: [char; 15] = [
    '\u{feff}', '\u{a0}', '\u{200b}', '\u{200e}', '\u{200f}', '\u{202a}', '\u{202c}', '\u{2060}',
    '\u{25aa}', '\u{25ab}', '\u{25b2}', '\u{25b3}', '\u{25be}', '\u{25bf}', '\u{2022}',
];

fn selector(pattern: &str) -> Result<Selector, WikipediaError> {
    Selector::parse(pattern).map_err(|err| WikipediaError::Pattern {
        pattern: pattern.to_owned(),
        message: err.to_string(),
    })
}

/// Compiled selectors and patterns for reading infobox tables.
///
/// Build one parser and reuse it for every page.
///
/// # Examples
/// ```
/// use wikialign_data::wikipedia::InfoboxParser;
///
/// let parser = InfoboxParser::new()?;
/// let infobox = parser.parse(
///     r#"<table class="infobox"><tr><th>Mayor[1]</th><td>Femke Halsema</td></tr></table>"#,
/// );
/// assert_eq!(infobox["Mayor"], vec!["Femke Halsema".to_owned()]);
/// # Ok::<(), wikialign_data::wikipedia::WikipediaError>(())
/// ```
#[derive(Debug, Clone)]
pub struct InfoboxParser {
    table: Selector,
    row: Selector,
    header: Selector,
    data: Selector,
    reference: Regex,
}

impl InfoboxParser {
    /// Compile the selectors.
    ///
    /// # Errors
    /// Returns [`WikipediaError::Pattern`] if a built-in pattern is rejected.
    pub fn new() -> Result<Self, WikipediaError> {
        let reference = Regex::new(REFERENCE_PATTERN).map_err(|err| WikipediaError::Pattern {
            pattern: REFERENCE_PATTERN.to_owned(),
            message: err.to_string(),
        })?;
        Ok(Self {
            table: selector(INFOBOX_SELECTOR)?,
            row: selector("tr")?,
            header: selector("th")?,
            data: selector("td")?,
            reference,
        })
    }

    /// Read the first infobox table of `html`.
    ///
    /// Rows need both a header and a data cell. Each line of the data cell
    /// that survives cleaning becomes one value; rows whose key or values
    /// clean to nothing are skipped. A page without an infobox yields an
    /// empty map.
    #[must_use]
    pub fn parse(&self, html: &str) -> Infobox {
        let document = Html::parse_document(html);
        let mut infobox = Infobox::new();
        let Some(table) = document.select(&self.table).next() else {
            return infobox;
        };
        for row in table.select(&self.row) {
            let (Some(header), Some(data)) = (
                row.select(&self.header).next(),
                row.select(&self.data).next(),
            ) else {
                continue;
            };
            let key = self.clean_text(&element_text(header));
            let values: Vec<String> = element_text(data)
                .split('\n')
                .filter(|line| !line.is_empty())
                .map(|line| self.clean_text(line))
                .filter(|line| !line.is_empty())
                .collect();
            if key.is_empty() || values.is_empty() {
                continue;
            }
            infobox.insert(key, values);
        }
        infobox
    }

    /// Strip reference markers and decorative characters, apply NFKD and
    /// trim.
    ///
    /// ```
    /// use wikialign_data::wikipedia::InfoboxParser;
    ///
    /// let parser = InfoboxParser::new()?;
    /// assert_eq!(parser.clean_text("\u{2022} 219 km\u{b2}[a]\u{200b} "), "219 km2");
    /// # Ok::<(), wikialign_data::wikipedia::WikipediaError>(())
    /// ```
    #[must_use]
    pub fn clean_text(&self, raw: &str) -> String {
        let without_references = self.reference.replace_all(raw, "");
        let filtered: String = without_references
            .chars()
            .filter(|ch| !REMOVABLE_CHARACTERS.contains(ch))
            .collect();
        filtered.nfkd().collect::<String>().trim().to_owned()
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}
