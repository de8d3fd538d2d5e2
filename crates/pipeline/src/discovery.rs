// Dataset discovery
//
// Listing pages put one download per table row: a link to the file and, in
// the first cell, its publication date written out in Dutch
// ("1 oktober 2012").

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

const MONTHS: [&str; 12] = [
    "januari",
    "februari",
    "maart",
    "april",
    "mei",
    "juni",
    "juli",
    "augustus",
    "september",
    "oktober",
    "november",
    "december",
];

/// Download locators for files with `extension`, mapped to their reference
/// date. A locator listed twice keeps the date of its last row.
pub fn find_available_datasets(
    html: &str,
    extension: &str,
    host_root: &str,
) -> BTreeMap<String, NaiveDate> {
    let mut found = BTreeMap::new();

    let pattern = format!(
        r"(?i)^(.*\.{})(?:[?#].*)?$",
        regex::escape(extension.trim_start_matches('.'))
    );
    let Ok(href_pattern) = Regex::new(&pattern) else {
        return found;
    };
    let (Ok(rows), Ok(links), Ok(cells), Ok(spans)) = (
        Selector::parse("tr"),
        Selector::parse("a[href]"),
        Selector::parse("td"),
        Selector::parse("span"),
    ) else {
        return found;
    };
    let root = Url::parse(host_root).ok();

    let document = Html::parse_document(html);
    for row in document.select(&rows) {
        let Some(href) = row
            .select(&links)
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| href_pattern.captures(href))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            continue;
        };

        let label = row
            .select(&cells)
            .next()
            .and_then(|cell| cell.select(&spans).next())
            .map(|span| element_text(&span));
        let Some(date) = label.as_deref().and_then(parse_dutch_date) else {
            log::warn!("no reference date next to '{}', skipping", href);
            continue;
        };

        let locator = resolve_locator(&href, root.as_ref(), host_root);
        found.insert(locator, date);
    }

    log::debug!("discovered {} '{}' file(s)", found.len(), extension);
    found
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn resolve_locator(href: &str, root: Option<&Url>, host_root: &str) -> String {
    if let Ok(absolute) = Url::parse(href) {
        return absolute.to_string();
    }
    match root.and_then(|root| root.join(href).ok()) {
        Some(joined) => joined.to_string(),
        None => format!("{}{}", host_root, href),
    }
}

/// `"1 oktober 2012"`; month names are matched case-insensitively.
pub fn parse_dutch_date(label: &str) -> Option<NaiveDate> {
    let mut parts = label.split_whitespace();
    let day: u32 = parts.next()?.trim_end_matches('.').parse().ok()?;
    let month_name = parts.next()?.to_lowercase();
    let year: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let month = MONTHS.iter().position(|m| *m == month_name)? as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Reference date of a locally stored table named `<YYYY-MM-DD>.<ext>`.
pub fn reference_date_from_file_name(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
<html><body><table>
  <tr><th>Peildatum</th><th>Bestand</th></tr>
  <tr>
    <td><span>1 oktober 2012</span></td>
    <td><a href="/bestanden/vo/adressen/02.-alle-vestigingen.csv">csv</a></td>
  </tr>
  <tr>
    <td><span>1 Oktober 2011</span></td>
    <td><a href="/bestanden/vo/adressen/02.-alle-vestigingen-2011.xls">xls</a>
        <a href="/bestanden/vo/adressen/2011.csv?x=1">csv</a></td>
  </tr>
  <tr>
    <td><span>ergens in 2010</span></td>
    <td><a href="/bestanden/2010.csv">csv</a></td>
  </tr>
  <tr>
    <td><span>3 mei 2009</span></td>
    <td><a href="https://cdn.duo.nl/2009.csv">csv</a></td>
  </tr>
</table></body></html>
"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn finds_links_with_dates() {
        let found = find_available_datasets(LISTING, "csv", "http://duo.nl");
        assert_eq!(found.len(), 3);
        assert_eq!(
            found["http://duo.nl/bestanden/vo/adressen/02.-alle-vestigingen.csv"],
            date(2012, 10, 1)
        );
        // Query string is cut after the extension
        assert_eq!(
            found["http://duo.nl/bestanden/vo/adressen/2011.csv"],
            date(2011, 10, 1)
        );
        assert_eq!(found["https://cdn.duo.nl/2009.csv"], date(2009, 5, 3));
    }

    #[test]
    fn other_extension() {
        let found = find_available_datasets(LISTING, "xls", "http://duo.nl");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn extension_must_end_the_path() {
        let html = r#"<table><tr><td><span>1 mei 2009</span></td>
          <td><a href="/a.xlsx">a</a></td></tr></table>"#;
        assert!(find_available_datasets(html, "xls", "http://duo.nl").is_empty());
    }

    #[test]
    fn no_match_is_empty() {
        assert!(find_available_datasets(LISTING, "zip", "http://duo.nl").is_empty());
        assert!(find_available_datasets("", "csv", "http://duo.nl").is_empty());
    }

    #[test]
    fn duplicate_locator_keeps_last_row() {
        let html = r#"<table>
          <tr><td><span>1 januari 2010</span></td><td><a href="/a.csv">a</a></td></tr>
          <tr><td><span>1 februari 2011</span></td><td><a href="/a.csv">a</a></td></tr>
        </table>"#;
        let found = find_available_datasets(html, "csv", "http://duo.nl");
        assert_eq!(found.len(), 1);
        assert_eq!(found["http://duo.nl/a.csv"], date(2011, 2, 1));
    }

    #[test]
    fn dutch_dates() {
        assert_eq!(parse_dutch_date("1 oktober 2012"), Some(date(2012, 10, 1)));
        assert_eq!(parse_dutch_date(" 28 Februari 2011 "), Some(date(2011, 2, 28)));
        assert_eq!(parse_dutch_date("31 februari 2011"), None);
        assert_eq!(parse_dutch_date("1 october 2012"), None);
        assert_eq!(parse_dutch_date("oktober 2012"), None);
    }

    #[test]
    fn file_name_dates() {
        assert_eq!(
            reference_date_from_file_name(Path::new("/data/po_schools/2012-10-01.csv")),
            Some(date(2012, 10, 1))
        );
        assert_eq!(reference_date_from_file_name(Path::new("schools.csv")), None);
    }
}
