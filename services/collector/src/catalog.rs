use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use scraper::{Html, Selector};

/// Anchors the CKAN catalog renders for downloadable dataset resources.
pub const DEFAULT_RESOURCE_SELECTOR: &str = "a.resource-url-analytics";

/// Return the `href` of every anchor matching `css_selector`, in document order.
pub fn find_links(html: &str, css_selector: &str) -> Result<Vec<String>> {
    let selector = Selector::parse(css_selector)
        .map_err(|e| anyhow!("Invalid CSS selector '{}': {}", css_selector, e))?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect())
}

/// Find the CSV resources on a catalog page.
///
/// Relative links are resolved against `page_url`. Only links whose path ends
/// in `.csv` are kept, first occurrence wins, and page order is preserved
/// (catalogs list the most recent resource first).
pub fn discover_csv_links(html: &str, css_selector: &str, page_url: &str) -> Result<Vec<String>> {
    let base = Url::parse(page_url).with_context(|| format!("Invalid catalog URL '{}'", page_url))?;

    let mut links: Vec<String> = Vec::new();
    for href in find_links(html, css_selector)? {
        let Ok(url) = base.join(&href) else {
            continue;
        };
        if !url.path().to_ascii_lowercase().ends_with(".csv") {
            continue;
        }
        let url = url.to_string();
        if !links.contains(&url) {
            links.push(url);
        }
    }

    Ok(links)
}
