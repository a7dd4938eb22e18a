//! Builds the ordered identifier list from the category listing pages.
//!
//! Each category is paginated until a page yields no further links.  The
//! listing endpoint answers XHR requests with an escaped HTML fragment, so
//! the body is unescaped before parsing.  The resulting list defines the
//! corpus ordering; it is written once and never re-sorted.

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::types::FatwaError;

/// Category slugs in the order the corpus is crawled.
pub const CATEGORIES: &[&str] = &[
    "quran-aur-hadees",
    "aqaid",
    "mamoolat-e-ahlesunnat",
    "taharat-ke-masail",
    "namaz",
    "mayyat",
    "roza",
    "zakat-aur-ushr",
    "hajj-aur-umrah",
    "qurbani-aur-aqeeqah",
    "mukhtasar-jawabat",
    "bachon-ke-naam",
    "mahnama-ahkam-e-tijarat",
    "masnoon-duayein",
    "zibah-aur-shikar",
    "qasam-aur-mannat",
    "nikah",
    "talaq",
    "razaat",
    "iddat",
    "khareed-o-farokht",
    "shirkat",
    "muzaribat",
    "ijarah",
    "qarz-hiba-rahan",
    "waqf",
    "wirasat-aur-tarka",
    "luqatah",
    "saza-o-qaza",
    "halal-haram",
    "sunnatain-aur-adab",
    "gunah",
    "huqooq-ul-ibad",
    "fazail-o-seerat",
    "auraton-ke-masail",
    "kafir-aur-murtad",
    "majlis-e-tehqiqat-e-shariah",
    "iqtisad",
    "sadqa",
    "mutafariqat",
];

/// Walks every category's listing pages and collects document URLs in
/// encounter order.
pub async fn discover_urls(
    client: &Client,
    base_url: &Url,
    categories: &[&str],
) -> Result<Vec<String>, FatwaError> {
    let mut all_urls = Vec::new();

    for category in categories {
        let mut page = 1u32;
        loop {
            let listing = format!("{base_url}/{category}?page={page}");
            debug!(%listing, "fetching listing page");

            let response = client
                .get(&listing)
                .header("X-Requested-With", "XMLHttpRequest")
                .send()
                .await?;
            if !response.status().is_success() {
                debug!(%listing, status = %response.status(), "listing page unavailable");
                break;
            }

            let body = unescape_fragment(&response.text().await?);
            let links = extract_category_links(&body, category)?;
            if links.is_empty() {
                info!(category, pages = page - 1, "category exhausted");
                break;
            }

            all_urls.extend(links);
            page += 1;
        }
    }

    info!(total = all_urls.len(), "identifier discovery complete");
    Ok(all_urls)
}

/// Collects hrefs pointing into one category's document pages.
fn extract_category_links(html: &str, category: &str) -> Result<Vec<String>, FatwaError> {
    let selector = Selector::parse(&format!("a[href*='/ur/fatawa/{category}/']"))
        .map_err(|err| FatwaError::Config(err.to_string()))?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect())
}

/// The listing endpoint returns JSON-escaped markup; undo the escaping
/// layers before handing it to the HTML parser.
fn unescape_fragment(body: &str) -> String {
    body.replace("\\\"", "\"")
        .replace("\\/", "/")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_links_for_matching_category_only() {
        let html = r#"
            <ul>
              <li><a href="/ur/fatawa/namaz/first">a</a></li>
              <li><a href="/ur/fatawa/namaz/second">b</a></li>
              <li><a href="/ur/fatawa/roza/other">c</a></li>
            </ul>
        "#;
        let links = extract_category_links(html, "namaz").unwrap();
        assert_eq!(
            links,
            vec!["/ur/fatawa/namaz/first", "/ur/fatawa/namaz/second"]
        );
    }

    #[test]
    fn unescapes_xhr_fragment() {
        let body = r#"<a href=\"\/ur\/fatawa\/namaz\/first\">&amp;</a>"#;
        let unescaped = unescape_fragment(body);
        assert!(unescaped.contains(r#"href="/ur/fatawa/namaz/first""#));
        assert!(unescaped.contains('&'));
    }
}
