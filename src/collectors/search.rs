// Per-keyword search strategy shared by Twitter/X, LinkedIn and Reddit.
//
// Each of those sites is driven the same way: load the landing page once to
// confirm the platform is up, then load one search results page per keyword
// and parse the result list. Only the URLs and the parsing differ, and those
// are supplied by a `SearchSite`.

use std::sync::Arc;

use scraper::{ElementRef, Selector};
use tracing::{debug, warn};
use url::Url;

use super::fetch::PageFetcher;
use super::{Collector, ItemStream, Platform, RawItem};
use crate::error::CollectorError;

/// URL construction and result parsing for one searchable site.
pub trait SearchSite: Send + Sync {
    fn platform(&self) -> Platform;

    /// Page loaded once per cycle before any searching.
    fn landing_url(&self) -> &'static str;

    /// Results page for a single keyword.
    fn search_url(&self, keyword: &str) -> String;

    /// Pull candidate items out of a results page.
    fn parse(&self, html: &str, keyword: &str) -> Vec<RawItem>;
}

/// Collector that runs one search per keyword against a `SearchSite`.
pub struct KeywordSearchCollector<S> {
    site: S,
    fetcher: Arc<dyn PageFetcher>,
    max_per_keyword: usize,
}

impl<S: SearchSite> KeywordSearchCollector<S> {
    pub fn new(site: S, fetcher: Arc<dyn PageFetcher>, max_per_keyword: usize) -> Self {
        Self {
            site,
            fetcher,
            max_per_keyword,
        }
    }
}

impl<S: SearchSite> Collector for KeywordSearchCollector<S> {
    fn platform(&self) -> Platform {
        self.site.platform()
    }

    fn collect<'a>(&'a self, keywords: &'a [String]) -> ItemStream<'a> {
        Box::pin(async_stream::stream! {
            let platform = self.site.platform();

            if let Err(e) = self.fetcher.fetch(self.site.landing_url()).await {
                yield Err(CollectorError::Unreachable {
                    platform: platform.to_string(),
                    reason: e.to_string(),
                });
                return;
            }

            let mut failed = 0usize;
            let mut last_error = String::new();

            for keyword in keywords {
                let url = self.site.search_url(keyword);
                let html = match self.fetcher.fetch(&url).await {
                    Ok(html) => html,
                    Err(e) => {
                        warn!(%platform, keyword = keyword.as_str(), error = %e, "Keyword search failed, skipping");
                        failed += 1;
                        last_error = e.to_string();
                        continue;
                    }
                };

                let items = self.site.parse(&html, keyword);
                debug!(%platform, keyword = keyword.as_str(), found = items.len(), "Parsed results page");

                for item in items.into_iter().take(self.max_per_keyword) {
                    yield Ok(item);
                }
            }

            if !keywords.is_empty() && failed == keywords.len() {
                yield Err(CollectorError::Unreachable {
                    platform: platform.to_string(),
                    reason: format!("all {failed} keyword searches failed, last: {last_error}"),
                });
            }
        })
    }
}

// --- Parsing helpers shared by the platform modules ---

/// Parse a CSS selector literal.
///
/// Only called with constants, and every one of them is exercised by the
/// platform parser tests.
pub(crate) fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid selector {selector:?}: {e}"))
}

/// Visible text of an element with whitespace runs collapsed.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve a possibly-relative href against the site's base URL.
pub(crate) fn resolve_link(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let base = Url::parse(base).ok()?;
    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Last non-empty path segment of a URL, ignoring query and fragment.
pub(crate) fn last_path_segment(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(String::from)
}

/// Form-encode a search term for a query string.
pub(crate) fn encode_query(term: &str) -> String {
    url::form_urlencoded::byte_serialize(term.as_bytes()).collect()
}

/// Non-empty string or None.
pub(crate) fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
