// Upwork job search.
//
// Unlike the social sites, Upwork is searched once per cycle: all keywords
// go into a single OR query and the one results page is walked. Job cards
// have a real heading, so the title comes from the card rather than the
// keyword. Job ids are the `~0...` cipher in the job URL.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex_lite::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use super::fetch::PageFetcher;
use super::search::{
    css, element_text, encode_query, last_path_segment, non_empty, resolve_link,
};
use super::{Collector, ItemStream, Platform, RawItem};
use crate::error::CollectorError;

const BASE_URL: &str = "https://www.upwork.com/";

static JOB_CIPHER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(~[0-9A-Za-z]+)").expect("valid job cipher pattern"));

pub struct UpworkCollector {
    fetcher: Arc<dyn PageFetcher>,
    max_results: usize,
}

impl UpworkCollector {
    pub fn new(fetcher: Arc<dyn PageFetcher>, max_results: usize) -> Self {
        Self {
            fetcher,
            max_results,
        }
    }

    /// One query covering every keyword.
    pub fn search_url(keywords: &[String]) -> String {
        let query = keywords
            .iter()
            .map(|k| format!("\"{k}\""))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!(
            "https://www.upwork.com/nx/search/jobs/?q={}&sort=recency",
            encode_query(&query)
        )
    }
}

impl Collector for UpworkCollector {
    fn platform(&self) -> Platform {
        Platform::Upwork
    }

    fn collect<'a>(&'a self, keywords: &'a [String]) -> ItemStream<'a> {
        Box::pin(async_stream::stream! {
            if keywords.is_empty() {
                return;
            }

            let url = Self::search_url(keywords);
            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) => {
                    yield Err(CollectorError::Unreachable {
                        platform: Platform::Upwork.to_string(),
                        reason: e.to_string(),
                    });
                    return;
                }
            };

            let items = parse_jobs(&html);
            debug!(found = items.len(), "Parsed Upwork results page");

            for item in items.into_iter().take(self.max_results) {
                yield Ok(item);
            }
        })
    }
}

/// Pull job cards out of a search results page. Cards repeating an earlier
/// card's link are skipped.
pub fn parse_jobs(html: &str) -> Vec<RawItem> {
    let document = Html::parse_document(html);
    let cards = css(r#"section.air-card, article[data-test="JobTile"]"#);
    let headings = css("h2, h3, h4");
    let heading_link = css("h2 a[href], h3 a[href], h4 a[href]");
    let any_link = css("a[href]");
    let description = css(r#"div.job-description, [data-test="JobDescription"], [data-test="UpCLineClamp JobDescription"]"#);

    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for card in document.select(&cards) {
        let title = card
            .select(&headings)
            .next()
            .map(|h| element_text(&h))
            .and_then(non_empty);
        // The heading link is the job; other anchors (client profile, tags)
        // only count when the card has no heading link at all.
        let first_link = |selector: &Selector| {
            card.select(selector)
                .filter_map(|a| a.value().attr("href"))
                .find_map(|href| resolve_link(BASE_URL, href))
        };
        let link = first_link(&heading_link).or_else(|| first_link(&any_link));
        if let Some(l) = &link {
            if !seen.insert(l.clone()) {
                continue;
            }
        }
        let content = card
            .select(&description)
            .next()
            .map(|d| element_text(&d))
            .and_then(non_empty);

        items.push(RawItem {
            external_id: link.as_deref().and_then(job_id),
            title,
            content,
            link,
        });
    }

    items
}

fn job_id(link: &str) -> Option<String> {
    JOB_CIPHER
        .captures(link)
        .map(|c| c[1].to_string())
        .or_else(|| last_path_segment(link))
}
