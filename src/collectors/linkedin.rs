// LinkedIn content search.
//
// Result cards carry a `data-urn` like `urn:li:activity:7180000000000000000`.
// When the URN is present it gives both the external id and a stable
// permalink; older markup (`div.update`) only has an anchor, in which case the
// last path segment of that anchor is the id.

use scraper::Html;

use super::search::{
    css, element_text, encode_query, last_path_segment, non_empty, resolve_link, SearchSite,
};
use super::{Platform, RawItem};

const BASE_URL: &str = "https://www.linkedin.com/";
const ACTIVITY_URN_PREFIX: &str = "urn:li:activity:";

pub struct LinkedInSearch;

impl SearchSite for LinkedInSearch {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn landing_url(&self) -> &'static str {
        "https://www.linkedin.com/feed/"
    }

    fn search_url(&self, keyword: &str) -> String {
        format!(
            "https://www.linkedin.com/search/results/content/?keywords={}&sortBy=%22date_posted%22",
            encode_query(keyword)
        )
    }

    fn parse(&self, html: &str, keyword: &str) -> Vec<RawItem> {
        let document = Html::parse_document(html);
        let cards = css("div.feed-shared-update-v2, div.update");
        let anchors = css("a[href]");
        let body = css(".update-components-text, .feed-shared-text");

        document
            .select(&cards)
            .map(|card| {
                let urn = card
                    .value()
                    .attr("data-urn")
                    .filter(|u| u.starts_with(ACTIVITY_URN_PREFIX));

                let (external_id, link) = match urn {
                    Some(urn) => (
                        Some(urn.trim_start_matches(ACTIVITY_URN_PREFIX).to_string()),
                        Some(format!("{BASE_URL}feed/update/{urn}/")),
                    ),
                    None => {
                        let link = card
                            .select(&anchors)
                            .filter_map(|a| a.value().attr("href"))
                            .find_map(|href| resolve_link(BASE_URL, href));
                        (link.as_deref().and_then(last_path_segment), link)
                    }
                };

                // Prefer the post body over the whole card (author line, buttons)
                let content = card
                    .select(&body)
                    .next()
                    .map(|el| element_text(&el))
                    .unwrap_or_else(|| element_text(&card));

                RawItem {
                    external_id,
                    title: Some(keyword.to_string()),
                    content: non_empty(content),
                    link,
                }
            })
            .collect()
    }
}
