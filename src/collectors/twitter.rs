// Twitter/X live search.
//
// Every result is an <article>. The post's permalink is the anchor whose
// path contains /status/<id>; the numeric id is the external id. Twitter
// posts have no heading, so the keyword that found them becomes the title.

use std::sync::LazyLock;

use regex_lite::Regex;
use scraper::Html;

use super::search::{css, element_text, encode_query, non_empty, resolve_link, SearchSite};
use super::{Platform, RawItem};

const BASE_URL: &str = "https://x.com/";

static STATUS_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/status/(\d+)").expect("valid status id pattern"));

pub struct TwitterSearch;

impl SearchSite for TwitterSearch {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn landing_url(&self) -> &'static str {
        "https://x.com/explore"
    }

    fn search_url(&self, keyword: &str) -> String {
        format!(
            "https://x.com/search?q={}&f=live&src=typed_query",
            encode_query(keyword)
        )
    }

    fn parse(&self, html: &str, keyword: &str) -> Vec<RawItem> {
        let document = Html::parse_document(html);
        let articles = css("article");
        let status_links = css(r#"a[href*="/status/"]"#);

        document
            .select(&articles)
            .map(|article| {
                let link = article
                    .select(&status_links)
                    .filter_map(|a| a.value().attr("href"))
                    .find_map(|href| resolve_link(BASE_URL, href));
                let external_id = link.as_deref().and_then(status_id);

                RawItem {
                    external_id,
                    title: Some(keyword.to_string()),
                    content: non_empty(element_text(&article)),
                    link,
                }
            })
            .collect()
    }
}

/// The numeric id following `/status/` in a post permalink.
fn status_id(link: &str) -> Option<String> {
    STATUS_ID.captures(link).map(|c| c[1].to_string())
}
