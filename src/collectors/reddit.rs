// Reddit post search.
//
// Reddit has shipped several result layouts; we accept all three we've seen:
// `<shreddit-post permalink=.. post-title=..>` elements, `post-title` test-id
// anchors, and the older `data-click-id="body"` anchors. The external id is
// the base-36 post id after `/comments/` in the permalink.

use std::sync::LazyLock;

use regex_lite::Regex;
use scraper::Html;

use super::search::{
    collapse_whitespace, css, element_text, encode_query, non_empty, resolve_link, SearchSite,
};
use super::{Platform, RawItem};

const BASE_URL: &str = "https://www.reddit.com/";

static POST_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/comments/([A-Za-z0-9]+)").expect("valid post id pattern"));

pub struct RedditSearch;

impl SearchSite for RedditSearch {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    fn landing_url(&self) -> &'static str {
        BASE_URL
    }

    fn search_url(&self, keyword: &str) -> String {
        format!(
            "https://www.reddit.com/search/?q={}&type=link&sort=new",
            encode_query(keyword)
        )
    }

    fn parse(&self, html: &str, keyword: &str) -> Vec<RawItem> {
        let document = Html::parse_document(html);
        let results = css(r#"shreddit-post, a[data-testid="post-title"], a[data-click-id="body"]"#);

        let mut seen = std::collections::HashSet::new();
        let mut items = Vec::new();

        for element in document.select(&results) {
            let attrs = element.value();
            let (href, text) = if attrs.name() == "shreddit-post" {
                (
                    attrs.attr("permalink"),
                    attrs
                        .attr("post-title")
                        .map(collapse_whitespace)
                        .unwrap_or_else(|| element_text(&element)),
                )
            } else {
                (attrs.attr("href"), element_text(&element))
            };

            let link = href.and_then(|h| resolve_link(BASE_URL, h));
            // The same post can show up as both a card and a title anchor
            if let Some(ref l) = link {
                if !seen.insert(l.clone()) {
                    continue;
                }
            }

            items.push(RawItem {
                external_id: link.as_deref().and_then(post_id),
                title: Some(keyword.to_string()),
                content: non_empty(text),
                link,
            });
        }

        items
    }
}

fn post_id(link: &str) -> Option<String> {
    POST_ID.captures(link).map(|c| c[1].to_string())
}
