// Platform collectors — one per external site, behind a common trait.
//
// A collector turns a keyword list into a lazy stream of raw items. How the
// page is retrieved (plain HTTP or a headless browser) lives in `fetch`;
// how results are pulled out of the page lives in each platform module.
// The pipeline only ever sees `RawItem`s or a `CollectorError`.

pub mod fetch;
pub mod linkedin;
pub mod reddit;
pub mod search;
pub mod twitter;
pub mod upwork;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::CollectorError;
use fetch::PageFetcher;
use search::KeywordSearchCollector;

/// The platforms we know how to search, in the order a cycle visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Twitter,
    LinkedIn,
    Reddit,
    Upwork,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Twitter,
        Platform::LinkedIn,
        Platform::Reddit,
        Platform::Upwork,
    ];

    /// The name stored in the `platform` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "Twitter",
            Platform::LinkedIn => "LinkedIn",
            Platform::Reddit => "Reddit",
            Platform::Upwork => "Upwork",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitter" | "x" => Ok(Platform::Twitter),
            "linkedin" => Ok(Platform::LinkedIn),
            "reddit" => Ok(Platform::Reddit),
            "upwork" => Ok(Platform::Upwork),
            other => Err(format!(
                "unknown platform '{other}' (expected twitter, linkedin, reddit or upwork)"
            )),
        }
    }
}

/// One candidate item as extracted from a results page.
///
/// Every field is optional: collectors report what they found and the
/// pipeline decides whether the item is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub link: Option<String>,
}

/// Items for one cycle. An `Err` ends the platform's pass.
pub type ItemStream<'a> = BoxStream<'a, Result<RawItem, CollectorError>>;

/// A source of raw items for one platform.
pub trait Collector: Send + Sync {
    fn platform(&self) -> Platform;

    /// Search for each keyword and stream back whatever was found.
    ///
    /// Implementations skip individual failures (one bad keyword page, one
    /// unparseable result) and only yield an error when the platform as a
    /// whole can't be used this cycle.
    fn collect<'a>(&'a self, keywords: &'a [String]) -> ItemStream<'a>;
}

/// Build the enabled collectors in cycle order, all sharing one page fetcher.
pub fn build_collectors(
    enabled: &[Platform],
    fetcher: Arc<dyn PageFetcher>,
    max_results_per_query: usize,
) -> Vec<Box<dyn Collector>> {
    Platform::ALL
        .iter()
        .filter(|p| enabled.contains(p))
        .map(|platform| -> Box<dyn Collector> {
            match platform {
                Platform::Twitter => Box::new(KeywordSearchCollector::new(
                    twitter::TwitterSearch,
                    fetcher.clone(),
                    max_results_per_query,
                )),
                Platform::LinkedIn => Box::new(KeywordSearchCollector::new(
                    linkedin::LinkedInSearch,
                    fetcher.clone(),
                    max_results_per_query,
                )),
                Platform::Reddit => Box::new(KeywordSearchCollector::new(
                    reddit::RedditSearch,
                    fetcher.clone(),
                    max_results_per_query,
                )),
                Platform::Upwork => Box::new(upwork::UpworkCollector::new(
                    fetcher.clone(),
                    max_results_per_query,
                )),
            }
        })
        .collect()
}
