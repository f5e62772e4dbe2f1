// Page retrieval for the collectors.
//
// Most of the sites we search render their results with JavaScript, so the
// default production fetcher goes through a Browserless instance that hands
// back the fully rendered HTML. HttpFetcher is the plain fallback when no
// browser endpoint is configured.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::error::CollectorError;

const USER_AGENT: &str = "leadwatch/0.1 (lead-discovery)";

/// Anything that can turn a URL into page HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, CollectorError>;
}

/// Direct HTTP GET with reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CollectorError> {
        debug!(url, "GET page");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| network_error(url, e))
    }
}

/// Rendered page content via the Browserless `/content` endpoint.
pub struct BrowserlessFetcher {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    headless: bool,
}

impl BrowserlessFetcher {
    pub fn new(base_url: &str, token: Option<&str>, headless: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            // Rendering waits for the page's scripts, so allow more than a plain GET
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            headless,
        })
    }

    /// Query parameters for the /content call.
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(ref token) = self.token {
            query.push(("token", token.clone()));
        }
        if !self.headless {
            query.push(("launch", r#"{"headless":false}"#.to_string()));
        }
        query
    }
}

#[async_trait]
impl PageFetcher for BrowserlessFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CollectorError> {
        let endpoint = format!("{}/content", self.base_url);
        debug!(url, headless = self.headless, "Browserless render");

        let response = self
            .client
            .post(&endpoint)
            .query(&self.query())
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| network_error(url, e))
    }
}

fn network_error(url: &str, err: reqwest::Error) -> CollectorError {
    CollectorError::Network {
        url: url.to_string(),
        message: err.to_string(),
    }
}
