use std::env;
use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::collectors::Platform;
use crate::pipeline::PipelineMode;

pub const DEFAULT_KEYWORDS: [&str; 6] = [
    "looking for a developer",
    "hiring a python expert",
    "need automation help",
    "freelance programmer",
    "remote developer job",
    "AI developer wanted",
];

/// Central configuration loaded from environment variables.
///
/// Secrets (Discord token, Browserless token) only ever come from env vars.
/// The .env file is loaded automatically at startup via dotenvy.
#[derive(Clone)]
pub struct Config {
    pub db_path: String,
    /// Minutes to sleep between cycles.
    pub interval_minutes: u64,
    pub keywords: Vec<String>,
    /// Enabled collectors. Cycles always visit them in `Platform::ALL` order.
    pub platforms: Vec<Platform>,
    pub drafts: bool,
    pub auto_apply: bool,
    /// Passed to the rendering browser; ignored by the plain HTTP fetcher.
    pub headless: bool,
    pub max_results_per_query: usize,
    pub notify_queue: usize,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    pub discord_token: Option<String>,
    pub discord_channel_id: Option<String>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key -> value lookup. Unset and empty values
    /// fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let keywords = match get("LEADWATCH_KEYWORDS") {
            Some(raw) => split_list(&raw),
            None => DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        };
        if keywords.is_empty() {
            anyhow::bail!("LEADWATCH_KEYWORDS must contain at least one keyword");
        }

        let platforms = match get("LEADWATCH_PLATFORMS") {
            Some(raw) => parse_platforms(&raw)?,
            None => Platform::ALL.to_vec(),
        };

        let config = Self {
            db_path: get("LEADWATCH_DB_PATH").unwrap_or_else(|| "./leads.db".to_string()),
            interval_minutes: parse_positive(get("LEADWATCH_INTERVAL_MINUTES"), "LEADWATCH_INTERVAL_MINUTES", 60)?,
            keywords,
            platforms,
            drafts: parse_bool(get("LEADWATCH_DRAFTS"), "LEADWATCH_DRAFTS", true)?,
            auto_apply: parse_bool(get("LEADWATCH_AUTO_APPLY"), "LEADWATCH_AUTO_APPLY", false)?,
            headless: parse_bool(get("LEADWATCH_HEADLESS"), "LEADWATCH_HEADLESS", false)?,
            max_results_per_query: parse_positive(
                get("LEADWATCH_MAX_RESULTS_PER_QUERY"),
                "LEADWATCH_MAX_RESULTS_PER_QUERY",
                50,
            )?,
            notify_queue: parse_positive(get("LEADWATCH_NOTIFY_QUEUE"), "LEADWATCH_NOTIFY_QUEUE", 64)?,
            browserless_url: get("BROWSERLESS_URL"),
            browserless_token: get("BROWSERLESS_TOKEN"),
            discord_token: get("DISCORD_TOKEN"),
            discord_channel_id: get("DISCORD_CHANNEL_ID"),
        };

        if config.drafts && config.auto_apply {
            anyhow::bail!(
                "LEADWATCH_DRAFTS and LEADWATCH_AUTO_APPLY are both enabled.\n\
                 Pick one: set LEADWATCH_DRAFTS=false to auto-apply, or LEADWATCH_AUTO_APPLY=false to draft."
            );
        }

        Ok(config)
    }

    /// The pipeline mode implied by the draft / auto-apply flags.
    pub fn mode(&self) -> PipelineMode {
        if self.auto_apply {
            PipelineMode::NotifyAndAutoApply
        } else if self.drafts {
            PipelineMode::NotifyAndDraft
        } else {
            PipelineMode::NotifyOnly
        }
    }

    /// Discord credentials, when both halves are configured.
    pub fn discord(&self) -> Option<(&str, &str)> {
        match (&self.discord_token, &self.discord_channel_id) {
            (Some(token), Some(channel)) => Some((token.as_str(), channel.as_str())),
            _ => None,
        }
    }
}

/// Sleep between cycles. Saturates instead of overflowing on absurd values.
pub fn cycle_interval(minutes: u64) -> Duration {
    Duration::from_secs(minutes.max(1).saturating_mul(60))
}

// Tokens are redacted so a logged config never leaks credentials.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "****");
        f.debug_struct("Config")
            .field("db_path", &self.db_path)
            .field("interval_minutes", &self.interval_minutes)
            .field("keywords", &self.keywords)
            .field("platforms", &self.platforms)
            .field("drafts", &self.drafts)
            .field("auto_apply", &self.auto_apply)
            .field("headless", &self.headless)
            .field("max_results_per_query", &self.max_results_per_query)
            .field("notify_queue", &self.notify_queue)
            .field("browserless_url", &self.browserless_url)
            .field("browserless_token", &redact(&self.browserless_token))
            .field("discord_token", &redact(&self.discord_token))
            .field("discord_channel_id", &self.discord_channel_id)
            .finish()
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_platforms(raw: &str) -> Result<Vec<Platform>> {
    let mut enabled = Vec::new();
    for name in split_list(raw) {
        let platform: Platform = name
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("Invalid LEADWATCH_PLATFORMS")?;
        if !enabled.contains(&platform) {
            enabled.push(platform);
        }
    }
    if enabled.is_empty() {
        anyhow::bail!("LEADWATCH_PLATFORMS must name at least one platform");
    }
    Ok(enabled)
}

fn parse_bool(value: Option<String>, key: &str, default: bool) -> Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{key} must be true or false, got '{value}'"),
    }
}

fn parse_positive<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + From<u8>,
{
    let Some(value) = value else {
        return Ok(default);
    };
    match value.parse::<T>() {
        Ok(n) if n >= T::from(1) => Ok(n),
        _ => anyhow::bail!("{key} must be a positive whole number, got '{value}'"),
    }
}
