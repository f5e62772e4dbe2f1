// Lead ingestion: raw collector items in, deduplicated leads out.
//
// `ingest` drives one collector's stream through normalise -> insert-if-absent
// -> notify/draft/apply. `scheduler` runs every enabled collector in turn,
// isolating platform failures, then sleeps until the next cycle.

pub mod ingest;
pub mod scheduler;

use std::fmt;

use clap::ValueEnum;
use serde::Serialize;
use url::Url;

use crate::collectors::search::collapse_whitespace;
use crate::collectors::{Platform, RawItem};
use crate::db::models::NewLead;
use crate::error::MalformedItemError;

pub use ingest::{IngestReport, IngestionPipeline};
pub use scheduler::{arm_shutdown, CycleReport, PlatformOutcome, Scheduler, SchedulerState};

/// What happens to a lead after it is accepted as new.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
pub enum PipelineMode {
    /// Alert only.
    NotifyOnly,
    /// Alert and render an outreach draft.
    NotifyAndDraft,
    /// Alert and record an automatic application.
    NotifyAndAutoApply,
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineMode::NotifyOnly => "notify-only",
            PipelineMode::NotifyAndDraft => "notify-and-draft",
            PipelineMode::NotifyAndAutoApply => "notify-and-auto-apply",
        };
        f.write_str(name)
    }
}

/// Turn a collector's raw item into an insert candidate.
///
/// Text fields are whitespace-collapsed. `external_id`, `title` and `link`
/// are required and the link must be an absolute http(s) URL; missing
/// content is stored as an empty string.
pub fn normalize(platform: Platform, item: RawItem) -> Result<NewLead, MalformedItemError> {
    let required = |value: Option<String>, field: &'static str| {
        value
            .map(|v| collapse_whitespace(&v))
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MalformedItemError::MissingField {
                platform: platform.to_string(),
                field,
            })
    };

    let external_id = required(item.external_id, "external_id")?;
    let title = required(item.title, "title")?;
    let link = required(item.link, "link")?;

    let absolute_http = Url::parse(&link)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false);
    if !absolute_http {
        return Err(MalformedItemError::InvalidLink {
            platform: platform.to_string(),
            link,
        });
    }

    Ok(NewLead {
        platform: platform.to_string(),
        external_id,
        title,
        content: item
            .content
            .map(|c| collapse_whitespace(&c))
            .unwrap_or_default(),
        link,
    })
}
