// Notifications for newly accepted leads.
//
// The Notifier trait is the delivery boundary: implementations report
// failure as a DeliveryError and never panic or propagate anything else.
// The pipeline doesn't call notifiers directly; it enqueues leads on a
// NotificationQueue and a background dispatcher does the delivery.

pub mod discord;
pub mod queue;

use async_trait::async_trait;
use tracing::info;

use crate::db::models::Lead;
use crate::error::DeliveryError;
use crate::output::truncate_chars;

pub use queue::{NotificationQueue, QueueStats};

/// Maximum characters of lead content included in an alert.
pub const CONTENT_PREVIEW_CHARS: usize = 300;

/// The fields an alert shows for a lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadSummary {
    pub platform: String,
    pub title: String,
    /// Content capped at CONTENT_PREVIEW_CHARS, with "..." when cut.
    pub description: String,
    pub link: String,
}

impl LeadSummary {
    pub fn from_lead(lead: &Lead) -> Self {
        Self {
            platform: lead.platform.clone(),
            title: lead.title.clone(),
            description: truncate_chars(&lead.content, CONTENT_PREVIEW_CHARS),
            link: lead.link.clone(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name for logs ("discord", "log").
    fn name(&self) -> &'static str;

    /// Deliver an alert for one newly accepted lead.
    async fn notify(&self, lead: &Lead) -> Result<(), DeliveryError>;
}

/// Writes alerts to the log. Used when no Discord channel is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, lead: &Lead) -> Result<(), DeliveryError> {
        let summary = LeadSummary::from_lead(lead);
        info!(
            platform = %summary.platform,
            title = %summary.title,
            link = %summary.link,
            description = %summary.description,
            "New lead"
        );
        Ok(())
    }
}
