// Per-platform ingestion.
//
// Items are processed one at a time in stream order. A malformed item is
// logged and skipped. A collector or storage error stops this platform's
// pass and is returned to the scheduler; everything counted up to that
// point stays in the caller's report.
//
// Side effects only follow a successful insert: a duplicate or a failed
// insert is never notified, drafted or applied.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{normalize, PipelineMode};
use crate::collectors::Collector;
use crate::db::models::{Lead, NewLead};
use crate::db::LeadStore;
use crate::draft;
use crate::error::{PipelineError, StorageError};
use crate::notify::{NotificationQueue, QueueStats};

/// Counts for one platform's pass (or a whole cycle, once merged).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Items the collector yielded.
    pub seen: usize,
    pub new_leads: usize,
    pub duplicates: usize,
    pub malformed: usize,
    pub drafted: usize,
    pub applied: usize,
}

impl IngestReport {
    pub fn merge(&mut self, other: &IngestReport) {
        self.seen += other.seen;
        self.new_leads += other.new_leads;
        self.duplicates += other.duplicates;
        self.malformed += other.malformed;
        self.drafted += other.drafted;
        self.applied += other.applied;
    }
}

pub struct IngestionPipeline {
    store: Arc<dyn LeadStore>,
    notifications: NotificationQueue,
    mode: PipelineMode,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn LeadStore>,
        notifications: NotificationQueue,
        mode: PipelineMode,
    ) -> Self {
        Self {
            store,
            notifications,
            mode,
        }
    }

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    pub fn store(&self) -> &Arc<dyn LeadStore> {
        &self.store
    }

    pub fn notification_stats(&self) -> QueueStats {
        self.notifications.stats()
    }

    /// Run one collector to completion and report what happened.
    pub async fn ingest_platform(
        &self,
        collector: &dyn Collector,
        keywords: &[String],
    ) -> Result<IngestReport, PipelineError> {
        let mut report = IngestReport::default();
        self.ingest(collector, keywords, &mut report).await?;
        Ok(report)
    }

    /// Like `ingest_platform`, but counts into `report` so partial progress
    /// survives a platform failure.
    pub async fn ingest(
        &self,
        collector: &dyn Collector,
        keywords: &[String],
        report: &mut IngestReport,
    ) -> Result<(), PipelineError> {
        let platform = collector.platform();
        let mut items = collector.collect(keywords);

        while let Some(item) = items.next().await {
            let item = item?;
            report.seen += 1;

            let candidate = match normalize(platform, item) {
                Ok(candidate) => candidate,
                Err(e) => {
                    report.malformed += 1;
                    warn!(%platform, error = %e, "Skipping malformed item");
                    continue;
                }
            };

            if !self.store.insert_if_absent(&candidate).await? {
                report.duplicates += 1;
                debug!(%platform, external_id = %candidate.external_id, "Already processed");
                continue;
            }

            report.new_leads += 1;
            let lead = self.load_accepted(&candidate).await;
            info!(
                %platform,
                external_id = %lead.external_id,
                title = %lead.title,
                "New lead"
            );
            self.act_on(lead, report).await?;
        }

        Ok(())
    }

    /// The stored row for a lead that was just inserted. The insert already
    /// committed, so a failed read-back falls back to the candidate rather
    /// than losing the alert.
    async fn load_accepted(&self, candidate: &NewLead) -> Lead {
        match self
            .store
            .get_lead(&candidate.platform, &candidate.external_id)
            .await
        {
            Ok(Some(lead)) => lead,
            Ok(None) => {
                warn!(
                    platform = %candidate.platform,
                    external_id = %candidate.external_id,
                    "Lead missing right after insert, alerting from the collected item"
                );
                unsaved_lead(candidate)
            }
            Err(e) => {
                warn!(
                    platform = %candidate.platform,
                    external_id = %candidate.external_id,
                    error = %e,
                    "Failed to read back new lead, alerting from the collected item"
                );
                unsaved_lead(candidate)
            }
        }
    }

    /// Fan out an accepted lead: alert first, then the mode's follow-up.
    async fn act_on(&self, lead: Lead, report: &mut IngestReport) -> Result<(), StorageError> {
        let (platform, external_id) = (lead.platform.clone(), lead.external_id.clone());

        match self.mode {
            PipelineMode::NotifyOnly => {
                self.notifications.enqueue(lead);
            }
            PipelineMode::NotifyAndDraft => {
                let text = draft::render(&lead);
                self.notifications.enqueue(lead);
                info!(%platform, %external_id, draft = %text, "Draft generated");
                self.store.mark_drafted(&platform, &external_id).await?;
                report.drafted += 1;
            }
            PipelineMode::NotifyAndAutoApply => {
                let proposal = draft::render(&lead);
                self.notifications.enqueue(lead);
                info!(%platform, %external_id, proposal = %proposal, "Auto-applying");
                self.store.mark_applied(&platform, &external_id).await?;
                report.applied += 1;
            }
        }

        Ok(())
    }

    /// Stop accepting alerts and wait for queued ones to be delivered.
    pub async fn shutdown(self) -> QueueStats {
        self.notifications.shutdown().await
    }
}

/// A lead built from its insert candidate. The row id is unknown, so it is 0.
fn unsaved_lead(candidate: &NewLead) -> Lead {
    Lead {
        id: 0,
        platform: candidate.platform.clone(),
        external_id: candidate.external_id.clone(),
        title: candidate.title.clone(),
        content: candidate.content.clone(),
        link: candidate.link.clone(),
        draft_generated: false,
        applied: false,
        created_at: Utc::now(),
    }
}
