// Cycle scheduler: visit every collector in order, then sleep.
//
// Collectors run strictly one after another. A platform that fails is
// recorded in the cycle report and the next platform starts anyway; the
// scheduler always reaches the sleep. The sleep is the only place the loop
// waits on the shutdown signal.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use super::ingest::{IngestReport, IngestionPipeline};
use crate::collectors::{Collector, Platform};
use crate::notify::QueueStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Sleeping,
}

/// How one platform's pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformOutcome {
    Completed {
        platform: Platform,
        report: IngestReport,
    },
    Failed {
        platform: Platform,
        reason: String,
        /// Whatever was processed before the failure.
        partial: IngestReport,
    },
}

impl PlatformOutcome {
    pub fn platform(&self) -> Platform {
        match self {
            PlatformOutcome::Completed { platform, .. } | PlatformOutcome::Failed { platform, .. } => {
                *platform
            }
        }
    }

    pub fn report(&self) -> &IngestReport {
        match self {
            PlatformOutcome::Completed { report, .. } => report,
            PlatformOutcome::Failed { partial, .. } => partial,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PlatformOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<PlatformOutcome>,
}

impl CycleReport {
    /// Counts summed across every platform, failed ones included.
    pub fn totals(&self) -> IngestReport {
        let mut totals = IngestReport::default();
        for outcome in &self.outcomes {
            totals.merge(outcome.report());
        }
        totals
    }

    pub fn failed_platforms(&self) -> Vec<Platform> {
        self.outcomes
            .iter()
            .filter(|o| o.is_failed())
            .map(PlatformOutcome::platform)
            .collect()
    }

    /// One-line summary, also stored as `last_cycle_summary`.
    pub fn summary(&self) -> String {
        let totals = self.totals();
        let mut line = format!(
            "{} new, {} duplicate, {} malformed across {} platform(s)",
            totals.new_leads,
            totals.duplicates,
            totals.malformed,
            self.outcomes.len()
        );
        let failed = self.failed_platforms();
        if !failed.is_empty() {
            let names: Vec<&str> = failed.iter().map(Platform::as_str).collect();
            line.push_str(&format!("; failed: {}", names.join(", ")));
        }
        line
    }
}

/// Start listening for `signal` now rather than on first poll.
///
/// Signal handlers such as `tokio::signal::ctrl_c` only install themselves
/// when polled, and `run_until` doesn't poll its shutdown future until the
/// first cycle ends. The returned future resolves once `signal` has fired.
pub fn arm_shutdown<F>(signal: F) -> impl Future<Output = ()> + Send + 'static
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::spawn(signal);
    async move {
        if let Err(e) = listener.await {
            warn!(error = %e, "Shutdown listener stopped, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

pub struct Scheduler {
    pipeline: IngestionPipeline,
    collectors: Vec<Box<dyn Collector>>,
    keywords: Vec<String>,
    interval: Duration,
    state: SchedulerState,
    show_progress: bool,
}

impl Scheduler {
    pub fn new(
        pipeline: IngestionPipeline,
        collectors: Vec<Box<dyn Collector>>,
        keywords: Vec<String>,
        interval: Duration,
    ) -> Self {
        Self {
            pipeline,
            collectors,
            keywords,
            interval,
            state: SchedulerState::Sleeping,
            show_progress: false,
        }
    }

    /// Draw a progress bar over the platforms while a cycle runs.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.pipeline
    }

    /// Visit every collector once. Never fails: platform errors end up in
    /// the report.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.state = SchedulerState::Running;
        let started_at = Utc::now();
        info!(
            platforms = self.collectors.len(),
            keywords = self.keywords.len(),
            mode = %self.pipeline.mode(),
            "Starting cycle"
        );

        let pb = if self.show_progress {
            let pb = ProgressBar::new(self.collectors.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  Platforms [{bar:30}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut outcomes = Vec::with_capacity(self.collectors.len());
        for collector in &self.collectors {
            let platform = collector.platform();
            pb.set_message(platform.as_str());

            let mut report = IngestReport::default();
            let outcome = match self
                .pipeline
                .ingest(collector.as_ref(), &self.keywords, &mut report)
                .await
            {
                Ok(()) => {
                    info!(
                        %platform,
                        seen = report.seen,
                        new = report.new_leads,
                        duplicates = report.duplicates,
                        malformed = report.malformed,
                        "Platform complete"
                    );
                    PlatformOutcome::Completed { platform, report }
                }
                Err(e) => {
                    error!(%platform, error = %e, new = report.new_leads, "Platform failed, moving on");
                    PlatformOutcome::Failed {
                        platform,
                        reason: e.to_string(),
                        partial: report,
                    }
                }
            };
            outcomes.push(outcome);
            pb.inc(1);
        }
        pb.finish_and_clear();

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        self.record(&report).await;

        self.state = SchedulerState::Sleeping;
        report
    }

    /// Store the cycle time and summary for `status`. Failure is only logged.
    async fn record(&self, report: &CycleReport) {
        let store = self.pipeline.store();
        let result = async {
            store
                .set_scan_state("last_cycle_at", &report.finished_at.to_rfc3339())
                .await?;
            store
                .set_scan_state("last_cycle_summary", &report.summary())
                .await
        }
        .await;

        if let Err(e) = result {
            warn!(error = %e, "Failed to record cycle state");
        }
    }

    /// Run cycles until `shutdown` resolves. The pending sleep is cancelled
    /// as soon as it does. Returns the number of completed cycles.
    pub async fn run_until<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0u64;

        loop {
            let report = self.run_cycle().await;
            cycles += 1;
            info!(cycle = cycles, summary = %report.summary(), "Cycle complete");

            info!(
                minutes = self.interval.as_secs() / 60,
                "Sleeping until next cycle"
            );
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler");
                    return cycles;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// Drain queued notifications and stop the dispatcher.
    pub async fn shutdown(self) -> QueueStats {
        self.pipeline.shutdown().await
    }
}
