// Bounded notification queue with a single background dispatcher.
//
// Ingestion only ever calls `enqueue`, which never blocks: if the queue is
// full (or the dispatcher is gone) the alert is dropped and counted. The
// dispatcher delivers in FIFO order and logs delivery failures; the lead is
// already persisted by then, so nothing is retried. A notifier that panics
// costs that one alert, not the dispatcher.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::Notifier;
use crate::db::models::Lead;

/// Delivery counters since the queue was started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

pub struct NotificationQueue {
    sender: mpsc::Sender<Lead>,
    counters: Arc<Counters>,
    dispatcher: JoinHandle<()>,
}

impl NotificationQueue {
    /// Spawn the dispatcher task. Must be called inside a tokio runtime.
    pub fn start(notifier: Arc<dyn Notifier>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<Lead>(capacity.max(1));
        let counters = Arc::new(Counters::default());
        let task_counters = counters.clone();

        let dispatcher = tokio::spawn(async move {
            while let Some(lead) = receiver.recv().await {
                let delivery = AssertUnwindSafe(notifier.notify(&lead)).catch_unwind().await;
                match delivery {
                    Ok(Ok(())) => {
                        task_counters.delivered.fetch_add(1, Ordering::Relaxed);
                        debug!(
                            notifier = notifier.name(),
                            platform = %lead.platform,
                            external_id = %lead.external_id,
                            "Alert delivered"
                        );
                    }
                    Ok(Err(e)) => {
                        task_counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            notifier = notifier.name(),
                            platform = %lead.platform,
                            external_id = %lead.external_id,
                            error = %e,
                            "Alert delivery failed"
                        );
                    }
                    Err(_) => {
                        task_counters.failed.fetch_add(1, Ordering::Relaxed);
                        error!(
                            notifier = notifier.name(),
                            platform = %lead.platform,
                            external_id = %lead.external_id,
                            "Notifier panicked during delivery"
                        );
                    }
                }
            }
        });

        Self {
            sender,
            counters,
            dispatcher,
        }
    }

    /// Hand a lead to the dispatcher. Returns false if the alert was dropped.
    pub fn enqueue(&self, lead: Lead) -> bool {
        match self.sender.try_send(lead) {
            Ok(()) => true,
            Err(TrySendError::Full(lead)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    platform = %lead.platform,
                    external_id = %lead.external_id,
                    "Notification queue full, dropping alert"
                );
                false
            }
            Err(TrySendError::Closed(lead)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    platform = %lead.platform,
                    external_id = %lead.external_id,
                    "Notification dispatcher stopped, dropping alert"
                );
                false
            }
        }
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting alerts and wait for everything queued to be delivered.
    pub async fn shutdown(self) -> QueueStats {
        let Self {
            sender,
            counters,
            dispatcher,
        } = self;
        drop(sender);
        if let Err(e) = dispatcher.await {
            warn!(error = %e, "Notification dispatcher panicked");
        }
        QueueStats {
            delivered: counters.delivered.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
        }
    }
}
