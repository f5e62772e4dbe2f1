// Ingestion tests — collectors, pipeline, store and notifier wired together.
//
// Collectors are scripted and notifiers record or fail on purpose, so these
// run without network access. Stores are in-memory SQLite unless a test is
// specifically about the on-disk file.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::Connection;

use leadwatch::collectors::fetch::PageFetcher;
use leadwatch::collectors::{build_collectors, Collector, ItemStream, Platform, RawItem};
use leadwatch::db::models::{Lead, LeadStats, NewLead};
use leadwatch::db::{self, schema, LeadStore, SqliteLeadStore};
use leadwatch::draft;
use leadwatch::error::{CollectorError, DeliveryError, PipelineError, StorageError};
use leadwatch::notify::{NotificationQueue, Notifier};
use leadwatch::pipeline::{IngestionPipeline, PipelineMode, PlatformOutcome, Scheduler};

// ============================================================
// Fixtures
// ============================================================

fn memory_store() -> Arc<SqliteLeadStore> {
    let conn = Connection::open_in_memory().unwrap();
    schema::create_tables(&conn).unwrap();
    Arc::new(SqliteLeadStore::new(conn))
}

fn item(id: &str, title: &str) -> RawItem {
    RawItem {
        external_id: Some(id.to_string()),
        title: Some(title.to_string()),
        content: Some(format!("post {id}")),
        link: Some(format!("https://example.com/post/{id}")),
    }
}

struct Scripted {
    platform: Platform,
    items: Vec<RawItem>,
}

impl Collector for Scripted {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn collect<'a>(&'a self, _keywords: &'a [String]) -> ItemStream<'a> {
        Box::pin(futures::stream::iter(
            self.items.iter().cloned().map(Ok).collect::<Vec<_>>(),
        ))
    }
}

struct Unreachable(Platform);

impl Collector for Unreachable {
    fn platform(&self) -> Platform {
        self.0
    }

    fn collect<'a>(&'a self, _keywords: &'a [String]) -> ItemStream<'a> {
        Box::pin(futures::stream::iter(vec![Err(CollectorError::Unreachable {
            platform: self.0.to_string(),
            reason: "timed out loading landing page".to_string(),
        })]))
    }
}

#[derive(Default)]
struct Recording {
    seen: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for Recording {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn notify(&self, lead: &Lead) -> Result<(), DeliveryError> {
        self.seen
            .lock()
            .unwrap()
            .push((lead.platform.clone(), lead.external_id.clone()));
        Ok(())
    }
}

/// Fails every delivery the way a missing Discord channel does.
struct ChannelMissing;

#[async_trait]
impl Notifier for ChannelMissing {
    fn name(&self) -> &'static str {
        "channel-missing"
    }

    async fn notify(&self, _lead: &Lead) -> Result<(), DeliveryError> {
        Err(DeliveryError::ChannelNotFound("123456".to_string()))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Fault {
    Inserts,
    Reads,
}

/// Delegates to SQLite but fails one kind of call for one platform.
struct BrokenFor {
    platform: &'static str,
    fault: Fault,
    inner: Arc<SqliteLeadStore>,
}

#[async_trait]
impl LeadStore for BrokenFor {
    async fn table_count(&self) -> Result<i64, StorageError> {
        self.inner.table_count().await
    }

    async fn insert_if_absent(&self, lead: &NewLead) -> Result<bool, StorageError> {
        if self.fault == Fault::Inserts && lead.platform == self.platform {
            return Err(StorageError::Corrupt("disk I/O error".to_string()));
        }
        self.inner.insert_if_absent(lead).await
    }

    async fn mark_drafted(&self, platform: &str, external_id: &str) -> Result<(), StorageError> {
        self.inner.mark_drafted(platform, external_id).await
    }

    async fn mark_applied(&self, platform: &str, external_id: &str) -> Result<(), StorageError> {
        self.inner.mark_applied(platform, external_id).await
    }

    async fn exists(&self, platform: &str, external_id: &str) -> Result<bool, StorageError> {
        self.inner.exists(platform, external_id).await
    }

    async fn get_lead(
        &self,
        platform: &str,
        external_id: &str,
    ) -> Result<Option<Lead>, StorageError> {
        if self.fault == Fault::Reads && platform == self.platform {
            return Err(StorageError::Corrupt("unparseable created_at".to_string()));
        }
        self.inner.get_lead(platform, external_id).await
    }

    async fn recent_leads(
        &self,
        limit: u32,
        platform: Option<&str>,
    ) -> Result<Vec<Lead>, StorageError> {
        self.inner.recent_leads(limit, platform).await
    }

    async fn lead_stats(&self) -> Result<LeadStats, StorageError> {
        self.inner.lead_stats().await
    }

    async fn get_scan_state(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_scan_state(key).await
    }

    async fn set_scan_state(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set_scan_state(key, value).await
    }
}

fn keywords() -> Vec<String> {
    vec!["remote developer job".to_string()]
}

// ============================================================
// Idempotence
// ============================================================

#[tokio::test]
async fn same_item_twice_is_one_lead_one_alert() {
    let store = memory_store();
    let notifier = Arc::new(Recording::default());
    let pipeline = IngestionPipeline::new(
        store.clone(),
        NotificationQueue::start(notifier.clone(), 8),
        PipelineMode::NotifyOnly,
    );
    let collector = Scripted {
        platform: Platform::Twitter,
        items: vec![item("123", "remote developer job")],
    };

    let first = pipeline.ingest_platform(&collector, &keywords()).await.unwrap();
    let second = pipeline.ingest_platform(&collector, &keywords()).await.unwrap();
    pipeline.shutdown().await;

    assert_eq!(first.new_leads, 1);
    assert_eq!(second.new_leads, 0);
    assert_eq!(second.duplicates, 1);
    assert_eq!(store.lead_stats().await.unwrap().total, 1);
    assert_eq!(
        *notifier.seen.lock().unwrap(),
        vec![("Twitter".to_string(), "123".to_string())]
    );
}

#[tokio::test]
async fn store_level_insert_reports_duplicate() {
    let store = memory_store();
    let lead = NewLead {
        platform: "Twitter".to_string(),
        external_id: "123".to_string(),
        title: "q".to_string(),
        content: "hello".to_string(),
        link: "http://x".to_string(),
    };
    assert!(store.insert_if_absent(&lead).await.unwrap());
    assert!(!store.insert_if_absent(&lead).await.unwrap());
    assert_eq!(store.lead_stats().await.unwrap().total, 1);
}

#[tokio::test]
async fn same_external_id_on_two_platforms_is_two_leads() {
    let store = memory_store();
    let pipeline = IngestionPipeline::new(
        store.clone(),
        NotificationQueue::start(Arc::new(Recording::default()), 8),
        PipelineMode::NotifyOnly,
    );

    for platform in [Platform::Reddit, Platform::Upwork] {
        let collector = Scripted {
            platform,
            items: vec![item("shared-1", "freelance programmer")],
        };
        let report = pipeline.ingest_platform(&collector, &keywords()).await.unwrap();
        assert_eq!(report.new_leads, 1);
    }
    assert_eq!(store.lead_stats().await.unwrap().total, 2);
}

// ============================================================
// Malformed items
// ============================================================

#[tokio::test]
async fn item_without_link_is_skipped_and_rest_continue() {
    let store = memory_store();
    let pipeline = IngestionPipeline::new(
        store.clone(),
        NotificationQueue::start(Arc::new(Recording::default()), 8),
        PipelineMode::NotifyOnly,
    );
    let mut broken = item("a1", "need automation help");
    broken.link = None;
    let collector = Scripted {
        platform: Platform::Reddit,
        items: vec![item("a0", "need automation help"), broken, item("a2", "need automation help")],
    };

    let report = pipeline.ingest_platform(&collector, &keywords()).await.unwrap();
    assert_eq!(report.seen, 3);
    assert_eq!(report.malformed, 1);
    assert_eq!(report.new_leads, 2);
    assert!(!store.exists("Reddit", "a1").await.unwrap());
}

// ============================================================
// Drafts and notification independence
// ============================================================

#[tokio::test]
async fn draft_mode_on_and_off() {
    for (mode, expect_drafted) in [
        (PipelineMode::NotifyAndDraft, true),
        (PipelineMode::NotifyOnly, false),
    ] {
        let store = memory_store();
        let pipeline = IngestionPipeline::new(
            store.clone(),
            NotificationQueue::start(Arc::new(Recording::default()), 8),
            mode,
        );
        let collector = Scripted {
            platform: Platform::LinkedIn,
            items: vec![item("77", "remote developer job")],
        };

        let report = pipeline.ingest_platform(&collector, &keywords()).await.unwrap();
        assert_eq!(report.drafted, usize::from(expect_drafted));

        let lead = store.get_lead("LinkedIn", "77").await.unwrap().unwrap();
        assert_eq!(lead.draft_generated, expect_drafted);
        assert!(draft::render(&lead).contains("remote developer job"));
    }
}

#[tokio::test]
async fn failed_channel_lookup_leaves_lead_and_draft_intact() {
    let store = memory_store();
    let pipeline = IngestionPipeline::new(
        store.clone(),
        NotificationQueue::start(Arc::new(ChannelMissing), 8),
        PipelineMode::NotifyAndDraft,
    );
    let collector = Scripted {
        platform: Platform::Reddit,
        items: vec![item("n1", "AI developer wanted")],
    };

    let report = pipeline.ingest_platform(&collector, &keywords()).await.unwrap();
    let stats = pipeline.shutdown().await;

    assert_eq!(report.new_leads, 1);
    assert_eq!(stats.failed, 1);
    let lead = store.get_lead("Reddit", "n1").await.unwrap().unwrap();
    assert!(lead.draft_generated);
}

#[tokio::test]
async fn marking_twice_is_harmless() {
    let store = memory_store();
    let pipeline = IngestionPipeline::new(
        store.clone(),
        NotificationQueue::start(Arc::new(Recording::default()), 8),
        PipelineMode::NotifyAndDraft,
    );
    let collector = Scripted {
        platform: Platform::Upwork,
        items: vec![item("~01", "python scraper")],
    };
    pipeline.ingest_platform(&collector, &keywords()).await.unwrap();

    store.mark_drafted("Upwork", "~01").await.unwrap();
    store.mark_drafted("Upwork", "no-such-lead").await.unwrap();
    let stats = store.lead_stats().await.unwrap();
    assert_eq!(stats.drafted, 1);
}

// ============================================================
// Failure isolation across platforms
// ============================================================

#[tokio::test]
async fn unreachable_platform_does_not_stop_the_others() {
    let store = memory_store();
    let notifier = Arc::new(Recording::default());
    let pipeline = IngestionPipeline::new(
        store.clone(),
        NotificationQueue::start(notifier.clone(), 16),
        PipelineMode::NotifyOnly,
    );
    let collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(Scripted { platform: Platform::Twitter, items: vec![item("t1", "k")] }),
        Box::new(Unreachable(Platform::LinkedIn)),
        Box::new(Scripted { platform: Platform::Reddit, items: vec![item("r1", "k")] }),
        Box::new(Scripted { platform: Platform::Upwork, items: vec![item("u1", "k")] }),
    ];
    let mut scheduler = Scheduler::new(pipeline, collectors, keywords(), Duration::from_secs(60));

    let report = scheduler.run_cycle().await;
    let stats = scheduler.shutdown().await;

    assert_eq!(report.failed_platforms(), vec![Platform::LinkedIn]);
    assert_eq!(report.totals().new_leads, 3);
    assert_eq!(stats.delivered, 3);
    for (platform, id) in [("Twitter", "t1"), ("Reddit", "r1"), ("Upwork", "u1")] {
        assert!(store.exists(platform, id).await.unwrap());
    }
}

#[tokio::test]
async fn storage_error_fails_only_that_platform() {
    let inner = memory_store();
    let store: Arc<dyn LeadStore> = Arc::new(BrokenFor {
        platform: "Reddit",
        fault: Fault::Inserts,
        inner: inner.clone(),
    });
    let notifier = Arc::new(Recording::default());
    let pipeline = IngestionPipeline::new(
        store,
        NotificationQueue::start(notifier.clone(), 16),
        PipelineMode::NotifyAndDraft,
    );
    let collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(Scripted { platform: Platform::Reddit, items: vec![item("r1", "k")] }),
        Box::new(Scripted { platform: Platform::Upwork, items: vec![item("u1", "k")] }),
    ];
    let mut scheduler = Scheduler::new(pipeline, collectors, keywords(), Duration::from_secs(60));

    let report = scheduler.run_cycle().await;
    scheduler.shutdown().await;

    match &report.outcomes[0] {
        PlatformOutcome::Failed { platform, reason, .. } => {
            assert_eq!(*platform, Platform::Reddit);
            assert!(reason.contains("disk I/O error"));
        }
        other => panic!("expected Reddit to fail, got {other:?}"),
    }
    assert!(!report.outcomes[1].is_failed());

    // The failed insert was never notified or drafted
    assert_eq!(
        *notifier.seen.lock().unwrap(),
        vec![("Upwork".to_string(), "u1".to_string())]
    );
    assert_eq!(inner.lead_stats().await.unwrap().drafted, 1);
}

#[tokio::test]
async fn storage_error_surfaces_as_pipeline_error() {
    let store: Arc<dyn LeadStore> = Arc::new(BrokenFor {
        platform: "Twitter",
        fault: Fault::Inserts,
        inner: memory_store(),
    });
    let pipeline = IngestionPipeline::new(
        store,
        NotificationQueue::start(Arc::new(Recording::default()), 8),
        PipelineMode::NotifyOnly,
    );
    let collector = Scripted {
        platform: Platform::Twitter,
        items: vec![item("t1", "k")],
    };

    let err = pipeline.ingest_platform(&collector, &keywords()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Storage(StorageError::Corrupt(_))));
}

#[tokio::test]
async fn failed_read_back_still_alerts_new_lead() {
    let inner = memory_store();
    let store: Arc<dyn LeadStore> = Arc::new(BrokenFor {
        platform: "Upwork",
        fault: Fault::Reads,
        inner: inner.clone(),
    });
    let notifier = Arc::new(Recording::default());
    let pipeline = IngestionPipeline::new(
        store,
        NotificationQueue::start(notifier.clone(), 8),
        PipelineMode::NotifyAndDraft,
    );
    let collector = Scripted {
        platform: Platform::Upwork,
        items: vec![item("~01job", "need automation help")],
    };

    let report = pipeline.ingest_platform(&collector, &keywords()).await.unwrap();
    let stats = pipeline.shutdown().await;

    assert_eq!(report.new_leads, 1);
    assert_eq!(report.drafted, 1);
    assert_eq!(stats.delivered, 1);
    assert_eq!(
        *notifier.seen.lock().unwrap(),
        vec![("Upwork".to_string(), "~01job".to_string())]
    );
    let stored = inner.get_lead("Upwork", "~01job").await.unwrap().unwrap();
    assert!(stored.draft_generated);
}

// ============================================================
// Real collectors over a fake fetcher
// ============================================================

/// Serves the same Reddit results page for every search URL.
struct RedditPage;

#[async_trait]
impl PageFetcher for RedditPage {
    async fn fetch(&self, url: &str) -> Result<String, CollectorError> {
        if url.contains("reddit.com") {
            Ok(r#"<shreddit-post permalink="/r/forhire/comments/1q2w3e/hiring/"
                                 post-title="[Hiring] Rust developer"></shreddit-post>"#
                .to_string())
        } else {
            Err(CollectorError::Http {
                status: 503,
                url: url.to_string(),
            })
        }
    }
}

#[tokio::test]
async fn built_collectors_share_fetcher_and_isolate_failures() {
    let store = memory_store();
    let pipeline = IngestionPipeline::new(
        store.clone(),
        NotificationQueue::start(Arc::new(Recording::default()), 8),
        PipelineMode::NotifyOnly,
    );
    let collectors = build_collectors(&[Platform::Reddit, Platform::Twitter], Arc::new(RedditPage), 10);
    let keywords = vec!["rust developer".to_string(), "freelance programmer".to_string()];
    let mut scheduler = Scheduler::new(pipeline, collectors, keywords, Duration::from_secs(60));

    let report = scheduler.run_cycle().await;
    scheduler.shutdown().await;

    // Cycle order is fixed: Twitter (down) then Reddit
    assert_eq!(report.outcomes[0].platform(), Platform::Twitter);
    assert!(report.outcomes[0].is_failed());
    assert_eq!(report.outcomes[1].platform(), Platform::Reddit);
    // One post found by both keywords
    assert_eq!(report.outcomes[1].report().new_leads, 1);
    assert_eq!(report.outcomes[1].report().duplicates, 1);
    assert!(store.exists("Reddit", "1q2w3e").await.unwrap());
}

// ============================================================
// On-disk database
// ============================================================

#[tokio::test]
async fn leads_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("leads.db");
    let path = path.to_str().unwrap();

    {
        let store = db::initialize_store(path).unwrap();
        let lead = NewLead {
            platform: "Reddit".to_string(),
            external_id: "p1".to_string(),
            title: "t".to_string(),
            content: String::new(),
            link: "https://www.reddit.com/r/a/comments/p1/".to_string(),
        };
        assert!(store.insert_if_absent(&lead).await.unwrap());
    }

    let store = db::open_store(path).unwrap();
    assert!(store.exists("Reddit", "p1").await.unwrap());
    assert_eq!(store.table_count().await.unwrap(), 3);
}

#[test]
fn open_without_init_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.db");
    let err = db::open_store(path.to_str().unwrap()).err().unwrap();
    assert!(err.to_string().contains("leadwatch init"));
}
