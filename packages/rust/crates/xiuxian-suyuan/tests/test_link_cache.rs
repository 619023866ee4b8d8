//! Link cache freshness, eviction, coalescing and cleanup.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use xiuxian_suyuan::{
    CacheCleanupNotice, DocumentId, DocumentStore, LinkCache, LinkCacheOptions, LinkExtractor,
    LinkHierarchyConfig, LinkHierarchyEngine, LinkHierarchyError, MemoryStore, ParsedLinks,
    ResolvedLinkIndex, StoreError,
};

/// Memory store that counts extractions and can be slowed down or broken.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    extractions: AtomicUsize,
    delay_ms: AtomicU64,
    fail: AtomicBool,
}

impl CountingStore {
    fn with_notes(notes: &[(&str, &str)]) -> Arc<Self> {
        let store = Self::default();
        for (path, content) in notes {
            store.inner.insert(path, *content);
        }
        Arc::new(store)
    }

    fn extractions(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }

    fn set_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.delay_ms.store(millis, Ordering::SeqCst);
    }

    fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    fn resolve_document_by_name(&self, name: &str, context: &DocumentId) -> Option<DocumentId> {
        self.inner.resolve_document_by_name(name, context)
    }

    async fn resolved_link_index(&self) -> Result<Arc<ResolvedLinkIndex>, StoreError> {
        self.inner.resolved_link_index().await
    }

    async fn parsed_links(&self, doc: &DocumentId) -> Result<Option<ParsedLinks>, StoreError> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        // Content is read before the delay, so a slow extraction sees the
        // document as it was when the extraction started.
        let parsed = self.inner.parsed_links(doc).await;
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk unavailable".to_string()));
        }
        parsed
    }

    async fn read_raw_content(&self, doc: &DocumentId) -> Result<String, StoreError> {
        self.inner.read_raw_content(doc).await
    }

    async fn list_canvas_boards(&self) -> Result<Vec<DocumentId>, StoreError> {
        self.inner.list_canvas_boards().await
    }

    async fn list_documents(&self) -> Result<Vec<DocumentId>, StoreError> {
        self.inner.list_documents().await
    }
}

fn cache_over(store: &Arc<CountingStore>, timeout_ms: u64, max_cache_size: usize) -> LinkCache {
    let extractor = Arc::new(LinkExtractor::new(store.clone(), true));
    LinkCache::new(
        extractor,
        LinkCacheOptions {
            cache_timeout: Duration::from_millis(timeout_ms),
            max_cache_size,
        },
    )
}

fn abc_notes() -> Arc<CountingStore> {
    CountingStore::with_notes(&[
        ("A.md", "# A\n\n[[B]]\n"),
        ("B.md", "# B\n\n[[C]]\n"),
        ("C.md", "# C\n"),
    ])
}

#[tokio::test(start_paused = true)]
async fn test_fresh_entry_is_returned_without_extraction() -> Result<(), Box<dyn std::error::Error>>
{
    let store = abc_notes();
    let cache = cache_over(&store, 300_000, 1000);
    let a = DocumentId::new("A.md");

    let first = cache.get(&a, false).await?;
    let second = cache.get(&a, false).await?;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.extractions(), 1);
    assert_eq!(first.outlinks.as_slice(), ["B".to_string()]);
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_entry_expires_after_cache_timeout() -> Result<(), Box<dyn std::error::Error>> {
    let store = abc_notes();
    let cache = cache_over(&store, 1000, 1000);
    let a = DocumentId::new("A.md");

    cache.get(&a, false).await?;
    tokio::time::advance(Duration::from_millis(500)).await;
    cache.get(&a, false).await?;
    assert_eq!(store.extractions(), 1);

    tokio::time::advance(Duration::from_millis(1000)).await;
    cache.get(&a, false).await?;
    assert_eq!(store.extractions(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_lookups_share_one_extraction() -> Result<(), Box<dyn std::error::Error>> {
    let store = abc_notes();
    store.set_delay(Duration::from_millis(200));
    let cache = cache_over(&store, 300_000, 1000);
    let a = DocumentId::new("A.md");

    let (left, right, third) = tokio::join!(
        cache.get(&a, false),
        cache.get(&a, false),
        cache.get(&a, false)
    );
    let (left, right, third) = (left?, right?, third?);

    assert!(Arc::ptr_eq(&left, &right));
    assert!(Arc::ptr_eq(&left, &third));
    assert_eq!(store.extractions(), 1);
    let stats = cache.stats();
    assert_eq!(stats.coalesced, 2);
    assert_eq!(stats.in_flight, 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_oldest_entry_is_evicted_past_max_size() -> Result<(), Box<dyn std::error::Error>> {
    let store = abc_notes();
    let cache = cache_over(&store, 300_000, 2);
    let (a, b, c) = (
        DocumentId::new("A.md"),
        DocumentId::new("B.md"),
        DocumentId::new("C.md"),
    );

    cache.get(&a, false).await?;
    tokio::time::advance(Duration::from_millis(10)).await;
    cache.get(&b, false).await?;
    tokio::time::advance(Duration::from_millis(10)).await;
    // Access does not refresh the timestamp.
    cache.get(&a, false).await?;
    cache.get(&c, false).await?;

    assert_eq!(cache.len(), 2);
    assert!(!cache.contains(&a));
    assert!(cache.contains(&b));
    assert!(cache.contains(&c));
    assert_eq!(cache.stats().evictions, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_force_refresh_re_extracts() -> Result<(), Box<dyn std::error::Error>> {
    let store = abc_notes();
    let cache = cache_over(&store, 300_000, 1000);
    let a = DocumentId::new("A.md");

    cache.get(&a, false).await?;
    store.inner.insert("A.md", "# A\n\n[[C]]\n");
    let stale = cache.get(&a, false).await?;
    assert_eq!(stale.outlinks.as_slice(), ["B".to_string()]);

    let refreshed = cache.get(&a, true).await?;
    assert_eq!(refreshed.outlinks.as_slice(), ["C".to_string()]);
    assert_eq!(store.extractions(), 2);

    cache.get(&a, false).await?;
    assert_eq!(store.extractions(), 2);
    assert!(!cache.is_dirty(&a));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_marks_dirty_until_next_extraction() -> Result<(), Box<dyn std::error::Error>>
{
    let store = abc_notes();
    let cache = cache_over(&store, 300_000, 1000);
    let a = DocumentId::new("A.md");

    cache.get(&a, false).await?;
    assert!(cache.invalidate(&a));
    assert!(cache.is_dirty(&a));
    assert!(!cache.contains(&a));

    cache.get(&a, false).await?;
    assert_eq!(store.extractions(), 2);
    assert!(!cache.is_dirty(&a));

    assert!(!cache.invalidate(&DocumentId::new("Unknown.md")));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_extraction_is_not_cached() -> Result<(), Box<dyn std::error::Error>> {
    let store = abc_notes();
    let cache = cache_over(&store, 300_000, 1000);
    let a = DocumentId::new("A.md");

    store.set_failing(true);
    let err = cache.get(&a, false).await.err();
    assert!(matches!(err, Some(LinkHierarchyError::Extraction { .. })));
    assert!(!cache.contains(&a));
    assert_eq!(cache.stats().failures, 1);

    store.set_failing(false);
    let links = cache.get(&a, false).await?;
    assert_eq!(links.outlinks.len(), 1);
    assert_eq!(store.extractions(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_slow_extraction_times_out_and_retries() -> Result<(), Box<dyn std::error::Error>> {
    let store = abc_notes();
    store.set_delay(Duration::from_secs(30));
    let cache = cache_over(&store, 300_000, 1000);
    let a = DocumentId::new("A.md");

    let err = cache.get(&a, false).await.err();
    match err {
        Some(LinkHierarchyError::Timeout {
            document,
            timeout_ms,
        }) => {
            assert_eq!(document, a);
            assert_eq!(timeout_ms, 10_000);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(!cache.contains(&a));
    assert_eq!(cache.stats().in_flight, 0);

    store.set_delay(Duration::ZERO);
    cache.get(&a, false).await?;
    assert_eq!(store.extractions(), 2);
    assert!(cache.contains(&a));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_rebuild_all_refreshes_every_document() -> Result<(), Box<dyn std::error::Error>> {
    let store = abc_notes();
    store.inner.insert_attachment("assets/photo.png");
    let cache = cache_over(&store, 300_000, 1000);
    let a = DocumentId::new("A.md");

    cache.get(&a, false).await?;
    cache.invalidate(&DocumentId::new("B.md"));

    let report = cache.rebuild_all().await?;
    assert_eq!(report.total, 3);
    assert_eq!(report.refreshed, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.stats().dirty, 0);
    assert_eq!(store.extractions(), 4);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_rebuild_all_ignores_extraction_started_before_it()
-> Result<(), Box<dyn std::error::Error>> {
    let store = abc_notes();
    store.set_delay(Duration::from_millis(200));
    let cache = cache_over(&store, 300_000, 1000);
    let a = DocumentId::new("A.md");

    let slow = tokio::spawn({
        let cache = cache.clone();
        let a = a.clone();
        async move { cache.get(&a, false).await }
    });
    while store.extractions() == 0 {
        tokio::task::yield_now().await;
    }

    store.inner.insert("A.md", "# A\n\n[[C]]\n");
    store.set_delay(Duration::from_millis(50));
    let report = cache.rebuild_all().await?;
    assert_eq!(report.total, 3);
    assert_eq!(report.refreshed, 3);

    // The caller that started first still gets its own result.
    let stale = slow.await??;
    assert_eq!(stale.outlinks.as_slice(), ["B".to_string()]);

    let current = cache.get(&a, false).await?;
    assert_eq!(current.outlinks.as_slice(), ["C".to_string()]);
    assert_eq!(store.extractions(), 4);
    assert_eq!(cache.stats().in_flight, 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_force_refresh_joins_running_extraction() -> Result<(), Box<dyn std::error::Error>> {
    let store = abc_notes();
    store.set_delay(Duration::from_millis(200));
    let cache = cache_over(&store, 300_000, 1000);
    let a = DocumentId::new("A.md");

    let (plain, forced, after_invalidate) = tokio::join!(
        cache.get(&a, false),
        cache.get(&a, true),
        async {
            cache.invalidate(&a);
            cache.get(&a, false).await
        }
    );
    let (plain, forced, after_invalidate) = (plain?, forced?, after_invalidate?);

    assert!(Arc::ptr_eq(&plain, &forced));
    assert!(Arc::ptr_eq(&plain, &after_invalidate));
    assert_eq!(store.extractions(), 1);
    assert_eq!(cache.stats().coalesced, 2);
    assert!(!cache.is_dirty(&a));
    assert!(cache.contains(&a));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_sweep_removes_only_expired_entries() -> Result<(), Box<dyn std::error::Error>> {
    let store = abc_notes();
    let cache = cache_over(&store, 1000, 1000);
    let (a, b) = (DocumentId::new("A.md"), DocumentId::new("B.md"));

    cache.get(&a, false).await?;
    tokio::time::advance(Duration::from_millis(600)).await;
    cache.get(&b, false).await?;
    tokio::time::advance(Duration::from_millis(600)).await;

    assert_eq!(cache.sweep_expired(), 1);
    assert!(!cache.contains(&a));
    assert!(cache.contains(&b));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_background_cleanup_publishes_notice() -> Result<(), Box<dyn std::error::Error>> {
    let store = abc_notes();
    let config = LinkHierarchyConfig {
        cache_timeout_ms: 1000,
        cache_cleanup_interval_minutes: 1,
        show_cache_cleanup_notice: true,
        ..LinkHierarchyConfig::default()
    };
    let engine = LinkHierarchyEngine::new(store.clone(), config);
    let mut notices = engine.subscribe_cleanup_notices();

    assert!(engine.start_background_cleanup());
    assert!(!engine.start_background_cleanup());
    engine.links(&DocumentId::new("A.md"), false).await?;

    let notice = tokio::time::timeout(Duration::from_secs(120), notices.recv()).await??;
    assert_eq!(
        notice,
        CacheCleanupNotice {
            removed: 1,
            remaining: 0
        }
    );
    assert!(engine.cache().is_empty());

    engine.shutdown();
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_background_cleanup_without_notices() -> Result<(), Box<dyn std::error::Error>> {
    let store = abc_notes();
    let config = LinkHierarchyConfig {
        cache_timeout_ms: 1000,
        cache_cleanup_interval_minutes: 1,
        show_cache_cleanup_notice: false,
        ..LinkHierarchyConfig::default()
    };
    let engine = LinkHierarchyEngine::new(store.clone(), config);
    let mut notices = engine.subscribe_cleanup_notices();
    engine.start_background_cleanup();
    engine.links(&DocumentId::new("A.md"), false).await?;

    let outcome = tokio::time::timeout(Duration::from_secs(150), notices.recv()).await;
    assert!(outcome.is_err());
    assert!(engine.cache().is_empty());
    Ok(())
}
