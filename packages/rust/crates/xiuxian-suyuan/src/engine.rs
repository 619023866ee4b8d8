//! Owning facade over store, extractor, cache and traversal.

use crate::cache::{
    CacheCleanupNotice, CacheStats, LinkCache, RebuildReport, spawn_cleanup_task,
};
use crate::config::LinkHierarchyConfig;
use crate::error::LinkHierarchyError;
use crate::extractor::LinkExtractor;
use crate::hierarchy::{
    HierarchyView, InlinkHierarchy, OutlinkTree, build_hierarchy, build_inlink_hierarchy,
    build_outlink_hierarchy,
};
use crate::models::{DocumentId, LinkSet};
use crate::store::{DocumentStore, StoreError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

const CLEANUP_NOTICE_CAPACITY: usize = 16;

/// One link hierarchy instance: its cache lives and dies with the engine.
pub struct LinkHierarchyEngine {
    config: LinkHierarchyConfig,
    store: Arc<dyn DocumentStore>,
    cache: LinkCache,
    max_depth: AtomicUsize,
    notices: broadcast::Sender<CacheCleanupNotice>,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for LinkHierarchyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkHierarchyEngine")
            .field("config", &self.config())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl LinkHierarchyEngine {
    /// Build an engine over `store`. No background task is started; call
    /// [`Self::start_background_cleanup`] from inside a tokio runtime.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: LinkHierarchyConfig) -> Self {
        let config = config.normalized();
        let extractor = Arc::new(LinkExtractor::new(
            Arc::clone(&store),
            config.search_canvas_links_enabled,
        ));
        let cache = LinkCache::new(extractor, config.cache_options());
        let (notices, _) = broadcast::channel(CLEANUP_NOTICE_CAPACITY);
        Self {
            max_depth: AtomicUsize::new(config.max_depth),
            config,
            store,
            cache,
            notices,
            cleanup_task: Mutex::new(None),
        }
    }

    /// Spawn the periodic sweep. Returns `false` when it is already running.
    pub fn start_background_cleanup(&self) -> bool {
        let mut slot = self
            .cleanup_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }
        let notices = self
            .config
            .show_cache_cleanup_notice
            .then(|| self.notices.clone());
        let interval = self.config.cache_cleanup_interval();
        *slot = Some(spawn_cleanup_task(&self.cache, interval, notices));
        info!(
            event = "suyuan.engine.cleanup_started",
            interval_secs = interval.as_secs(),
            notices = self.config.show_cache_cleanup_notice,
        );
        true
    }

    /// Stop the background sweep, if any.
    pub fn shutdown(&self) {
        let handle = self
            .cleanup_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!(event = "suyuan.engine.shutdown", "cleanup task stopped");
        }
    }

    /// Effective config, including the current runtime depth bound.
    #[must_use]
    pub fn config(&self) -> LinkHierarchyConfig {
        LinkHierarchyConfig {
            max_depth: self.max_depth(),
            search_canvas_links_enabled: self.cache.extractor().search_canvas_links_enabled(),
            ..self.config.clone()
        }
    }

    /// Document store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Link cache.
    #[must_use]
    pub fn cache(&self) -> &LinkCache {
        &self.cache
    }

    /// Current traversal depth bound.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth.load(Ordering::Relaxed)
    }

    /// Change the traversal depth bound for later walks.
    pub fn set_max_depth(&self, max_depth: usize) {
        self.max_depth.store(max_depth, Ordering::Relaxed);
    }

    /// Toggle the canvas board scan for later extractions. Cached link sets
    /// are kept until they expire or are invalidated.
    pub fn set_search_canvas_links(&self, enabled: bool) {
        self.cache.extractor().set_search_canvas_links(enabled);
    }

    /// Link set of `doc`.
    ///
    /// # Errors
    ///
    /// Returns the cache error for `doc`.
    pub async fn links(
        &self,
        doc: &DocumentId,
        force_refresh: bool,
    ) -> Result<Arc<LinkSet>, LinkHierarchyError> {
        self.cache.get(doc, force_refresh).await
    }

    /// Inlinks, outlink tree, canvas links, attachments and tags of `doc`.
    ///
    /// # Errors
    ///
    /// Returns the cache error when `doc` itself cannot be extracted.
    pub async fn build_hierarchy(
        &self,
        doc: &DocumentId,
    ) -> Result<HierarchyView, LinkHierarchyError> {
        build_hierarchy(&self.cache, doc, self.max_depth()).await
    }

    /// Inward walk from `doc`, bounded by `max_depth` or the engine bound.
    ///
    /// # Errors
    ///
    /// Returns the cache error when `doc` itself cannot be extracted.
    pub async fn inlink_hierarchy(
        &self,
        doc: &DocumentId,
        max_depth: Option<usize>,
    ) -> Result<InlinkHierarchy, LinkHierarchyError> {
        let depth = max_depth.unwrap_or_else(|| self.max_depth());
        build_inlink_hierarchy(&self.cache, doc, depth).await
    }

    /// Outward walk from `doc`, bounded by `max_depth` or the engine bound.
    ///
    /// # Errors
    ///
    /// Returns the cache error when `doc` itself cannot be extracted.
    pub async fn outlink_hierarchy(
        &self,
        doc: &DocumentId,
        max_depth: Option<usize>,
    ) -> Result<OutlinkTree, LinkHierarchyError> {
        let depth = max_depth.unwrap_or_else(|| self.max_depth());
        build_outlink_hierarchy(&self.cache, doc, depth).await
    }

    /// Force re-extraction of `doc` on next access.
    pub fn invalidate(&self, doc: &DocumentId) -> bool {
        self.cache.invalidate(doc)
    }

    /// Drop everything and re-extract every document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot list documents.
    pub async fn rebuild_all(&self) -> Result<RebuildReport, StoreError> {
        self.cache.rebuild_all().await
    }

    /// Resolve a display name from a link set to a live document, at use time.
    #[must_use]
    pub fn open_target(&self, name: &str, context: &DocumentId) -> Option<DocumentId> {
        self.store.resolve_document_by_name(name, context)
    }

    /// Cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Receive cleanup notices; only published when
    /// `show_cache_cleanup_notice` is on.
    #[must_use]
    pub fn subscribe_cleanup_notices(&self) -> broadcast::Receiver<CacheCleanupNotice> {
        self.notices.subscribe()
    }
}

impl Drop for LinkHierarchyEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
