//! Memoized link sets per document.
//!
//! Entries expire after `cache_timeout`, the oldest entry (by insertion or
//! refresh time, not by access) is evicted past `max_cache_size`, and
//! concurrent lookups for one document share a single spawned extraction.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`.

mod cleanup;

pub use cleanup::{CLEANUP_NOTICE_COOLDOWN, CacheCleanupNotice, spawn_cleanup_task};

use crate::error::LinkHierarchyError;
use crate::extractor::LinkExtractor;
use crate::models::{DocumentId, LinkSet};
use crate::store::StoreError;
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Fixed ceiling for a single extraction.
pub const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(10);

type SharedExtraction = Shared<BoxFuture<'static, Result<Arc<LinkSet>, LinkHierarchyError>>>;

/// Cache sizing and staleness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkCacheOptions {
    /// Entries older than this are re-extracted.
    pub cache_timeout: Duration,
    /// Maximum number of entries before the oldest one is evicted.
    pub max_cache_size: usize,
}

impl Default for LinkCacheOptions {
    fn default() -> Self {
        Self {
            cache_timeout: Duration::from_millis(300_000),
            max_cache_size: 1000,
        }
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Cached entries.
    pub entries: usize,
    /// Extractions currently running.
    pub in_flight: usize,
    /// Documents marked for mandatory re-extraction.
    pub dirty: usize,
    /// Lookups answered from a fresh entry.
    pub hits: u64,
    /// Lookups that started an extraction.
    pub misses: u64,
    /// Lookups that joined a running extraction.
    pub coalesced: u64,
    /// Entries evicted by the size bound.
    pub evictions: u64,
    /// Extractions that failed or timed out.
    pub failures: u64,
}

/// Outcome of [`LinkCache::rebuild_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    /// Documents listed by the store.
    pub total: usize,
    /// Documents extracted and cached.
    pub refreshed: usize,
    /// Documents whose extraction failed.
    pub failed: usize,
}

#[derive(Debug)]
struct CacheEntry {
    link_set: Arc<LinkSet>,
    timestamp: Instant,
    seq: u64,
}

struct InFlight {
    ticket: u64,
    future: SharedExtraction,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<DocumentId, CacheEntry>,
    in_flight: HashMap<DocumentId, InFlight>,
    dirty: HashSet<DocumentId>,
    generation: u64,
    next_seq: u64,
    hits: u64,
    misses: u64,
    coalesced: u64,
    evictions: u64,
    failures: u64,
}

impl CacheState {
    fn bump_seq(&mut self) -> u64 {
        self.next_seq = self.next_seq.wrapping_add(1);
        self.next_seq
    }

    fn fresh_entry(&self, doc: &DocumentId, timeout: Duration) -> Option<Arc<LinkSet>> {
        if self.dirty.contains(doc) {
            return None;
        }
        self.entries
            .get(doc)
            .filter(|entry| entry.timestamp.elapsed() < timeout)
            .map(|entry| Arc::clone(&entry.link_set))
    }

    fn evict_oldest(&mut self) -> Option<DocumentId> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.timestamp, entry.seq))
            .map(|(doc, _)| doc.clone())?;
        self.entries.remove(&oldest);
        self.evictions += 1;
        Some(oldest)
    }
}

struct CacheInner {
    extractor: Arc<LinkExtractor>,
    options: LinkCacheOptions,
    state: Mutex<CacheState>,
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_extraction(
        &self,
        doc: &DocumentId,
        ticket: u64,
        generation: u64,
        outcome: &Result<Arc<LinkSet>, LinkHierarchyError>,
    ) {
        let mut state = self.lock();
        if state
            .in_flight
            .get(doc)
            .is_some_and(|pending| pending.ticket == ticket)
        {
            state.in_flight.remove(doc);
        }
        let link_set = match outcome {
            Ok(link_set) => link_set,
            Err(err) => {
                state.failures += 1;
                warn!(
                    event = "suyuan.cache.extraction_failed",
                    document = %doc,
                    timeout = err.is_timeout(),
                    error = %err,
                    "link extraction failed; nothing cached"
                );
                return;
            }
        };
        if state.generation != generation {
            debug!(
                event = "suyuan.cache.stale_result_dropped",
                document = %doc,
                "cache was rebuilt while extraction ran"
            );
            return;
        }
        let seq = state.bump_seq();
        state.dirty.remove(doc);
        state.entries.insert(
            doc.clone(),
            CacheEntry {
                link_set: Arc::clone(link_set),
                timestamp: Instant::now(),
                seq,
            },
        );
        if state.entries.len() > self.options.max_cache_size
            && let Some(evicted) = state.evict_oldest()
        {
            debug!(
                event = "suyuan.cache.evicted",
                document = %evicted,
                max_cache_size = self.options.max_cache_size,
            );
        }
    }

    fn abandon(&self, doc: &DocumentId, ticket: u64) {
        let mut state = self.lock();
        if state
            .in_flight
            .get(doc)
            .is_some_and(|pending| pending.ticket == ticket)
        {
            state.in_flight.remove(doc);
        }
        state.failures += 1;
    }
}

/// Per-document link set cache with TTL, size bound and request coalescing.
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct LinkCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for LinkCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkCache")
            .field("options", &self.inner.options)
            .field("stats", &self.stats())
            .finish()
    }
}

impl LinkCache {
    /// Create an empty cache over `extractor`.
    #[must_use]
    pub fn new(extractor: Arc<LinkExtractor>, options: LinkCacheOptions) -> Self {
        let options = LinkCacheOptions {
            max_cache_size: options.max_cache_size.max(1),
            ..options
        };
        Self {
            inner: Arc::new(CacheInner {
                extractor,
                options,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    fn downgrade(&self) -> Weak<CacheInner> {
        Arc::downgrade(&self.inner)
    }

    fn from_inner(inner: Arc<CacheInner>) -> Self {
        Self { inner }
    }

    /// Options in effect.
    #[must_use]
    pub fn options(&self) -> LinkCacheOptions {
        self.inner.options
    }

    /// Extractor behind the cache.
    #[must_use]
    pub fn extractor(&self) -> &Arc<LinkExtractor> {
        &self.inner.extractor
    }

    /// Link set for `doc`.
    ///
    /// A fresh, non-dirty entry is returned without I/O. Otherwise the call
    /// joins a running extraction for `doc` or starts one. `force_refresh`
    /// drops the entry and marks `doc` dirty first.
    ///
    /// # Errors
    ///
    /// Returns [`LinkHierarchyError::Timeout`] after [`EXTRACTION_TIMEOUT`],
    /// or the extractor's [`LinkHierarchyError::Extraction`]. Failures are
    /// never cached.
    pub async fn get(
        &self,
        doc: &DocumentId,
        force_refresh: bool,
    ) -> Result<Arc<LinkSet>, LinkHierarchyError> {
        let pending = {
            let mut state = self.inner.lock();
            if force_refresh {
                state.entries.remove(doc);
                state.dirty.insert(doc.clone());
            }
            if let Some(link_set) = state.fresh_entry(doc, self.inner.options.cache_timeout) {
                state.hits += 1;
                debug!(event = "suyuan.cache.hit", document = %doc);
                return Ok(link_set);
            }
            let joined = state
                .in_flight
                .get(doc)
                .map(|pending| pending.future.clone());
            if let Some(future) = joined {
                state.coalesced += 1;
                debug!(event = "suyuan.cache.coalesced", document = %doc);
                future
            } else {
                state.misses += 1;
                debug!(event = "suyuan.cache.miss", document = %doc, force_refresh);
                self.start_extraction(&mut state, doc)
            }
        };
        pending.await
    }

    fn start_extraction(&self, state: &mut CacheState, doc: &DocumentId) -> SharedExtraction {
        let ticket = state.bump_seq();
        let generation = state.generation;
        let inner = Arc::clone(&self.inner);
        let task_doc = doc.clone();
        let handle = tokio::spawn(async move {
            let outcome =
                match tokio::time::timeout(EXTRACTION_TIMEOUT, inner.extractor.extract(&task_doc))
                    .await
                {
                    Ok(Ok(link_set)) => Ok(Arc::new(link_set)),
                    Ok(Err(err)) => Err(err),
                    Err(_elapsed) => Err(LinkHierarchyError::Timeout {
                        document: task_doc.clone(),
                        timeout_ms: u64::try_from(EXTRACTION_TIMEOUT.as_millis())
                            .unwrap_or(u64::MAX),
                    }),
                };
            inner.finish_extraction(&task_doc, ticket, generation, &outcome);
            outcome
        });

        let inner = Arc::clone(&self.inner);
        let waiter_doc = doc.clone();
        let future = async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    inner.abandon(&waiter_doc, ticket);
                    Err(LinkHierarchyError::extraction(&waiter_doc, join_err))
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            doc.clone(),
            InFlight {
                ticket,
                future: future.clone(),
            },
        );
        future
    }

    /// Drop the entry for `doc` and mark it dirty. Returns whether an entry
    /// was present.
    pub fn invalidate(&self, doc: &DocumentId) -> bool {
        let mut state = self.inner.lock();
        let removed = state.entries.remove(doc).is_some();
        state.dirty.insert(doc.clone());
        debug!(event = "suyuan.cache.invalidated", document = %doc, removed);
        removed
    }

    /// Clear entries, in-flight markers and dirty flags, then re-extract every
    /// document the store lists.
    ///
    /// Extractions started before the rebuild still resolve for their callers
    /// but never write into the rebuilt cache.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot list its documents.
    pub async fn rebuild_all(&self) -> Result<RebuildReport, StoreError> {
        let documents = self.inner.extractor.store().list_documents().await?;
        {
            let mut state = self.inner.lock();
            state.entries.clear();
            state.in_flight.clear();
            state.dirty.clear();
            state.generation = state.generation.wrapping_add(1);
        }
        let outcomes = join_all(documents.iter().map(|doc| self.get(doc, false))).await;
        let refreshed = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        let report = RebuildReport {
            total: documents.len(),
            refreshed,
            failed: documents.len() - refreshed,
        };
        info!(
            event = "suyuan.cache.rebuilt",
            total = report.total,
            refreshed = report.refreshed,
            failed = report.failed,
            "link cache rebuilt"
        );
        Ok(report)
    }

    /// Remove every entry older than `cache_timeout`; returns the count.
    pub fn sweep_expired(&self) -> usize {
        let timeout = self.inner.options.cache_timeout;
        let now = Instant::now();
        let mut state = self.inner.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| now.duration_since(entry.timestamp) <= timeout);
        before - state.entries.len()
    }

    /// Whether an entry for `doc` exists, fresh or not.
    #[must_use]
    pub fn contains(&self, doc: &DocumentId) -> bool {
        self.inner.lock().entries.contains_key(doc)
    }

    /// Whether `doc` is marked dirty.
    #[must_use]
    pub fn is_dirty(&self, doc: &DocumentId) -> bool {
        self.inner.lock().dirty.contains(doc)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether no entries are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counters and sizes.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock();
        CacheStats {
            entries: state.entries.len(),
            in_flight: state.in_flight.len(),
            dirty: state.dirty.len(),
            hits: state.hits,
            misses: state.misses,
            coalesced: state.coalesced,
            evictions: state.evictions,
            failures: state.failures,
        }
    }
}
