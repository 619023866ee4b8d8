use super::LinkCache;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// At most one cleanup notice is published per window.
pub const CLEANUP_NOTICE_COOLDOWN: Duration = Duration::from_secs(60);

/// Published after a sweep removed at least one expired entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheCleanupNotice {
    /// Entries removed by the sweep.
    pub removed: usize,
    /// Entries left in the cache.
    pub remaining: usize,
}

#[derive(Debug)]
struct NoticeGate {
    cooldown: Duration,
    last_sent: Option<Instant>,
}

impl NoticeGate {
    const fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_sent: None,
        }
    }

    fn allow(&mut self, now: Instant) -> bool {
        if self
            .last_sent
            .is_some_and(|last| now.duration_since(last) < self.cooldown)
        {
            return false;
        }
        self.last_sent = Some(now);
        true
    }
}

/// Sweep expired entries every `interval` until the cache is dropped or the
/// handle is aborted.
///
/// When `notices` is set, sweeps that removed entries publish a
/// [`CacheCleanupNotice`], rate-limited by [`CLEANUP_NOTICE_COOLDOWN`].
pub fn spawn_cleanup_task(
    cache: &LinkCache,
    interval: Duration,
    notices: Option<broadcast::Sender<CacheCleanupNotice>>,
) -> JoinHandle<()> {
    let weak = cache.downgrade();
    let interval = interval.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;
        let mut gate = NoticeGate::new(CLEANUP_NOTICE_COOLDOWN);
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                debug!(event = "suyuan.cache.cleanup_stopped", "cache dropped");
                break;
            };
            let cache = LinkCache::from_inner(inner);
            let removed = cache.sweep_expired();
            if removed == 0 {
                continue;
            }
            let remaining = cache.len();
            info!(
                event = "suyuan.cache.cleanup",
                removed,
                remaining,
                "expired link cache entries removed"
            );
            if let Some(sender) = notices.as_ref()
                && gate.allow(Instant::now())
            {
                let delivered = sender
                    .send(CacheCleanupNotice { removed, remaining })
                    .unwrap_or(0);
                debug!(event = "suyuan.cache.cleanup_notice", delivered);
            }
        }
    })
}
