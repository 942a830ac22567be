//! Process-wide cache of the last discovered mirror.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

struct CachedMirror {
    url: String,
    stored_at: Instant,
}

/// Shared cache holding at most one mirror URL. Cheap to clone (Arc).
///
/// Only successful discoveries are stored. With no TTL an entry lives until
/// [`MirrorCache::clear`] or process exit.
#[derive(Clone)]
pub struct MirrorCache {
    inner: Arc<RwLock<Option<CachedMirror>>>,
    ttl: Option<Duration>,
}

impl MirrorCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            ttl,
        }
    }

    /// Build from the `cache_ttl_secs` setting, where `0` means no expiry.
    pub fn from_ttl_secs(secs: u64) -> Self {
        Self::new((secs > 0).then(|| Duration::from_secs(secs)))
    }

    /// Return the cached URL unless it has expired.
    pub async fn get(&self) -> Option<String> {
        let guard = self.inner.read().await;
        let entry = guard.as_ref()?;
        match self.ttl {
            Some(ttl) if entry.stored_at.elapsed() >= ttl => None,
            _ => Some(entry.url.clone()),
        }
    }

    pub async fn store(&self, url: String) {
        *self.inner.write().await = Some(CachedMirror {
            url,
            stored_at: Instant::now(),
        });
    }

    /// Drop the cached entry. Returns whether one was present.
    pub async fn clear(&self) -> bool {
        self.inner.write().await.take().is_some()
    }
}
