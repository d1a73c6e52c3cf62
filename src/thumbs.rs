use std::sync::Arc;

use futures_util::future::BoxFuture;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::error::TimelineError;
use crate::host::{HostResult, ShowHost, Thumbnail};

/// Default maximum number of decoded thumbnails kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;
/// Default number of thumbnail renders allowed in flight at once.
pub const DEFAULT_FETCH_PERMITS: usize = 6;

/// Cache identity for one rendered thumbnail. `revision` changes whenever
/// the effect's parameters or bounds change, so a response rendered for an
/// older revision can never be served for a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThumbKey {
    pub sequence: usize,
    pub track: usize,
    pub effect: usize,
    pub revision: u64,
}

/// The slice of the host the cache needs. Blanket-implemented for every
/// `ShowHost`; tests fake this directly.
pub trait ThumbnailSource {
    fn render_effect_thumbnail(
        &self,
        sequence: usize,
        track: usize,
        effect: usize,
        time_samples: usize,
        pixel_rows: usize,
    ) -> BoxFuture<'_, HostResult<Option<Thumbnail>>>;
}

impl<T: ShowHost + ?Sized> ThumbnailSource for T {
    fn render_effect_thumbnail(
        &self,
        sequence: usize,
        track: usize,
        effect: usize,
        time_samples: usize,
        pixel_rows: usize,
    ) -> BoxFuture<'_, HostResult<Option<Thumbnail>>> {
        ShowHost::render_effect_thumbnail(self, sequence, track, effect, time_samples, pixel_rows)
    }
}

/// LRU-bounded thumbnail cache with a bounded-concurrency fetch gate.
///
/// A constructible object owned by whoever composes the timeline — not a
/// process-wide singleton — so tests and multiple editor instances get
/// isolated caches. Consumers call `fetch` lazily when a segment scrolls
/// into view and simply drop the future on unmount: the semaphore permit
/// is RAII-held, so a cancelled fetch always releases its slot.
pub struct ThumbnailCache {
    entries: Mutex<IndexMap<ThumbKey, Arc<Thumbnail>>>,
    capacity: usize,
    gate: Semaphore,
}

impl ThumbnailCache {
    pub fn new(capacity: usize, permits: usize) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            capacity: capacity.max(1),
            gate: Semaphore::new(permits.max(1)),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_FETCH_PERMITS)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Cache lookup. A hit is moved to the back of the eviction order.
    pub fn get(&self, key: ThumbKey) -> Option<Arc<Thumbnail>> {
        let mut entries = self.entries.lock();
        let thumb = entries.shift_remove(&key)?;
        entries.insert(key, Arc::clone(&thumb));
        Some(thumb)
    }

    /// Drop every cached revision for effects of the given sequence.
    /// Called when the sequence is reloaded wholesale.
    pub fn invalidate_sequence(&self, sequence: usize) {
        self.entries.lock().retain(|k, _| k.sequence != sequence);
    }

    /// Fetch a thumbnail, rendering through the host at most once per key.
    /// `Ok(None)` means the effect no longer exists host-side; that result
    /// is not cached (the caller's key was already stale).
    pub async fn fetch<S: ThumbnailSource + ?Sized>(
        &self,
        source: &S,
        key: ThumbKey,
        time_samples: usize,
        pixel_rows: usize,
    ) -> HostResult<Option<Arc<Thumbnail>>> {
        if let Some(hit) = self.get(key) {
            return Ok(Some(hit));
        }

        let _permit = self.gate.acquire().await.map_err(|_| TimelineError::Host {
            message: "thumbnail gate closed".into(),
        })?;

        // Another consumer may have rendered this key while we waited.
        if let Some(hit) = self.get(key) {
            return Ok(Some(hit));
        }

        let rendered = source
            .render_effect_thumbnail(key.sequence, key.track, key.effect, time_samples, pixel_rows)
            .await
            .inspect_err(|err| log::warn!("thumbnail render failed: {err}"))?;
        let Some(thumbnail) = rendered else {
            return Ok(None);
        };

        let thumbnail = Arc::new(thumbnail);
        let mut entries = self.entries.lock();
        entries.insert(key, Arc::clone(&thumbnail));
        while entries.len() > self.capacity {
            entries.shift_remove_index(0);
        }
        Ok(Some(thumbnail))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingSource {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
        /// Calls up to this index never resolve (simulates a hung render).
        hang_first: usize,
    }

    impl CountingSource {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay,
                hang_first: 0,
            }
        }
    }

    impl ThumbnailSource for CountingSource {
        fn render_effect_thumbnail(
            &self,
            _sequence: usize,
            _track: usize,
            effect: usize,
            time_samples: usize,
            pixel_rows: usize,
        ) -> BoxFuture<'_, HostResult<Option<Thumbnail>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let hang = call < self.hang_first;
            let delay = self.delay;
            async move {
                if hang {
                    futures_util::future::pending::<()>().await;
                }
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(Some(Thumbnail {
                    width: time_samples,
                    height: pixel_rows,
                    pixels: vec![effect as u8; time_samples * pixel_rows * 4],
                }))
            }
            .boxed()
        }
    }

    fn key(effect: usize) -> ThumbKey {
        ThumbKey {
            sequence: 0,
            track: 0,
            effect,
            revision: 1,
        }
    }

    #[tokio::test]
    async fn second_fetch_hits_cache() {
        let source = CountingSource::new(Duration::ZERO);
        let cache = ThumbnailCache::new(8, 2);

        let first = cache.fetch(&source, key(1), 16, 4).await.unwrap().unwrap();
        let second = cache.fetch(&source, key(1), 16, 4).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn revision_change_misses_cache() {
        let source = CountingSource::new(Duration::ZERO);
        let cache = ThumbnailCache::new(8, 2);

        cache.fetch(&source, key(1), 16, 4).await.unwrap();
        let stale = ThumbKey {
            revision: 2,
            ..key(1)
        };
        cache.fetch(&source, stale, 16, 4).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn oldest_entry_evicts_at_capacity() {
        let source = CountingSource::new(Duration::ZERO);
        let cache = ThumbnailCache::new(2, 2);

        cache.fetch(&source, key(1), 16, 4).await.unwrap();
        cache.fetch(&source, key(2), 16, 4).await.unwrap();
        // Touch key 1 so key 2 is now the eviction candidate.
        assert!(cache.get(key(1)).is_some());
        cache.fetch(&source, key(3), 16, 4).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.get(key(1)).is_some());
        assert!(cache.get(key(2)).is_none());
        assert!(cache.get(key(3)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_fetches_respect_permit_bound() {
        let source = Arc::new(CountingSource::new(Duration::from_millis(10)));
        let cache = Arc::new(ThumbnailCache::new(32, 2));

        let mut tasks = Vec::new();
        for effect in 0..6 {
            let cache = Arc::clone(&cache);
            let source = Arc::clone(&source);
            tasks.push(tokio::spawn(async move {
                cache.fetch(source.as_ref(), key(effect), 16, 4).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(source.calls.load(Ordering::SeqCst), 6);
        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn cancelled_fetch_releases_its_permit() {
        let source = Arc::new(CountingSource {
            hang_first: 1,
            ..CountingSource::new(Duration::ZERO)
        });
        let cache = Arc::new(ThumbnailCache::new(8, 1));

        // First fetch takes the only permit and hangs.
        let hung = {
            let cache = Arc::clone(&cache);
            let source = Arc::clone(&source);
            tokio::spawn(async move { cache.fetch(source.as_ref(), key(1), 16, 4).await })
        };
        tokio::task::yield_now().await;
        // Unmount: drop the in-flight fetch.
        hung.abort();
        let _ = hung.await;

        // The permit came back; a new fetch completes.
        let result = cache.fetch(source.as_ref(), key(2), 16, 4).await.unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn missing_effect_is_not_cached() {
        struct MissingSource;
        impl ThumbnailSource for MissingSource {
            fn render_effect_thumbnail(
                &self,
                _sequence: usize,
                _track: usize,
                _effect: usize,
                _time_samples: usize,
                _pixel_rows: usize,
            ) -> BoxFuture<'_, HostResult<Option<Thumbnail>>> {
                async { Ok(None) }.boxed()
            }
        }

        let cache = ThumbnailCache::new(8, 2);
        let result = cache.fetch(&MissingSource, key(1), 16, 4).await.unwrap();
        assert!(result.is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn invalidate_sequence_drops_only_that_sequence() {
        let source = CountingSource::new(Duration::ZERO);
        let cache = ThumbnailCache::new(8, 2);
        cache.fetch(&source, key(1), 16, 4).await.unwrap();
        let other = ThumbKey {
            sequence: 1,
            ..key(9)
        };
        cache.fetch(&source, other, 16, 4).await.unwrap();

        cache.invalidate_sequence(0);
        assert!(cache.get(key(1)).is_none());
        assert!(cache.get(other).is_some());
    }
}
