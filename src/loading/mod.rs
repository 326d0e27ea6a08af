// Copyright (c) 2024 Mike Tsao

//! Fetching and decoding audio assets, with a per-URL cache.

pub use decode::{DecodesAudio, SymphoniaDecoder, WavDecoder};
pub use fetch::{FetchesAssets, FileFetcher, MemoryFetcher};

mod decode;
mod fetch;

use crate::{error::LoadError, graph::AudioBuffer};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

type CacheSlot = Arc<OnceCell<Arc<AudioBuffer>>>;

#[derive(Debug)]
struct LoaderInner {
    fetcher: Arc<dyn FetchesAssets>,
    decoder: Arc<dyn DecodesAudio>,
    cache: Mutex<FxHashMap<String, CacheSlot>>,
}

/// Loads audio by URL. Each URL is fetched and decoded at most once;
/// concurrent requests for the same URL wait on the same work, and later
/// requests get the cached buffer. A failed load isn't cached, so it can be
/// retried.
///
/// Cloning is cheap, and clones share one cache.
#[derive(Clone, Debug)]
pub struct AssetLoader {
    inner: Arc<LoaderInner>,
}
impl Default for AssetLoader {
    fn default() -> Self {
        Self::new_with(
            Arc::new(FileFetcher::new_with(std::path::Path::new("."))),
            Arc::new(SymphoniaDecoder::default()),
        )
    }
}
impl AssetLoader {
    #[allow(missing_docs)]
    pub fn new_with(fetcher: Arc<dyn FetchesAssets>, decoder: Arc<dyn DecodesAudio>) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                fetcher,
                decoder,
                cache: Default::default(),
            }),
        }
    }

    fn slot(&self, url: &str) -> CacheSlot {
        let mut cache = self
            .inner
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(cache.entry(url.to_string()).or_default())
    }

    /// Fetches and decodes `url`, or returns the buffer from an earlier load.
    /// The blocking work happens on tokio's blocking pool.
    pub async fn load(&self, url: &str) -> Result<Arc<AudioBuffer>, LoadError> {
        let slot = self.slot(url);
        if let Some(buffer) = slot.get() {
            log::debug!("{url}: cache hit");
            return Ok(Arc::clone(buffer));
        }
        let result = slot
            .get_or_try_init(|| async {
                let inner = Arc::clone(&self.inner);
                let owned_url = url.to_string();
                let handle = tokio::task::spawn_blocking(move || {
                    let bytes = inner.fetcher.fetch(&owned_url)?;
                    inner.decoder.decode(&owned_url, bytes).map(Arc::new)
                });
                match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(LoadError::Interrupted(format!("{url}: {e}"))),
                }
            })
            .await;
        match result {
            Ok(buffer) => {
                log::debug!(
                    "{url}: loaded {} frames x {} channels",
                    buffer.length(),
                    buffer.number_of_channels()
                );
                Ok(Arc::clone(buffer))
            }
            Err(e) => {
                log::warn!("{url}: {e}");
                self.release_failed_slot(url, &slot);
                Err(e)
            }
        }
    }

    // Drops an empty slot left behind by a failed load, unless another
    // caller is still waiting on it.
    fn release_failed_slot(&self, url: &str, slot: &CacheSlot) {
        let mut cache = self
            .inner
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let is_ours = cache.get(url).is_some_and(|existing| {
            Arc::ptr_eq(existing, slot)
                && !existing.initialized()
                && Arc::strong_count(slot) == 2
        });
        if is_ours {
            cache.remove(url);
        }
    }

    /// Whether `url` has been successfully loaded.
    pub fn is_cached(&self, url: &str) -> bool {
        self.inner
            .cache
            .lock()
            .map(|cache| cache.get(url).is_some_and(|slot| slot.initialized()))
            .unwrap_or_default()
    }

    /// Drops the cached buffer for `url`. Anything already holding it keeps
    /// its `Arc`.
    pub fn forget(&self, url: &str) -> bool {
        self.inner
            .cache
            .lock()
            .map(|mut cache| cache.remove(url).is_some())
            .unwrap_or_default()
    }

    /// Empties the cache.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.inner.cache.lock() {
            cache.clear();
        }
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.inner.cache.lock().map(|cache| cache.len()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::{decode::tests::wav_bytes, *};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct CountingDecoder {
        count: Arc<AtomicUsize>,
    }
    impl DecodesAudio for CountingDecoder {
        fn decode(&self, url: &str, bytes: Vec<u8>) -> Result<AudioBuffer, LoadError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(10));
            WavDecoder::default().decode(url, bytes)
        }
    }

    fn counting_loader() -> (AssetLoader, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::default());
        let fetcher = MemoryFetcher::default()
            .with_asset("click.wav", wav_bytes(44100, 1, &[0, 100, 200]))
            .with_asset("broken.wav", vec![9, 9, 9]);
        (
            AssetLoader::new_with(
                Arc::new(fetcher),
                Arc::new(CountingDecoder {
                    count: Arc::clone(&count),
                }),
            ),
            count,
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_loads_decode_once() {
        let (loader, count) = counting_loader();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let loader = loader.clone();
                tokio::spawn(async move { loader.load("click.wav").await })
            })
            .collect();
        let mut buffers = Vec::default();
        for handle in handles {
            buffers.push(handle.await.unwrap().unwrap());
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(buffers.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(loader.is_cached("click.wav"));

        let again = loader.load("click.wav").await.unwrap();
        assert!(Arc::ptr_eq(&again, &buffers[0]));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let (loader, count) = counting_loader();
        assert!(matches!(
            loader.load("broken.wav").await,
            Err(LoadError::Decode { .. })
        ));
        assert!(!loader.is_cached("broken.wav"));
        assert!(loader.load("broken.wav").await.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 2);

        assert!(matches!(
            loader.load("missing.wav").await,
            Err(LoadError::Fetch { .. })
        ));
        // The fetch failed, so the decoder never ran.
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_urls_leave_nothing_in_the_cache() {
        let (loader, _) = counting_loader();
        for _ in 0..10 {
            assert!(loader.load("missing.wav").await.is_err());
            assert!(loader.load("broken.wav").await.is_err());
        }
        assert_eq!(loader.slot_count(), 0);

        loader.load("click.wav").await.unwrap();
        assert_eq!(loader.slot_count(), 1);
    }

    #[tokio::test]
    async fn forget_forces_a_reload() {
        let (loader, count) = counting_loader();
        let first = loader.load("click.wav").await.unwrap();
        assert!(loader.forget("click.wav"));
        assert!(!loader.forget("click.wav"));
        let second = loader.load("click.wav").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        loader.clear();
        assert!(!loader.is_cached("click.wav"));
    }
}
