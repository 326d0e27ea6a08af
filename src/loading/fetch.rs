// Copyright (c) 2024 Mike Tsao

use crate::error::LoadError;
use core::fmt::Debug;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Turns a URL into the bytes of an encoded asset. Fetching happens on a
/// blocking worker thread, so implementations may block.
pub trait FetchesAssets: Debug + Send + Sync {
    /// Returns the asset's bytes, or [LoadError::Fetch] if there aren't any.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError>;
}

/// Reads assets from the filesystem. `file://` URLs name a path directly;
/// anything else is taken relative to the fetcher's root.
#[derive(Debug)]
pub struct FileFetcher {
    root: PathBuf,
}
impl FileFetcher {
    /// A fetcher that resolves relative URLs against `root`.
    pub fn new_with(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    #[allow(missing_docs)]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `url` lives on disk.
    pub fn resolve(&self, url: &str) -> PathBuf {
        match url.strip_prefix("file://") {
            Some(path) => PathBuf::from(path),
            None => self.root.join(url),
        }
    }
}
impl FetchesAssets for FileFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let path = self.resolve(url);
        std::fs::read(&path).map_err(|e| LoadError::Fetch {
            url: url.to_string(),
            reason: format!("{}: {e}", path.display()),
        })
    }
}

/// Serves assets that are already in memory, such as ones compiled into the
/// binary with `include_bytes!`.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    assets: FxHashMap<String, Vec<u8>>,
}
impl MemoryFetcher {
    /// Adds (or replaces) the bytes served for `url`.
    pub fn insert(&mut self, url: &str, bytes: Vec<u8>) {
        self.assets.insert(url.to_string(), bytes);
    }

    /// Builder-style [MemoryFetcher::insert()].
    pub fn with_asset(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.insert(url, bytes);
        self
    }

    #[allow(missing_docs)]
    pub fn contains(&self, url: &str) -> bool {
        self.assets.contains_key(url)
    }
}
impl FetchesAssets for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        self.assets.get(url).cloned().ok_or_else(|| LoadError::Fetch {
            url: url.to_string(),
            reason: "no such asset".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_urls_bypass_the_root() {
        let fetcher = FileFetcher::new_with(Path::new("/assets"));
        assert_eq!(
            fetcher.resolve("sfx/click.wav"),
            PathBuf::from("/assets/sfx/click.wav")
        );
        assert_eq!(
            fetcher.resolve("file:///tmp/click.wav"),
            PathBuf::from("/tmp/click.wav")
        );
    }

    #[test]
    fn missing_files_are_fetch_errors() {
        let fetcher = FileFetcher::new_with(Path::new("/nonexistent-asset-root"));
        assert!(matches!(
            fetcher.fetch("nope.wav"),
            Err(LoadError::Fetch { url, .. }) if url == "nope.wav"
        ));
    }

    #[test]
    fn memory_fetcher_serves_what_it_holds() {
        let fetcher = MemoryFetcher::default().with_asset("a", vec![1, 2, 3]);
        assert!(fetcher.contains("a"));
        assert_eq!(fetcher.fetch("a"), Ok(vec![1, 2, 3]));
        assert!(fetcher.fetch("b").is_err());
    }
}
