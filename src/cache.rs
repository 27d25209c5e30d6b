use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::fs;
use tokio::sync::Mutex as AsyncMutex;

/// Subdirectory appended to the platform temp dir by [`DiskCache::in_temp_dir`].
const CACHE_SUBDIR: &str = "imagecache";

/// Disk cache mapping URL fingerprints to files under one root directory.
///
/// An entry holds the raw fetched bytes verbatim, written once after the
/// first successful fetch for that URL and read back on every later request
/// while the file exists. Entries carry no TTL or checksum and are never
/// expired by this crate; cleanup of the cache directory is an external
/// concern.
#[derive(Clone, Debug)]
pub struct DiskCache {
    root: PathBuf,
    // One async lock per fingerprint so concurrent misses for the same URL
    // fetch and write once.
    inflight: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl DiskCache {
    /// Cache rooted at an explicit directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Cache rooted at `<platform temp dir>/imagecache`.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir().join(CACHE_SUBDIR))
    }

    /// Deterministic path of the entry for `url`, whether or not the file
    /// currently exists.
    pub fn entry_path(&self, url: &str) -> PathBuf {
        self.root.join(fingerprint(url))
    }

    /// Returns the entry's bytes, or `None` when no entry exists for `url`.
    ///
    /// I/O errors other than the file being absent propagate, so a broken
    /// cache is distinguishable from a cold one.
    pub(crate) async fn read(&self, url: &str) -> io::Result<Option<Bytes>> {
        match fs::read(self.entry_path(url)).await {
            Ok(bytes) => Ok(Some(bytes.into())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Stores `bytes` as the entry for `url`, replacing any previous entry.
    ///
    /// Bytes land in a sibling temp file first and are renamed over the
    /// final path, so readers only ever observe complete entries. Creating
    /// the root is idempotent under concurrent writers.
    pub(crate) async fn write(&self, url: &str, bytes: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.root).await?;
        let path = self.entry_path(url);
        let staging = path.with_extension("part");
        fs::write(&staging, bytes).await?;
        fs::rename(&staging, &path).await
    }

    /// Lock guarding the miss-fetch-write sequence for `url`'s entry.
    ///
    /// Callers drop their handle and then call [`Self::evict_entry_lock`] so
    /// the map does not retain one lock per URL ever fetched.
    pub(crate) fn entry_lock(&self, url: &str) -> Arc<AsyncMutex<()>> {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inflight.entry(fingerprint(url)).or_default().clone()
    }

    /// Removes `url`'s in-flight lock once no fetch holds it anymore.
    ///
    /// The map's own `Arc` being the only remaining reference means every
    /// handle from [`Self::entry_lock`] has been dropped; handing out and
    /// evicting both take the map mutex, so the count cannot change
    /// underneath the check.
    pub(crate) fn evict_entry_lock(&self, url: &str) {
        let key = fingerprint(url);
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if inflight
            .get(&key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            inflight.remove(&key);
        }
    }
}

/// FNV-1a 64-bit fingerprint of `url`, rendered as fixed-width lowercase hex.
///
/// A pure function of the URL, stable across processes, so cache entries
/// survive restarts. Distinct URLs may in principle collide; that risk is
/// accepted, the worst case being a wrong payload served for the colliding
/// URL until its entry is cleaned up.
fn fingerprint(url: &str) -> String {
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET_BASIS;
    for byte in url.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    format!("{hash:016x}")
}
