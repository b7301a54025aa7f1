//! On-disk cache of raw vendor responses, keyed by source URL.
//!
//! One file per URL: `<dir>/<hash12>.json`, holding the vendor body exactly
//! as received so normalization changes never invalidate entries. Freshness
//! is judged from the file's modification time at read; stale files are
//! left in place and overwritten by the next write.
//!
//! There is no cross-process locking. Concurrent writers for the same URL
//! race and the last rename wins, which is fine for a cost-saving cache.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};

use crate::error::ScraperError;

/// Number of hex characters of the URL digest used as the file stem.
const KEY_HEX_LEN: usize = 12;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

    /// Creates a cache rooted at `dir`. The directory is created lazily on
    /// the first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stable short key for `url`: the first 12 hex chars of its SHA-256.
    #[must_use]
    pub fn cache_key(url: &str) -> String {
        let digest = Sha256::digest(url.as_bytes());
        let mut hex = format!("{digest:x}");
        hex.truncate(KEY_HEX_LEN);
        hex
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Age of the entry for `key`, or `None` when there is no entry.
    pub async fn age(&self, key: &str) -> Option<Duration> {
        let metadata = tokio::fs::metadata(self.path_for(key)).await.ok()?;
        let modified = metadata.modified().ok()?;
        Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        )
    }

    /// Returns the cached body for `key` if present and younger than the TTL.
    ///
    /// Unreadable entries are treated as misses.
    pub async fn get(&self, key: &str) -> Option<String> {
        let age = self.age(key).await?;
        if age > self.ttl {
            tracing::debug!(
                key,
                age_secs = age.as_secs(),
                ttl_secs = self.ttl.as_secs(),
                "cache entry expired"
            );
            return None;
        }

        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!(key, error = %e, "unreadable cache entry, treating as miss");
                None
            }
        }
    }

    /// Stores `body` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Cache`] if the directory cannot be created or
    /// the file cannot be written.
    pub async fn set(&self, key: &str, body: &str) -> Result<(), ScraperError> {
        let cache_err = |path: &Path, source| ScraperError::Cache {
            path: path.display().to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| cache_err(&self.dir, e))?;

        // Write-then-rename so readers never observe a half-written file.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(
            "{key}.json.{}.{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| cache_err(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| cache_err(&path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_short_stable_hex() {
        let a = ResponseCache::cache_key("https://www.amazon.com/dp/B08N5WRWNW");
        let b = ResponseCache::cache_key("https://www.amazon.com/dp/B08N5WRWNW");
        let c = ResponseCache::cache_key("https://www.amazon.com/dp/B000000001");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn get_misses_when_nothing_written() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path().join("apify"), ResponseCache::DEFAULT_TTL);
        assert!(cache.get("abc123abc123").await.is_none());
        assert!(cache.age("abc123abc123").await.is_none());
    }

    #[tokio::test]
    async fn set_creates_directory_lazily_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("apify");
        let cache = ResponseCache::new(&root, ResponseCache::DEFAULT_TTL);
        assert!(!root.exists());

        let key = ResponseCache::cache_key("https://www.aliexpress.com/item/1.html");
        cache.set(&key, r#"[{"title":"Lamp"}]"#).await.unwrap();

        assert!(root.join(format!("{key}.json")).exists());
        assert_eq!(
            cache.get(&key).await.as_deref(),
            Some(r#"[{"title":"Lamp"}]"#)
        );
    }

    #[tokio::test]
    async fn set_overwrites_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), ResponseCache::DEFAULT_TTL);
        cache.set("k", "first").await.unwrap();
        cache.set("k", "second").await.unwrap();
        assert_eq!(cache.get("k").await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss_but_not_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Duration::from_millis(1));
        cache.set("k", "body").await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(cache.get("k").await.is_none());
        assert!(dir.path().join("k.json").exists());
    }
}
