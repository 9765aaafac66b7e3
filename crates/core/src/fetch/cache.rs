use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::transport::RawResponse;

/// A stored response and when it was fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    /// HTTP status the response was received with.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// When the live request completed.
    pub fetched_at: DateTime<Utc>,
}

/// URL-keyed response store, optionally persisted to a JSON file.
///
/// Reads and writes go through one lock; the fetcher uses it strictly
/// read-then-write within a run.
pub struct ResponseCache {
    inner: Mutex<Inner>,
}

struct Inner {
    path: Option<PathBuf>,
    ttl: Option<Duration>,
    entries: HashMap<String, CachedResponse>,
}

impl Inner {
    /// Remove every entry older than the TTL, returning how many were removed.
    fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.fetched_at <= ttl);
        before - self.entries.len()
    }
}

impl ResponseCache {
    /// Cache that lives only for the current process.
    pub fn in_memory(ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                path: None,
                ttl,
                entries: HashMap::new(),
            }),
        }
    }

    /// Open the cache file at `path`, starting empty when it does not exist.
    ///
    /// An unreadable file is discarded with a warning rather than failing the run.
    pub fn open(path: impl Into<PathBuf>, ttl: Option<Duration>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            match read_entries(&path) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("discarding unreadable response cache {}: {err:#}", path.display());
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };
        let mut inner = Inner {
            path: Some(path),
            ttl,
            entries,
        };
        let expired = inner.prune(Utc::now());
        debug!(entries = inner.entries.len(), expired, "opened response cache");
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Look up a live entry for `url`, evicting it if it has expired.
    pub fn get(&self, url: &str) -> Option<CachedResponse> {
        self.get_at(url, Utc::now())
    }

    fn get_at(&self, url: &str, now: DateTime<Utc>) -> Option<CachedResponse> {
        let mut inner = self.inner.lock();
        let ttl = inner.ttl;
        let expired = match (inner.entries.get(url), ttl) {
            (None, _) => return None,
            (Some(entry), Some(ttl)) => now - entry.fetched_at > ttl,
            (Some(_), None) => false,
        };
        if expired {
            inner.entries.remove(url);
            return None;
        }
        inner.entries.get(url).cloned()
    }

    /// Store `response` for `url` and persist the cache if it is file-backed.
    ///
    /// Expired entries are dropped before writing, so the file only holds
    /// responses that can still be served.
    pub fn put(&self, url: &str, response: &RawResponse) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.prune(Utc::now());
        inner.entries.insert(
            url.to_string(),
            CachedResponse {
                status: response.status,
                body: response.body.clone(),
                fetched_at: Utc::now(),
            },
        );
        match &inner.path {
            Some(path) => write_entries(path, &inner.entries),
            None => Ok(()),
        }
    }

    /// Drop a single entry.
    pub fn remove(&self, url: &str) {
        self.inner.lock().entries.remove(url);
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_entries(path: &Path) -> Result<HashMap<String, CachedResponse>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read cache {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse cache {}", path.display()))
}

fn write_entries(path: &Path, entries: &HashMap<String, CachedResponse>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create cache directory {}", parent.display()))?;
    }
    let serialized = serde_json::to_vec(entries).context("failed to serialize response cache")?;
    fs::write(path, serialized).with_context(|| format!("failed to write cache {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn entries_survive_reopen() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cache").join("responses.json");

        let cache = ResponseCache::open(&path, None)?;
        cache.put("https://example.com/a", &RawResponse::new(200, "<items/>"))?;
        drop(cache);

        let reopened = ResponseCache::open(&path, None)?;
        let entry = reopened.get("https://example.com/a").expect("cached entry");
        assert_eq!(entry.status, 200);
        assert_eq!(entry.body, "<items/>");
        assert!(reopened.get("https://example.com/b").is_none());
        Ok(())
    }

    #[test]
    fn expired_entries_are_evicted() {
        let cache = ResponseCache::in_memory(Some(Duration::hours(1)));
        cache
            .put("u", &RawResponse::new(200, "body"))
            .expect("in-memory put");

        assert!(cache.get_at("u", Utc::now()).is_some());
        assert!(cache.get_at("u", Utc::now() + Duration::hours(2)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn stale_entries_are_dropped_from_disk() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("responses.json");
        let month_ago = Utc::now() - Duration::days(30);
        let stale: HashMap<String, CachedResponse> = ["a", "b", "c"]
            .into_iter()
            .map(|url| {
                let entry = CachedResponse {
                    status: 200,
                    body: "<plays/>".to_string(),
                    fetched_at: month_ago,
                };
                (url.to_string(), entry)
            })
            .collect();
        write_entries(&path, &stale)?;

        let cache = ResponseCache::open(&path, Some(Duration::hours(12)))?;
        assert!(cache.is_empty());
        cache.put("d", &RawResponse::new(200, "<items/>"))?;

        let on_disk = read_entries(&path)?;
        assert_eq!(on_disk.len(), 1);
        assert!(on_disk.contains_key("d"));
        Ok(())
    }

    #[test]
    fn put_prunes_entries_that_expired_in_memory() {
        let cache = ResponseCache::in_memory(Some(Duration::hours(1)));
        cache.inner.lock().entries.insert(
            "old".to_string(),
            CachedResponse {
                status: 200,
                body: String::new(),
                fetched_at: Utc::now() - Duration::hours(3),
            },
        );
        cache
            .put("new", &RawResponse::new(200, "body"))
            .expect("in-memory put");
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new").is_some());
    }

    #[test]
    fn corrupt_file_starts_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("responses.json");
        fs::write(&path, "not json")?;

        let cache = ResponseCache::open(&path, None)?;
        assert!(cache.is_empty());
        Ok(())
    }
}
