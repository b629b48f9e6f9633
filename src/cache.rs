use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub body: String,
    pub etag: String,
}

#[derive(Debug)]
struct Entry {
    page: CachedPage,
    stored_at: Instant,
}

/// Rendered pages keyed by path plus canonical query (`/?view=all`).
#[derive(Debug)]
pub struct PageCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<CachedPage> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.page.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, body: String) -> CachedPage {
        let page = CachedPage {
            etag: etag_for(&body),
            body,
        };
        if !self.ttl.is_zero() {
            self.entries().insert(
                key.into(),
                Entry {
                    page: page.clone(),
                    stored_at: Instant::now(),
                },
            );
        }
        page
    }

    /// Drops every variant of `path`, whatever its query string.
    ///
    /// Paths compare percent-decoded, so `/events/café` also clears a page
    /// stored under `/events/caf%C3%A9`.
    pub fn revalidate(&self, path: &str) -> usize {
        let path = normalize_path(path);
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| normalize_path(key) != path);
        let removed = before - entries.len();
        debug!(path = %path, removed, "revalidated cached pages");
        removed
    }

    pub fn revalidate_all(&self) -> usize {
        let mut entries = self.entries();
        let removed = entries.len();
        entries.clear();
        debug!(removed, "cleared page cache");
        removed
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Strong validator over the exact response body.
pub fn etag_for(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("\"{}\"", &digest[..32])
}

/// True when an `If-None-Match` header value covers `etag`.
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match
        .split(',')
        .map(|candidate| candidate.trim().trim_start_matches("W/"))
        .any(|candidate| candidate == "*" || candidate == etag)
}

fn normalize_path(path: &str) -> String {
    let path = path.trim();
    let path = path.split('?').next().unwrap_or(path);
    let decoded = urlencoding::decode(path)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| path.to_string());
    match decoded.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = PageCache::new(Duration::from_secs(300));
        let stored = cache.insert("/?view=all", "<p>grid</p>".to_string());
        assert_eq!(cache.get("/?view=all"), Some(stored));

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(cache.get("/?view=all"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn revalidate_clears_all_query_variants_of_a_path() {
        let cache = PageCache::new(Duration::from_secs(60));
        cache.insert("/", "home".to_string());
        cache.insert("/?view=all", "all".to_string());
        cache.insert("/events/jam-fest", "detail".to_string());

        assert_eq!(cache.revalidate("/"), 2);
        assert!(cache.get("/events/jam-fest").is_some());
        assert_eq!(cache.revalidate("/events/jam-fest/"), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn revalidate_matches_encoded_and_decoded_paths() {
        let cache = PageCache::new(Duration::from_secs(60));
        cache.insert("/events/caf%C3%A9%20jam", "detail".to_string());
        cache.insert("/events/other", "other".to_string());

        assert_eq!(cache.revalidate("/events/café jam"), 1);
        assert!(cache.get("/events/other").is_some());

        cache.insert("/events/caf%C3%A9%20jam", "detail".to_string());
        assert_eq!(cache.revalidate("/events/caf%c3%a9%20jam/"), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_ttl_disables_storage() {
        let cache = PageCache::new(Duration::ZERO);
        let page = cache.insert("/", "home".to_string());
        assert_eq!(page.etag, etag_for("home"));
        assert!(cache.get("/").is_none());
    }

    #[test]
    fn etags_are_stable_and_matchable() {
        let etag = etag_for("body");
        assert_eq!(etag, etag_for("body"));
        assert_ne!(etag, etag_for("other"));
        assert!(etag_matches(&format!("W/{etag}, \"abc\""), &etag));
        assert!(etag_matches("*", &etag));
        assert!(!etag_matches("\"abc\"", &etag));
    }
}
