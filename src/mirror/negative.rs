// src/mirror/negative.rs

//! Negative result caching for upstream lookups
//!
//! When an id isn't found upstream, the "not found" result can be cached to
//! avoid repeatedly hitting upstream for the same non-existent package.
//! Entries are keyed by lowercased id and expire after a TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cache entry for negative results
#[derive(Debug, Clone)]
struct NegativeEntry {
    created_at: Instant,
    hit_count: u64,
}

/// Cache of package ids recently observed as unknown upstream
pub struct NegativeCache {
    entries: RwLock<HashMap<String, NegativeEntry>>,
    ttl: Duration,
}

impl NegativeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Check whether an id was recently marked unknown, recording a hit
    ///
    /// Expired entries are removed on the way out.
    pub async fn check_and_record_hit(&self, id: &str) -> bool {
        let key = id.to_ascii_lowercase();
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(&key) {
            if entry.created_at.elapsed() < self.ttl {
                entry.hit_count += 1;
                return true;
            }
            entries.remove(&key);
        }
        false
    }

    /// Mark an id as unknown upstream
    pub async fn mark_negative(&self, id: &str) {
        let mut entries = self.entries.write().await;
        entries.insert(
            id.to_ascii_lowercase(),
            NegativeEntry {
                created_at: Instant::now(),
                hit_count: 0,
            },
        );
    }

    /// Remove an id from the cache (it became known upstream)
    pub async fn invalidate(&self, id: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(&id.to_ascii_lowercase());
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
