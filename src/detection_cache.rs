//! Time-bounded cache of auto-detected check tiers.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use strum::IntoEnumIterator;
use tokio::sync::Mutex;

use crate::config::DETECTION_CACHE_TTL;
use crate::models::Tier;

struct DetectionEntry {
    tier: Tier,
    detected_at: Instant,
}

/// Snapshot of the cache contents, counted per tier.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub size: usize,
    pub tiers: HashMap<Tier, usize>,
}

/// Maps a URL to its previously detected tier for a fixed TTL.
///
/// Entries are never actively evicted: a stale entry is simply treated
/// as a miss on read and overwritten by the next insert. At most one
/// entry exists per URL. Safe to share across concurrent callers;
/// duplicate concurrent detection of the same URL is tolerated (the last
/// insert wins).
pub struct DetectionCache {
    entries: Mutex<HashMap<String, DetectionEntry>>,
    ttl: Duration,
}

impl DetectionCache {
    pub fn new() -> Self {
        Self::with_ttl(DETECTION_CACHE_TTL)
    }

    /// Cache with a custom TTL, for callers that re-detect on a faster
    /// schedule (and for tests).
    pub fn with_ttl(ttl: Duration) -> Self {
        DetectionCache {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the cached tier for `url` if a fresh entry exists.
    pub async fn get(&self, url: &str) -> Option<Tier> {
        let entries = self.entries.lock().await;
        entries.get(url).and_then(|entry| {
            if entry.detected_at.elapsed() < self.ttl {
                Some(entry.tier)
            } else {
                None
            }
        })
    }

    /// Stores a detection result, replacing any previous entry for the URL.
    pub async fn insert(&self, url: &str, tier: Tier) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            url.to_string(),
            DetectionEntry {
                tier,
                detected_at: Instant::now(),
            },
        );
    }

    /// Clears every entry, forcing re-detection on the next AUTO check.
    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.lock().await;
        let cleared = entries.len();
        entries.clear();
        log::info!("Detection cache cleared ({cleared} entries)");
    }

    /// Counts entries per tier. Stale entries are still counted; they
    /// occupy space until overwritten.
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().await;
        let mut tiers: HashMap<Tier, usize> = Tier::iter().map(|tier| (tier, 0)).collect();
        for entry in entries.values() {
            if let Some(count) = tiers.get_mut(&entry.tier) {
                *count += 1;
            }
        }
        CacheStats {
            size: entries.len(),
            tiers,
        }
    }
}

impl Default for DetectionCache {
    fn default() -> Self {
        Self::new()
    }
}
