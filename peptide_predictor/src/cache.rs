// src/cache.rs

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::uniprot::ProteinRecord;

/// Protein lookups stay fresh for a day; older entries count as absent.
pub const CACHE_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

struct CacheEntry {
    stored_at: Instant,
    record: ProteinRecord,
}

/// Read-after-write key/value store for resolved proteins. Injected into the
/// resolver so the pipeline itself stays pure and testable offline.
pub struct ProteinCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl Default for ProteinCache {
    fn default() -> Self {
        Self::with_ttl(CACHE_DURATION)
    }
}

impl ProteinCache {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Returns a fresh entry or nothing; stale entries are never served.
    pub fn get(&self, key: &str) -> Option<&ProteinRecord> {
        let entry = self.entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            Some(&entry.record)
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: &str, record: ProteinRecord) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                stored_at: Instant::now(),
                record,
            },
        );
    }
}
