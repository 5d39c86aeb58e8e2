use super::ParsedResult;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    Found(ParsedResult),
    NotFound,
}

/// Probe outcomes remembered for the lifetime of one resolver session.
#[derive(Clone, Default)]
pub struct ResultCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, filename: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        let entry = entries.get(filename).cloned();
        if entry.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        entry
    }

    pub async fn put_found(&self, result: ParsedResult) {
        let mut entries = self.entries.write().await;
        entries.insert(result.filename.clone(), CacheEntry::Found(result));
    }

    pub async fn put_not_found(&self, filename: &str) {
        let mut entries = self.entries.write().await;
        // a positive answer is never downgraded
        entries
            .entry(filename.to_string())
            .or_insert(CacheEntry::NotFound);
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        debug!("Clearing {} cached probe results", entries.len());
        entries.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.read().await.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
