use super::{
    ParsedResult, RemoteIndex, ResultDescriptor, ResultsError, TimeSlot, codec,
    generator::LOOKUP_EXTENSIONS,
};
use crate::ResultsConfig;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::cmp::Reverse;
use std::sync::Arc;
use std::time::{Duration, Instant, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info};

pub type SharedResultIndex = Arc<ResultIndex>;

#[derive(Debug, Clone)]
struct IndexedResult {
    result: ParsedResult,
    descriptor: ResultDescriptor,
}

struct Listing {
    built_at: Instant,
    entries: Vec<IndexedResult>,
}

/// Directory-backed result index, the server side of [`RemoteIndex`].
///
/// The listing is memoized for `listing_cache_seconds`; `clear_cache`
/// forces the next call to rescan.
pub struct ResultIndex {
    config: ResultsConfig,
    listing: RwLock<Option<Listing>>,
}

fn extension_rank(extension: &str) -> usize {
    LOOKUP_EXTENSIONS
        .iter()
        .position(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(LOOKUP_EXTENSIONS.len())
}

fn has_prefix(result: &ParsedResult) -> bool {
    result
        .filename
        .get(..codec::FILE_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(codec::FILE_PREFIX))
}

impl ResultIndex {
    pub fn new(config: ResultsConfig) -> Self {
        Self {
            config,
            listing: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ResultsConfig {
        &self.config
    }

    pub(crate) fn is_image(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        LOOKUP_EXTENSIONS
            .iter()
            .any(|ext| lower.ends_with(&format!(".{}", ext)))
    }

    async fn scan_directory(&self) -> Result<Vec<IndexedResult>, ResultsError> {
        let dir = &self.config.source_directory;
        debug!("Scanning result directory: {:?}", dir);

        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut found = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();

            if file_name.starts_with('.') || !self.is_image(&file_name) {
                continue;
            }

            let Some(result) = codec::parse_filename(&file_name) else {
                debug!("Skipping file that is not a result: {}", file_name);
                continue;
            };

            // follows symlinks, like the file server does
            let metadata = match tokio::fs::metadata(entry.path()).await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    debug!("Skipping unreadable entry {}: {}", file_name, e);
                    continue;
                }
            };

            let last_modified = metadata
                .modified()
                .ok()
                .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64);

            let descriptor =
                ResultDescriptor::from_result(&result).with_file_info(metadata.len(), last_modified);
            found.push(IndexedResult { result, descriptor });
        }

        found.sort_by(|a, b| {
            let key = |r: &ParsedResult| {
                (
                    Reverse(r.date_time()),
                    has_prefix(r),
                    extension_rank(&r.extension),
                )
            };
            key(&a.result)
                .cmp(&key(&b.result))
                .then_with(|| a.result.filename.cmp(&b.result.filename))
        });

        Ok(found)
    }

    async fn entries(&self) -> Result<Vec<IndexedResult>, ResultsError> {
        let ttl = Duration::from_secs(self.config.listing_cache_seconds);

        {
            let listing = self.listing.read().await;
            if let Some(listing) = listing.as_ref()
                && listing.built_at.elapsed() < ttl
            {
                return Ok(listing.entries.clone());
            }
        }

        let entries = self.scan_directory().await?;
        info!("Indexed {} result files", entries.len());

        let mut listing = self.listing.write().await;
        *listing = Some(Listing {
            built_at: Instant::now(),
            entries: entries.clone(),
        });

        Ok(entries)
    }

    /// Every result in the directory, newest first.
    pub async fn list(&self) -> Result<Vec<ResultDescriptor>, ResultsError> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .map(|e| e.descriptor)
            .collect())
    }

    /// The preferred file for `date` at `slot`: un-prefixed names first,
    /// then by extension preference.
    pub async fn find(
        &self,
        date: NaiveDate,
        slot: TimeSlot,
    ) -> Result<Option<ResultDescriptor>, ResultsError> {
        // entries are already in preference order
        Ok(self
            .entries()
            .await?
            .into_iter()
            .find(|e| e.result.date == date && e.result.time_slot == slot)
            .map(|e| e.descriptor))
    }

    pub async fn clear_cache(&self) {
        let mut listing = self.listing.write().await;
        if listing.take().is_some() {
            info!("Result index cache cleared");
        }
    }
}

#[async_trait]
impl RemoteIndex for ResultIndex {
    async fn list(&self) -> Result<Vec<ResultDescriptor>, ResultsError> {
        ResultIndex::list(self).await
    }

    async fn find(
        &self,
        date: NaiveDate,
        slot: TimeSlot,
    ) -> Result<Option<ResultDescriptor>, ResultsError> {
        ResultIndex::find(self, date, slot).await
    }

    async fn clear_cache(&self) -> Result<(), ResultsError> {
        ResultIndex::clear_cache(self).await;
        Ok(())
    }
}
