use super::{
    ParsedResult, RemoteIndex, ResultCache, TimeSlot,
    cache::CacheEntry,
    codec,
    generator::{CandidateQuery, SearchOrder, lookup_candidates},
    prober::{ExistenceProber, ProbeOutcome, probe_with_timeout},
    selection,
};
use crate::ResolverConfig;
use chrono::{Local, NaiveDate};
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub type SharedResolver = Arc<Resolver>;

#[derive(Debug, Clone, Copy)]
pub enum Today {
    System,
    Fixed(NaiveDate),
}

impl Today {
    pub fn date(&self) -> NaiveDate {
        match self {
            Today::System => Local::now().date_naive(),
            Today::Fixed(date) => *date,
        }
    }
}

#[derive(Default)]
struct ResolverState {
    displayed: Option<ParsedResult>,
    available: Vec<ParsedResult>,
    user_navigated: bool,
}

/// Results of one background scan, tagged with the generation that started it.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub generation: u64,
    pub results: Vec<ParsedResult>,
}

pub struct LoadOutcome {
    pub initial: Option<ParsedResult>,
    pub background: JoinHandle<Vec<ParsedResult>>,
}

pub struct Resolver {
    config: ResolverConfig,
    prober: Arc<dyn ExistenceProber>,
    remote: Option<Arc<dyn RemoteIndex>>,
    cache: ResultCache,
    today: Today,
    state: RwLock<ResolverState>,
    generation: AtomicU64,
}

impl Resolver {
    pub fn new(
        config: ResolverConfig,
        prober: Arc<dyn ExistenceProber>,
        remote: Option<Arc<dyn RemoteIndex>>,
    ) -> Self {
        Self {
            config,
            prober,
            remote,
            cache: ResultCache::new(),
            today: Today::System,
            state: RwLock::new(ResolverState::default()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_today(mut self, today: Today) -> Self {
        self.today = today;
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Checks one filename, consulting the cache first. Only a definite
    /// `NotFound` for a date before today is remembered, and nothing is
    /// written once a refresh has moved past `generation`.
    async fn check(
        &self,
        filename: &str,
        timeout: Duration,
        today: NaiveDate,
        generation: u64,
    ) -> Option<ParsedResult> {
        match self.cache.get(filename).await {
            Some(CacheEntry::Found(result)) => return Some(result),
            Some(CacheEntry::NotFound) => return None,
            None => {}
        }

        let outcome = probe_with_timeout(self.prober.as_ref(), filename, timeout).await;
        let current = generation == self.generation();
        match outcome {
            ProbeOutcome::Found => {
                let result = codec::parse_filename(filename)?;
                if current {
                    self.cache.put_found(result.clone()).await;
                }
                Some(result)
            }
            ProbeOutcome::NotFound => {
                if current && codec::parse_filename(filename).is_some_and(|r| r.date < today) {
                    self.cache.put_not_found(filename).await;
                }
                None
            }
            ProbeOutcome::TransientError => None,
        }
    }

    /// The fast path: best slot across the last few days, one probe at a
    /// time, stopping at the first hit.
    pub async fn fast_first_result(&self) -> Option<ParsedResult> {
        let today = self.today.date();
        let query = CandidateQuery {
            today,
            lookback_days: self.config.fast_lookback_days,
            time_slots: &self.config.time_slots,
            extensions: &self.config.extensions,
        };
        let timeout = Duration::from_millis(self.config.fast_probe_timeout_ms);
        let generation = self.generation();

        for candidate in query.generate(SearchOrder::PriorityFirst) {
            if let Some(result) = self
                .check(&candidate.filename, timeout, today, generation)
                .await
            {
                info!("Fast path found {}", result.filename);
                return Some(result);
            }
        }

        info!(
            "Fast path found nothing in the last {} days",
            self.config.fast_lookback_days
        );
        None
    }

    pub async fn result_for_date_time(&self, date: NaiveDate, slot: TimeSlot) -> Option<ParsedResult> {
        if let Some(remote) = &self.remote {
            match remote.find(date, slot).await {
                Ok(Some(descriptor)) => match descriptor.to_result() {
                    Some(result) => {
                        self.cache.put_found(result.clone()).await;
                        return Some(result);
                    }
                    None => warn!(
                        "Index returned unparseable filename {:?}, probing instead",
                        descriptor.filename
                    ),
                },
                Ok(None) => {
                    debug!("Index has no result for {} {}", codec::format_date(date), slot);
                    return None;
                }
                Err(e) => debug!("Index lookup failed, probing instead: {}", e),
            }
        }

        let today = self.today.date();
        let timeout = Duration::from_millis(self.config.background_probe_timeout_ms);
        let generation = self.generation();
        for candidate in lookup_candidates(date, slot) {
            if let Some(result) = self
                .check(&candidate.filename, timeout, today, generation)
                .await
            {
                return Some(result);
            }
        }

        debug!("No result for {} {}", codec::format_date(date), slot);
        None
    }

    pub async fn result_for_date_any_time(&self, date: NaiveDate) -> Option<ParsedResult> {
        {
            let state = self.state.read().await;
            if let Some(result) = selection::select_for_date(&state.available, date) {
                return Some(result.clone());
            }
        }

        for &slot in &self.config.time_slots {
            if let Some(result) = self.result_for_date_time(date, slot).await {
                return Some(result);
            }
        }
        None
    }

    async fn list_from_index(&self) -> Option<Vec<ParsedResult>> {
        let remote = self.remote.as_ref()?;
        match remote.list().await {
            Ok(descriptors) if !descriptors.is_empty() => {
                let results: Vec<ParsedResult> =
                    descriptors.iter().filter_map(|d| d.to_result()).collect();
                for result in &results {
                    self.cache.put_found(result.clone()).await;
                }
                Some(results)
            }
            Ok(_) => {
                debug!("Index listing is empty, probing instead");
                None
            }
            Err(e) => {
                debug!("Index listing failed, probing instead: {}", e);
                None
            }
        }
    }

    async fn probe_window(&self, generation: u64) -> Vec<ParsedResult> {
        let today = self.today.date();
        let query = CandidateQuery {
            today,
            lookback_days: self.config.background_lookback_days,
            time_slots: &self.config.time_slots,
            extensions: &self.config.extensions,
        };
        let candidates = query.generate(SearchOrder::DateFirst);
        let timeout = Duration::from_millis(self.config.background_probe_timeout_ms);
        let pause = Duration::from_millis(self.config.batch_pause_ms);
        let batch_size = self.config.batch_size.max(1);

        debug!(
            "Probing {} candidates in batches of {}",
            candidates.len(),
            batch_size
        );

        let mut found = Vec::new();
        let mut batches = candidates.chunks(batch_size).peekable();
        while let Some(batch) = batches.next() {
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|c| self.check(&c.filename, timeout, today, generation)),
            )
            .await;
            found.extend(outcomes.into_iter().flatten());

            if batches.peek().is_some() && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }
        found
    }

    /// One wide scan: the index listing when available, probing otherwise.
    /// One result per date and slot, newest first.
    pub async fn scan(&self) -> ScanOutcome {
        let generation = self.generation();

        let mut results = match self.list_from_index().await {
            Some(results) => results,
            None => self.probe_window(generation).await,
        };

        let mut seen = HashSet::new();
        results.retain(|r| seen.insert((r.date, r.time_slot)));
        selection::sort_newest_first(&mut results);

        info!("Scan found {} results", results.len());
        ScanOutcome {
            generation,
            results,
        }
    }

    /// Stores a scan's results unless a refresh has happened since it
    /// started, then offers the newest one as an upgrade.
    pub async fn apply_scan(&self, outcome: &ScanOutcome) -> bool {
        let mut state = self.state.write().await;

        // checked under the lock so a refresh cannot slip in before the write
        let current = self.generation();
        if outcome.generation != current {
            debug!(
                "Discarding scan from generation {} (current {})",
                outcome.generation, current
            );
            return false;
        }

        state.available = outcome.results.clone();
        if let Some(newest) = selection::select_latest(&outcome.results) {
            Self::upgrade(&mut state, newest.clone());
        }
        true
    }

    pub async fn all_available_results(&self) -> Vec<ParsedResult> {
        let outcome = self.scan().await;
        self.apply_scan(&outcome).await;
        outcome.results
    }

    /// Replaces the displayed result with a newer one if that would not
    /// surprise a user who navigated away on purpose.
    pub async fn offer_upgrade(&self, candidate: ParsedResult) -> bool {
        let mut state = self.state.write().await;
        Self::upgrade(&mut state, candidate)
    }

    fn upgrade(state: &mut ResolverState, candidate: ParsedResult) -> bool {
        let permitted = match &state.displayed {
            None => true,
            Some(current) if candidate.date_time() <= current.date_time() => false,
            Some(current) => {
                !state.user_navigated || (candidate.date - current.date).num_days() > 1
            }
        };

        if permitted {
            info!("Displaying newer result {}", candidate.filename);
            state.displayed = Some(candidate);
        }
        permitted
    }

    /// Initial page load: show something quickly, then scan in the background.
    pub async fn load(self: &Arc<Self>) -> LoadOutcome {
        let initial = self.fast_first_result().await;
        if let Some(result) = &initial {
            let mut state = self.state.write().await;
            if state.displayed.is_none() {
                state.displayed = Some(result.clone());
            }
        }

        LoadOutcome {
            initial,
            background: self.spawn_scan(),
        }
    }

    /// Forgets everything cached and rescans. Scans still running from
    /// before the refresh finish but their results are dropped.
    pub async fn refresh(self: &Arc<Self>) -> JoinHandle<Vec<ParsedResult>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Refreshing results (generation {})", generation);

        self.cache.clear().await;
        if let Some(remote) = &self.remote
            && let Err(e) = remote.clear_cache().await
        {
            debug!("Index cache clear failed: {}", e);
        }
        self.spawn_scan()
    }

    fn spawn_scan(self: &Arc<Self>) -> JoinHandle<Vec<ParsedResult>> {
        let resolver = Arc::clone(self);
        tokio::spawn(async move { resolver.all_available_results().await })
    }

    /// A user picked a result (e.g. from the calendar).
    pub async fn show(&self, result: ParsedResult) {
        let mut state = self.state.write().await;
        state.user_navigated = true;
        state.displayed = Some(result);
    }

    pub async fn displayed(&self) -> Option<ParsedResult> {
        self.state.read().await.displayed.clone()
    }

    pub async fn available(&self) -> Vec<ParsedResult> {
        self.state.read().await.available.clone()
    }

    /// Dates with at least one result, newest first.
    pub async fn available_dates(&self) -> Vec<NaiveDate> {
        let state = self.state.read().await;
        let mut dates: Vec<NaiveDate> = state.available.iter().map(|r| r.date).collect();
        dates.sort_by(|a, b| b.cmp(a));
        dates.dedup();
        dates
    }
}
