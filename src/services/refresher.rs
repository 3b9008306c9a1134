use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use thiserror::Error;
use tokio::time::interval;

use crate::catalog::merge::incoming_id;
use crate::catalog::{overlay, Catalog, MergeFailure};
use crate::db::{MetaKey, RecordStore};
use crate::market::{ItemSource, SourceError};
use crate::models::ItemRecord;

const LOOP_TICKS_PER_INTERVAL: i64 = 10;
const MAX_LOOP_TICK_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("a refresh is already in progress")]
    InProgress,

    #[error(transparent)]
    Upstream(#[from] SourceError),

    /// Every batch failed to persist; nothing changed.
    #[error("no batch could be persisted ({} failures)", .0.len())]
    NothingCommitted(Vec<MergeFailure>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The last successful refresh is younger than the interval.
    NotDue,
    /// Another refresh holds the in-flight flag.
    InFlight,
}

/// Result of one completed refresh. Failures are per record or per batch; the
/// rest of the refresh still lands.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub items_processed: usize,
    pub items_committed: usize,
    pub failures: Vec<MergeFailure>,
    pub duration_seconds: f64,
}

impl RefreshReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug)]
pub enum RefreshOutcome {
    Skipped(SkipReason),
    Updated(RefreshReport),
    Failed(String),
}

impl RefreshOutcome {
    fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Skipped(_) => "skipped",
            RefreshOutcome::Updated(report) if report.is_partial() => "partial",
            RefreshOutcome::Updated(_) => "updated",
            RefreshOutcome::Failed(_) => "failed",
        }
    }
}

/// Clears the in-flight flag when dropped, whether the refresh finished,
/// failed or was cancelled.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Decides when the catalog is stale, pulls the feed, overlays it onto the
/// current records, persists the result and swaps in the new snapshot.
///
/// At most one refresh runs at a time. A failed fetch changes nothing, so the
/// next trigger retries straight away.
pub struct RefreshCoordinator {
    source: Arc<dyn ItemSource>,
    store: Arc<dyn RecordStore>,
    catalog: Arc<Catalog>,
    interval: Duration,
    batch_size: usize,
    last_refresh: Mutex<Option<DateTime<Utc>>>,
    in_flight: AtomicBool,
}

impl RefreshCoordinator {
    pub fn new(
        source: Arc<dyn ItemSource>,
        store: Arc<dyn RecordStore>,
        catalog: Arc<Catalog>,
        interval_secs: u64,
        batch_size: usize,
    ) -> Self {
        Self {
            source,
            store,
            catalog,
            interval: Duration::seconds(interval_secs.min(u64::from(u32::MAX)) as i64),
            batch_size: batch_size.max(1),
            last_refresh: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_last_refresh(self, last_refresh: Option<DateTime<Utc>>) -> Self {
        *self.last_refresh.lock().unwrap_or_else(PoisonError::into_inner) = last_refresh;
        self
    }

    /// Build a coordinator that resumes from the persisted `last_refresh_time`.
    pub async fn restore(
        source: Arc<dyn ItemSource>,
        store: Arc<dyn RecordStore>,
        catalog: Arc<Catalog>,
        interval_secs: u64,
        batch_size: usize,
    ) -> Self {
        let last_refresh = match store.get_meta(MetaKey::LastRefreshTime).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Could not read last refresh time; treating catalog as stale"
                );
                None
            }
        };

        Self::new(source, store, catalog, interval_secs, batch_size).with_last_refresh(last_refresh)
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_refresh() {
            Some(last) => now - last >= self.interval,
            None => true,
        }
    }

    /// Refresh when the interval has elapsed and nothing else is refreshing.
    pub async fn refresh_if_due(&self, now: DateTime<Utc>) -> RefreshOutcome {
        if !self.is_due(now) {
            return RefreshOutcome::Skipped(SkipReason::NotDue);
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return RefreshOutcome::Skipped(SkipReason::InFlight);
        };

        // A refresh may have completed between the first check and the guard.
        if !self.is_due(now) {
            return RefreshOutcome::Skipped(SkipReason::NotDue);
        }

        let outcome = match self.run(now).await {
            Ok(report) => RefreshOutcome::Updated(report),
            Err(e) => RefreshOutcome::Failed(e.to_string()),
        };
        counter!("refresh_runs_total", "outcome" => outcome.label()).increment(1);
        outcome
    }

    /// Refresh regardless of the interval. Still refuses to run alongside
    /// another refresh.
    pub async fn refresh_now(&self, now: DateTime<Utc>) -> Result<RefreshReport, RefreshError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return Err(RefreshError::InProgress);
        };

        let result = self.run(now).await;
        let label = match &result {
            Ok(report) if report.is_partial() => "partial",
            Ok(_) => "updated",
            Err(_) => "failed",
        };
        counter!("refresh_runs_total", "outcome" => label).increment(1);

        result
    }

    /// Fire-and-forget trigger for the request path. Returns whether a task
    /// was spawned; the caller never waits on it.
    pub fn trigger_in_background(self: &Arc<Self>, now: DateTime<Utc>) -> bool {
        if !self.is_due(now) || self.is_in_flight() {
            return false;
        }

        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            match coordinator.refresh_if_due(now).await {
                RefreshOutcome::Updated(report) => tracing::info!(
                    processed = report.items_processed,
                    committed = report.items_committed,
                    failures = report.failures.len(),
                    "Background refresh finished"
                ),
                RefreshOutcome::Failed(reason) => {
                    tracing::warn!(reason = %reason, "Background refresh failed")
                }
                RefreshOutcome::Skipped(reason) => {
                    tracing::debug!(?reason, "Background refresh skipped")
                }
            }
        });
        true
    }

    /// How often the scheduled loop asks `refresh_if_due`. A fraction of the
    /// interval, so tick jitter never stretches the period to two intervals.
    pub fn loop_tick(&self) -> std::time::Duration {
        let secs = (self.interval.num_seconds() / LOOP_TICKS_PER_INTERVAL)
            .clamp(1, MAX_LOOP_TICK_SECS);
        std::time::Duration::from_secs(secs as u64)
    }

    /// Ticker loop for deployments that refresh on a schedule instead of (or
    /// as well as) on demand.
    pub async fn run_refresh_loop(self: Arc<Self>) {
        let mut ticker = interval(self.loop_tick());

        loop {
            ticker.tick().await;

            match self.refresh_if_due(Utc::now()).await {
                RefreshOutcome::Updated(report) => tracing::info!(
                    processed = report.items_processed,
                    committed = report.items_committed,
                    failures = report.failures.len(),
                    "Scheduled refresh finished"
                ),
                RefreshOutcome::Failed(reason) => {
                    tracing::error!(reason = %reason, "Scheduled refresh failed")
                }
                RefreshOutcome::Skipped(_) => {}
            }
        }
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<RefreshReport, RefreshError> {
        let started = Instant::now();
        tracing::info!("Refreshing item catalog from market feed");

        let incoming = match self.source.fetch_items().await {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(error = %e, "Market feed fetch failed; keeping current catalog");
                return Err(e.into());
            }
        };

        let prior = self.catalog.snapshot();
        let mut failures: Vec<MergeFailure> = Vec::new();

        // Keyed by id so a repeated id in the payload overlays the earlier
        // entry instead of producing two records.
        let mut merged: BTreeMap<i64, ItemRecord> = BTreeMap::new();
        for raw in &incoming {
            let base = incoming_id(raw).and_then(|id| merged.get(&id).or_else(|| prior.get(id)));
            match overlay(base, raw) {
                Ok(record) => {
                    merged.insert(record.id, record);
                }
                Err(failure) => {
                    tracing::warn!(%failure, "Skipping item that failed to merge");
                    failures.push(failure);
                }
            }
        }

        let merged: Vec<ItemRecord> = merged.into_values().collect();
        let mut committed: Vec<ItemRecord> = Vec::with_capacity(merged.len());
        for (index, batch) in merged.chunks(self.batch_size).enumerate() {
            match self.store.upsert_items(batch).await {
                Ok(()) => committed.extend_from_slice(batch),
                Err(e) => {
                    tracing::error!(
                        batch = index + 1,
                        size = batch.len(),
                        error = %e,
                        "Failed to persist batch"
                    );
                    failures.push(MergeFailure::batch(index + 1, format!("{e:#}")));
                }
            }
        }

        let items_committed = committed.len();
        if items_committed == 0 && !merged.is_empty() {
            // Leave the refresh clock alone so the next trigger retries.
            tracing::error!(
                failures = failures.len(),
                "No batch persisted; keeping current catalog"
            );
            counter!("refresh_failures_total").increment(failures.len() as u64);
            return Err(RefreshError::NothingCommitted(failures));
        }
        if items_committed > 0 {
            let next = prior.with_updates(committed, now);
            gauge!("catalog_items").set(next.len() as f64);
            self.catalog.replace(next);

            if let Err(e) = self.store.set_meta(MetaKey::LastUpdated, now).await {
                tracing::error!(error = %e, "Failed to persist last updated time");
            }
        }

        let recorded = {
            let mut last = self.last_refresh.lock().unwrap_or_else(PoisonError::into_inner);
            let value = last.map_or(now, |prev| prev.max(now));
            *last = Some(value);
            value
        };
        if let Err(e) = self.store.set_meta(MetaKey::LastRefreshTime, recorded).await {
            tracing::error!(error = %e, "Failed to persist last refresh time");
        }

        let duration_seconds = started.elapsed().as_secs_f64();
        histogram!("refresh_duration_seconds").record(duration_seconds);
        counter!("refresh_failures_total").increment(failures.len() as u64);

        tracing::info!(
            processed = incoming.len(),
            committed = items_committed,
            failures = failures.len(),
            duration_seconds,
            "Catalog refresh complete"
        );

        Ok(RefreshReport {
            items_processed: incoming.len(),
            items_committed,
            failures,
            duration_seconds,
        })
    }
}
