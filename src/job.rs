//! One end-to-end sync run: fetch, derive the record date, store every rate.

use chrono::{DateTime, NaiveDate, Utc};
use log::{error, info, warn};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::currency_rate::{UpsertOutcome, coerce_rate};
use crate::error::{StoreError, SyncError};
use crate::source::{DEFAULT_BASE_CURRENCY, RateSource};
use crate::store::{RateConnector, RateStore};

/// Counts for one completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub run_id: Uuid,
    pub date: NaiveDate,
    pub attempted: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SyncSummary {
    fn new(run_id: Uuid, date: NaiveDate) -> Self {
        Self {
            run_id,
            date,
            attempted: 0,
            inserted: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

pub struct SyncJob<S, C> {
    source: S,
    connector: C,
    api_key: Option<String>,
    base_currency: String,
}

impl<S, C> SyncJob<S, C>
where
    S: RateSource,
    C: RateConnector,
{
    pub fn new(source: S, connector: C, api_key: Option<String>) -> Self {
        Self {
            source,
            connector,
            api_key,
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
        }
    }

    /// Runs the job against the current time.
    pub async fn run(&self) -> Result<SyncSummary, SyncError> {
        self.run_at(Utc::now()).await
    }

    /// Runs the job; `now` is only used when the snapshot has no usable
    /// `updated` timestamp. Every failure is logged before it is returned.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<SyncSummary, SyncError> {
        let run_id = Uuid::new_v4();
        info!("[{run_id}] Starting daily currency rate fetch and store job...");

        let result = self.execute(run_id, now).await;
        match &result {
            Ok(summary) => info!(
                "[{run_id}] Stored rates for {}: {} inserted, {} skipped, {} failed",
                summary.date, summary.inserted, summary.skipped, summary.failed
            ),
            Err(SyncError::Fetch(e)) => {
                error!("[{run_id}] Failed to fetch currency rates: {e}");
                if let Some(details) = e.details() {
                    error!("[{run_id}] Details: {details}");
                }
            }
            Err(e) => error!("[{run_id}] {e}"),
        }

        info!("[{run_id}] Daily currency rate fetch and store job finished.");
        result
    }

    async fn execute(&self, run_id: Uuid, now: DateTime<Utc>) -> Result<SyncSummary, SyncError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(SyncError::MissingApiKey)?;

        info!("[{run_id}] Fetching latest currency rates...");
        let snapshot = self.source.fetch(api_key, &self.base_currency).await?;

        let Some(rates) = snapshot.rate_map() else {
            error!(
                "[{run_id}] Fetched rates data is not in the expected format or 'rates' key is missing: {:?}",
                snapshot
            );
            return Err(SyncError::MalformedSnapshot);
        };

        info!("[{run_id}] Raw 'updated' timestamp from API: {:?}", snapshot.updated);
        let date = snapshot.record_date(now);
        match snapshot.updated_timestamp().filter(|ts| *ts != 0) {
            Some(ts) => info!("[{run_id}] Integer-converted timestamp: {ts}"),
            None => warn!(
                "[{run_id}] No usable 'updated' timestamp in API response. Using current UTC date."
            ),
        }

        info!("[{run_id}] Connecting to the database...");
        let mut store = self.connector.connect().await?;

        let stored = self.store_rates(&mut store, run_id, date, rates).await;
        if let Err(e) = store.close().await {
            warn!("[{run_id}] Failed to close database connection: {e}");
        }

        stored.map_err(SyncError::from)
    }

    async fn store_rates(
        &self,
        store: &mut C::Store,
        run_id: Uuid,
        date: NaiveDate,
        rates: &Map<String, Value>,
    ) -> Result<SyncSummary, StoreError> {
        info!("[{run_id}] Initializing database schema (if needed)...");
        store.ensure_schema().await?;

        info!("[{run_id}] Inserting rates for date: {date}...");
        let mut summary = SyncSummary::new(run_id, date);
        for (code, raw) in rates {
            let rate = match coerce_rate(code, raw) {
                Ok(rate) => rate,
                Err(e) => {
                    error!("[{run_id}] {e}. Skipping.");
                    summary.failed += 1;
                    continue;
                }
            };

            summary.attempted += 1;
            match store.upsert(date, code, rate).await {
                Ok(UpsertOutcome::Inserted) => summary.inserted += 1,
                Ok(UpsertOutcome::SkippedDuplicate) => summary.skipped += 1,
                Err(e) => {
                    error!("[{run_id}] Error processing or inserting rate for {code}: {e}");
                    summary.failed += 1;
                }
            }
        }

        info!("[{run_id}] Finished processing rates for insertion.");
        Ok(summary)
    }
}
