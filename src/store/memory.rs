//! In-memory rate store with the same uniqueness rules as the database.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{RateConnector, RateStore};
use crate::currency_rate::{CurrencyRateRecord, UpsertOutcome};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<CurrencyRateRecord>,
    opened: usize,
    closed: usize,
    schema_calls: usize,
    upsert_calls: usize,
    refuse_connections: bool,
    fail_schema: bool,
    failing_codes: HashSet<String>,
}

/// Hands out [`MemoryStore`]s that share one table.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.inner)
    }

    /// Makes every later `connect` fail.
    pub fn refuse_connections(&self) {
        self.state().refuse_connections = true;
    }

    /// Makes every later `ensure_schema` fail.
    pub fn fail_schema(&self) {
        self.state().fail_schema = true;
    }

    /// Makes writes for `code` fail.
    pub fn fail_writes_for(&self, code: &str) {
        self.state().failing_codes.insert(code.to_string());
    }

    pub fn records(&self) -> Vec<CurrencyRateRecord> {
        self.state().records.clone()
    }

    pub fn connections_opened(&self) -> usize {
        self.state().opened
    }

    pub fn connections_closed(&self) -> usize {
        self.state().closed
    }

    pub fn schema_calls(&self) -> usize {
        self.state().schema_calls
    }

    pub fn upsert_calls(&self) -> usize {
        self.state().upsert_calls
    }
}

fn lock(inner: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RateConnector for MemoryConnector {
    type Store = MemoryStore;

    async fn connect(&self) -> Result<MemoryStore, StoreError> {
        let mut state = self.state();
        if state.refuse_connections {
            return Err(StoreError::Connection("connection refused".to_string()));
        }
        state.opened += 1;
        Ok(MemoryStore {
            inner: Arc::clone(&self.inner),
        })
    }
}

pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn ensure_schema(&mut self) -> Result<(), StoreError> {
        let mut state = lock(&self.inner);
        state.schema_calls += 1;
        if state.fail_schema {
            return Err(StoreError::Schema("relation is locked".to_string()));
        }
        Ok(())
    }

    async fn upsert(
        &mut self,
        date: NaiveDate,
        code: &str,
        rate: Decimal,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut state = lock(&self.inner);
        state.upsert_calls += 1;

        if state.failing_codes.contains(code) {
            return Err(StoreError::Write {
                code: code.to_string(),
                message: "value too long for type character varying(10)".to_string(),
            });
        }

        let exists = state
            .records
            .iter()
            .any(|r| r.date == date && r.currency_code == code);
        if exists {
            return Ok(UpsertOutcome::SkippedDuplicate);
        }

        let id = state.records.len() as i32 + 1;
        state.records.push(CurrencyRateRecord {
            id,
            date,
            currency_code: code.to_string(),
            rate,
        });
        Ok(UpsertOutcome::Inserted)
    }

    async fn close(self) -> Result<(), StoreError> {
        lock(&self.inner).closed += 1;
        Ok(())
    }
}
