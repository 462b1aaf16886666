//! Persistence of daily rates.
//!
//! A [`RateConnector`] opens one [`RateStore`] per run. The store owns the
//! schema lifecycle and the insert-or-ignore write path; uniqueness of
//! `(date, currency_code)` is left to the store itself.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::currency_rate::UpsertOutcome;
use crate::error::StoreError;

pub use memory::{MemoryConnector, MemoryStore};
pub use postgres::{PgConnector, PgStore};

pub const TABLE_NAME: &str = "currency_rates";
pub const UNIQUE_CONSTRAINT: &str = "uq_date_currency_code";
pub const LEGACY_CODE_WIDTH: i32 = 3;
pub const CODE_WIDTH: i32 = 10;

#[async_trait]
pub trait RateConnector: Send + Sync {
    type Store: RateStore;

    async fn connect(&self) -> Result<Self::Store, StoreError>;
}

#[async_trait]
pub trait RateStore: Send {
    /// Creates the table, widens a legacy code column and adds the unique
    /// constraint, all in one transaction. Safe to call on every run.
    async fn ensure_schema(&mut self) -> Result<(), StoreError>;

    /// Inserts one rate in its own transaction. An existing row for the same
    /// `(date, code)` is left as is.
    async fn upsert(
        &mut self,
        date: NaiveDate,
        code: &str,
        rate: Decimal,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Releases the underlying connection.
    async fn close(self) -> Result<(), StoreError>
    where
        Self: Sized;
}

/// What to do with the existing `currency_code` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeColumnAction {
    Widen,
    AlreadyCurrent,
    Leave,
}

/// Only the legacy `VARCHAR(3)` column is migrated forward; anything that is
/// not the current width is reported and left alone.
pub fn plan_code_column(data_type: &str, max_length: Option<i32>) -> CodeColumnAction {
    match (data_type, max_length) {
        ("character varying", Some(LEGACY_CODE_WIDTH)) => CodeColumnAction::Widen,
        ("character varying", Some(CODE_WIDTH)) => CodeColumnAction::AlreadyCurrent,
        _ => CodeColumnAction::Leave,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_code_column() {
        assert_eq!(plan_code_column("character varying", Some(3)), CodeColumnAction::Widen);
        assert_eq!(
            plan_code_column("character varying", Some(10)),
            CodeColumnAction::AlreadyCurrent
        );
        assert_eq!(plan_code_column("character varying", Some(5)), CodeColumnAction::Leave);
        assert_eq!(plan_code_column("character varying", None), CodeColumnAction::Leave);
        assert_eq!(plan_code_column("character", Some(3)), CodeColumnAction::Leave);
        assert_eq!(plan_code_column("text", None), CodeColumnAction::Leave);
    }
}
