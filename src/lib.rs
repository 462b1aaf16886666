pub mod config;
pub mod currency_rate;
pub mod error;
pub mod job;
pub mod rate_snapshot;
pub mod scheduler;
pub mod source;
pub mod store;

pub use config::{Config, DbConfig, RunMode};
pub use currency_rate::{CurrencyRateRecord, UpsertOutcome, coerce_rate};
pub use error::{CoercionError, FetchError, StoreError, SyncError};
pub use job::{SyncJob, SyncSummary};
pub use rate_snapshot::RateSnapshot;
pub use source::{HttpRateSource, RateSource};
pub use store::{MemoryConnector, PgConnector, PgStore, RateConnector, RateStore};
