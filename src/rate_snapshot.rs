use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde::Serialize;
use serde_json::{Map, Value};

/// One decoded response of the rates endpoint.
///
/// Every field is optional: the endpoint may omit any of them and that is
/// not a fetch failure. Callers decide what a missing field means.
#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RateSnapshot {
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub updated: Option<Value>,
    #[serde(default)]
    pub rates: Option<Value>,
}

impl RateSnapshot {
    /// The rate mapping, if present and object-shaped.
    pub fn rate_map(&self) -> Option<&Map<String, Value>> {
        self.rates.as_ref().and_then(Value::as_object)
    }

    /// Provider timestamp as epoch seconds, when it can be read as an integer.
    pub fn updated_timestamp(&self) -> Option<i64> {
        match self.updated.as_ref()? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Calendar date the snapshot's records are stored under.
    ///
    /// Uses the provider's `updated` instant in UTC; falls back to `now`'s
    /// UTC date when the timestamp is absent, zero or unusable.
    pub fn record_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.updated_timestamp()
            .filter(|ts| *ts != 0)
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.date_naive())
            .unwrap_or_else(|| now.date_naive())
    }
}
