use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::CoercionError;

/// A persisted `(date, currency_code, rate)` row.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CurrencyRateRecord {
    pub id: i32,
    pub date: NaiveDate,
    pub currency_code: String,
    pub rate: Decimal,
}

/// Result of a single insert-or-ignore write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    SkippedDuplicate,
}

/// Converts a raw rate from the response into the stored decimal type.
///
/// JSON numbers and numeric strings are accepted, in plain or scientific
/// notation.
pub fn coerce_rate(code: &str, raw: &Value) -> Result<Decimal, CoercionError> {
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(coercion_error(code, raw)),
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| coercion_error(code, raw))
}

fn coercion_error(code: &str, raw: &Value) -> CoercionError {
    CoercionError {
        code: code.to_string(),
        raw: raw.to_string(),
    }
}
