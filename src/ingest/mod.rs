use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

pub mod amount;
pub mod fingerprint;
pub mod narration;
pub mod normalize;
pub mod reader;

use amount::{TxType, parse_amount, resolve_type};

pub const UNKNOWN_MERCHANT: &str = "Unknown";
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One row as read from an uploaded file, keyed by canonicalized column name.
/// Lives for the duration of a single import batch.
pub type RawRow = HashMap<String, Value>;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CanonicalTransaction {
    pub id: String,
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub description: String,
    pub merchant: String,
    pub category: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("unparseable date")]
    InvalidDate,

    #[error("unparseable amount")]
    InvalidAmount,

    #[error("zero amount")]
    ZeroAmount,
}

/// The validated values of one row, before fingerprinting and enrichment.
#[derive(Debug)]
pub struct RowValues {
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub tx_type: TxType,
    pub description: String,
    pub category: Option<String>,
}

/// Validates a raw row into its canonical field values. Rows failing here are
/// reported individually and never abort the batch.
pub fn extract_row(row: &RawRow) -> Result<RowValues, RowError> {
    let date = parse_date(row.get("date").ok_or(RowError::MissingField("date"))?)?;

    let description = row
        .get("description")
        .and_then(|v| v.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or(RowError::MissingField("description"))?
        .to_owned();

    let amount = match row.get("amount") {
        Some(value) => parse_amount(value)?,
        None => {
            let credit = parse_optional_amount(row.get("credit"))?;
            let debit = parse_optional_amount(row.get("debit"))?;
            if row.get("credit").is_none() && row.get("debit").is_none() {
                return Err(RowError::MissingField("amount"));
            }
            credit - debit
        }
    };

    if amount == 0.0 {
        return Err(RowError::ZeroAmount);
    }

    let tx_type = resolve_type(amount, row.get("type").and_then(|v| v.as_str()));

    let category = row
        .get("category")
        .and_then(|v| v.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_owned());

    return Ok(RowValues {
        date,
        amount,
        tx_type,
        description,
        category,
    });
}

// Debit/credit cells are frequently blank on the other side of the ledger.
fn parse_optional_amount(value: Option<&Value>) -> Result<f64, RowError> {
    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(value) => parse_amount(value),
    }
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%d/%m/%y",
    "%d-%m-%y",
    "%d %b %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M:%S"];

/// Parses the date cell across the formats banks actually export. Rejecting
/// instead of guessing keeps bad rows out of the fingerprint space.
pub fn parse_date(value: &Value) -> Result<DateTime<Utc>, RowError> {
    let s = match value {
        Value::String(s) => s.trim(),
        _ => return Err(RowError::InvalidDate),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date.and_time(NaiveTime::MIN).and_utc());
        }
    }

    return Err(RowError::InvalidDate);
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn row(entries: &[(&str, Value)]) -> RawRow {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn parses_iso_and_slashed_dates_to_same_day() {
        let a = parse_date(&json!("2024-01-15T00:00:00Z")).unwrap();
        let b = parse_date(&json!("15/01/2024")).unwrap();
        assert_eq!(a.date_naive(), b.date_naive());
    }

    #[test]
    fn rejects_unparseable_date() {
        assert_eq!(parse_date(&json!("not a date")), Err(RowError::InvalidDate));
        assert_eq!(parse_date(&json!(42)), Err(RowError::InvalidDate));
    }

    #[test]
    fn extracts_amount_column_row() {
        let values = extract_row(&row(&[
            ("date", json!("2024-01-15")),
            ("description", json!("POS PURCHASE")),
            ("amount", json!("-120.50")),
        ]))
        .unwrap();

        assert_eq!(values.amount, -120.50);
        assert_eq!(values.tx_type, TxType::Expense);
    }

    #[test]
    fn collapses_debit_credit_pair_into_signed_amount() {
        let values = extract_row(&row(&[
            ("date", json!("2024-01-15")),
            ("description", json!("salary")),
            ("debit", json!("")),
            ("credit", json!("1000.00")),
        ]))
        .unwrap();

        assert_eq!(values.amount, 1000.00);
        assert_eq!(values.tx_type, TxType::Income);
    }

    #[test]
    fn currency_prefixed_credit_defaults_to_income() {
        let values = extract_row(&row(&[
            ("date", json!("2024-01-15")),
            ("description", json!("salary credit")),
            ("amount", json!("Rs. 2,500.00")),
        ]))
        .unwrap();

        assert_eq!(values.amount, 2500.00);
        assert_eq!(values.tx_type, TxType::Income);
    }

    #[test]
    fn zero_amount_rows_are_rejected_not_dropped() {
        let err = extract_row(&row(&[
            ("date", json!("2024-01-15")),
            ("description", json!("noop")),
            ("amount", json!("0.00")),
        ]))
        .unwrap_err();

        assert_eq!(err, RowError::ZeroAmount);
    }

    #[test]
    fn missing_description_is_reported() {
        let err = extract_row(&row(&[
            ("date", json!("2024-01-15")),
            ("amount", json!("12.00")),
        ]))
        .unwrap_err();

        assert_eq!(err, RowError::MissingField("description"));
    }
}
