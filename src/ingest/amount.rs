use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::RowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Income,
    Expense,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Income => "income",
            TxType::Expense => "expense",
        }
    }
}

// "Rs." / "INR" style prefixes, left over once symbols and spaces are gone
static CURRENCY_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]+\.?").unwrap());

/// Turns a raw amount cell into a signed decimal. Accepts finite numbers
/// as-is; strings go through accounting-notation and currency stripping.
/// Failure means the row is skipped, never coerced to zero.
pub fn parse_amount(raw: &Value) -> Result<f64, RowError> {
    match raw {
        Value::Number(n) => {
            let value = n.as_f64().ok_or(RowError::InvalidAmount)?;
            if !value.is_finite() {
                return Err(RowError::InvalidAmount);
            }
            Ok(value)
        }
        Value::String(s) => parse_amount_str(s),
        _ => Err(RowError::InvalidAmount),
    }
}

fn parse_amount_str(raw: &str) -> Result<f64, RowError> {
    let mut s = raw.trim();

    // accounting notation: (123.45) means -123.45, checked before any
    // symbol stripping so the parens are still intact
    let negative = s.starts_with('(') && s.ends_with(')');
    if negative {
        s = &s[1..s.len() - 1];
    }

    let stripped: String = s
        .chars()
        .filter(|c| !matches!(c, '₹' | '$' | '€' | '£' | '¥' | ',') && !c.is_whitespace())
        .collect();
    let stripped = CURRENCY_PREFIX.replace(&stripped, "");

    let value = stripped
        .parse::<f64>()
        .map_err(|_| RowError::InvalidAmount)?;
    if !value.is_finite() {
        return Err(RowError::InvalidAmount);
    }

    return Ok(if negative { -value } else { value });
}

pub fn infer_type(amount: f64) -> TxType {
    if amount >= 0.0 {
        TxType::Income
    } else {
        TxType::Expense
    }
}

/// An explicit source type wins only when it is exactly one of our two
/// literals; anything else falls back to sign inference.
pub fn resolve_type(amount: f64, explicit: Option<&str>) -> TxType {
    match explicit.map(|t| t.trim().to_lowercase()) {
        Some(t) if t == "income" => TxType::Income,
        Some(t) if t == "expense" => TxType::Expense,
        _ => infer_type(amount),
    }
}
