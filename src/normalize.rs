// Money/time normalization shared by every provider adapter
// Providers disagree on field names, timestamp layouts and price encodings; everything
// funnels through these helpers so the canonical model stays consistent.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::domain::{Money, Segment};

// Error types for value normalization
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unsupported time format: {input:?}")]
    Timestamp { input: String },

    #[error("invalid price {input:?}: {reason}")]
    Price { input: String, reason: String },
}

// Zone-less layouts are read as UTC. Order matters: first match wins.
pub const NAIVE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

pub const DEFAULT_PRICE_DECIMALS: u32 = 2;

/// Parses a provider timestamp into a UTC instant.
///
/// RFC 3339 (with offset, optional fractional seconds) is tried first, then
/// each of [`NAIVE_TIME_FORMATS`] in order.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Timestamp {
            input: input.to_string(),
        });
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NAIVE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ParseError::Timestamp {
            input: trimmed.to_string(),
        })
}

/// Converts a decimal string such as `"123.45"` into minor units (`12345`).
///
/// The value is scaled by `10^decimals` and rounded half away from zero.
/// `decimals` is 2 for most currencies; JPY-like currencies use 0.
pub fn parse_money(amount: &str, currency: &str, decimals: u32) -> Result<Money, ParseError> {
    let trimmed = amount.trim();
    let invalid = |reason: &str| ParseError::Price {
        input: amount.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("empty amount"));
    }

    let value = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|e| invalid(&e.to_string()))?;

    let scale = 10i64
        .checked_pow(decimals)
        .map(Decimal::from)
        .ok_or_else(|| invalid("too many decimals"))?;

    let minor = value
        .checked_mul(scale)
        .ok_or_else(|| invalid("amount out of range"))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| invalid("amount out of range"))?;

    Ok(Money {
        amount: minor,
        currency: normalize_currency(currency),
    })
}

pub fn normalize_currency(currency: &str) -> String {
    currency.trim().to_uppercase()
}

// Operating carrier wins over the marketing carrier when present
pub fn resolve_carrier(marketing: &str, operating: Option<&str>) -> String {
    match operating.map(str::trim) {
        Some(op) if !op.is_empty() => op.to_string(),
        _ => marketing.trim().to_string(),
    }
}

pub fn qualify_flight_number(carrier: &str, number: &str) -> String {
    let number = number.trim();
    if !carrier.is_empty() && !number.is_empty() && !number.starts_with(carrier) {
        format!("{}{}", carrier, number)
    } else {
        number.to_string()
    }
}

/// Flattens provider error fragments into one human readable line.
///
/// A fragment with both key and value renders as `key: value`, a value-only
/// fragment as the value; everything else is skipped.
pub fn flatten_messages<'a, I>(fragments: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let parts: Vec<String> = fragments
        .into_iter()
        .filter_map(|(key, value)| match (key.trim(), value.trim()) {
            (_, "") => None,
            ("", v) => Some(v.to_string()),
            (k, v) => Some(format!("{}: {}", k, v)),
        })
        .collect();

    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join("; ")
    }
}

// Stable, so legs sharing a departure keep provider order
pub fn order_segments(segments: &mut [Segment]) {
    segments.sort_by_key(|s| s.depart_at);
}
