//! Structural validation of money-moving writes.

use crate::types::Document;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::fmt;

/// Required length of `hash` and `transactionHash` (hex-encoded SHA-256)
pub const HASH_LENGTH: usize = 64;

/// First structural check a proposed document failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub field: &'static str,
    pub message: String,
}

impl ValidationFailure {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Write validator for transaction and wallet documents
pub struct WriteValidator;

impl WriteValidator {
    /// Whether a proposed transaction passes every structural check
    pub fn validate_transaction_write(proposed: &Document) -> bool {
        Self::check_transaction_write(proposed).is_ok()
    }

    /// Check a proposed transaction, reporting the first failure
    ///
    /// Order: `amount > 0`, `timestamp` is a timestamp value, `hash` is a
    /// string of exactly 64 characters.
    pub fn check_transaction_write(proposed: &Document) -> Result<(), ValidationFailure> {
        match proposed.get("amount").and_then(decimal_from_value) {
            Some(amount) if amount > Decimal::ZERO => {}
            Some(_) => return Err(ValidationFailure::new("amount", "must be greater than zero")),
            None => return Err(ValidationFailure::new("amount", "must be a number")),
        }

        if proposed.get("timestamp").and_then(timestamp_from_value).is_none() {
            return Err(ValidationFailure::new("timestamp", "must be a timestamp value"));
        }

        check_hash(proposed, "hash")
    }

    /// Whether a proposed wallet passes every structural check
    pub fn validate_wallet_write(proposed: &Document) -> bool {
        Self::check_wallet_write(proposed).is_ok()
    }

    /// Check a proposed wallet's integrity fields, reporting the first failure
    ///
    /// Order: `balance` is a non-negative number, `lastModified` is a
    /// timestamp value, `transactionHash` is a string of exactly 64 characters.
    pub fn check_wallet_write(proposed: &Document) -> Result<(), ValidationFailure> {
        match proposed.get("balance").and_then(decimal_from_value) {
            Some(balance) if balance >= Decimal::ZERO => {}
            Some(_) => return Err(ValidationFailure::new("balance", "must not be negative")),
            None => return Err(ValidationFailure::new("balance", "must be a number")),
        }

        if proposed.get("lastModified").and_then(timestamp_from_value).is_none() {
            return Err(ValidationFailure::new("lastModified", "must be a timestamp value"));
        }

        check_hash(proposed, "transactionHash")
    }
}

fn check_hash(proposed: &Document, field: &'static str) -> Result<(), ValidationFailure> {
    match proposed.get(field) {
        Some(Value::String(hash)) if hash.chars().count() == HASH_LENGTH => Ok(()),
        Some(Value::String(hash)) => Err(ValidationFailure::new(
            field,
            format!(
                "must be exactly {} characters, got {}",
                HASH_LENGTH,
                hash.chars().count()
            ),
        )),
        _ => Err(ValidationFailure::new(field, "must be a string")),
    }
}

/// Interpret a JSON number as a decimal amount
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    let Value::Number(n) = value else {
        return None;
    };

    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    n.as_f64().filter(|f| f.is_finite()).and_then(Decimal::from_f64)
}

/// Interpret a JSON value as a timestamp
///
/// Timestamps are integer Unix epoch milliseconds. Strings, floats and
/// `null` are rejected.
pub fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_i64()
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn valid_transaction() -> Document {
        doc(json!({
            "userId": "u1",
            "amount": 50,
            "timestamp": 1_705_320_000_000i64,
            "hash": "a".repeat(64),
        }))
    }

    #[test]
    fn test_valid_transaction_passes() {
        assert!(WriteValidator::validate_transaction_write(&valid_transaction()));
    }

    #[test]
    fn test_fractional_amount_passes() {
        let mut tx = valid_transaction();
        tx.insert("amount".into(), json!(0.01));
        assert!(WriteValidator::validate_transaction_write(&tx));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        for amount in [json!(-5), json!(0), json!(0.0), json!("50"), Value::Null] {
            let mut tx = valid_transaction();
            tx.insert("amount".into(), amount);
            let failure = WriteValidator::check_transaction_write(&tx).unwrap_err();
            assert_eq!(failure.field, "amount");
        }
    }

    #[test]
    fn test_timestamp_must_be_timestamp_value() {
        for ts in [json!("2024-01-15T12:00:00Z"), Value::Null, json!(1.5), json!(true)] {
            let mut tx = valid_transaction();
            tx.insert("timestamp".into(), ts);
            let failure = WriteValidator::check_transaction_write(&tx).unwrap_err();
            assert_eq!(failure.field, "timestamp");
        }

        let mut tx = valid_transaction();
        tx.remove("timestamp");
        assert!(!WriteValidator::validate_transaction_write(&tx));
    }

    #[test]
    fn test_hash_length_boundaries() {
        for (len, ok) in [(63, false), (64, true), (65, false)] {
            let mut tx = valid_transaction();
            tx.insert("hash".into(), json!("f".repeat(len)));
            assert_eq!(WriteValidator::validate_transaction_write(&tx), ok, "len {}", len);
        }
    }

    #[test]
    fn test_hash_counts_characters_not_bytes() {
        let mut tx = valid_transaction();
        tx.insert("hash".into(), json!("é".repeat(64)));
        assert!(WriteValidator::validate_transaction_write(&tx));
    }

    #[test]
    fn test_first_failure_is_reported() {
        let tx = doc(json!({"amount": -1, "timestamp": "now", "hash": "x"}));
        let failure = WriteValidator::check_transaction_write(&tx).unwrap_err();
        assert_eq!(failure.field, "amount");
        assert_eq!(failure.to_string(), "amount must be greater than zero");
    }

    #[test]
    fn test_wallet_write() {
        let wallet = doc(json!({
            "ownerId": "u1",
            "balance": 0,
            "lastModified": 1_705_320_000_000i64,
            "transactionHash": "b".repeat(64),
        }));
        assert!(WriteValidator::validate_wallet_write(&wallet));

        let mut negative = wallet.clone();
        negative.insert("balance".into(), json!(-0.5));
        assert_eq!(WriteValidator::check_wallet_write(&negative).unwrap_err().field, "balance");

        let mut stale_hash = wallet;
        stale_hash.insert("transactionHash".into(), json!("b".repeat(10)));
        assert_eq!(
            WriteValidator::check_wallet_write(&stale_hash).unwrap_err().field,
            "transactionHash"
        );
    }
}
