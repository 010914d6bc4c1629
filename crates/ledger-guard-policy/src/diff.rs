//! Field-diff guard: which fields an update may touch, by resource type.

use crate::types::{Document, ResourceType};
use serde_json::Value;
use std::collections::BTreeSet;

/// Fields a wallet update may change
pub const WALLET_MUTABLE_FIELDS: [&str; 4] = ["balance", "transactions", "lastModified", "transactionHash"];

pub struct FieldDiffGuard;

impl FieldDiffGuard {
    /// Whether updating `before` into `after` only touches permitted fields
    pub fn is_permitted_diff(resource_type: ResourceType, before: &Document, after: &Document) -> bool {
        match resource_type {
            ResourceType::Wallet => Self::disallowed_fields(resource_type, before, after).is_empty(),
            ResourceType::Transaction | ResourceType::AuditLog => false,
        }
    }

    /// Changed fields outside the resource type's allowlist, sorted
    pub fn disallowed_fields(resource_type: ResourceType, before: &Document, after: &Document) -> Vec<String> {
        let allowed: &[&str] = match resource_type {
            ResourceType::Wallet => &WALLET_MUTABLE_FIELDS,
            ResourceType::Transaction | ResourceType::AuditLog => &[],
        };

        Self::changed_fields(before, after)
            .into_iter()
            .filter(|field| !allowed.contains(&field.as_str()))
            .collect()
    }

    /// Names of fields added, removed or modified between two snapshots
    pub fn changed_fields(before: &Document, after: &Document) -> BTreeSet<String> {
        before
            .keys()
            .chain(after.keys())
            .filter(|key| match (before.get(*key), after.get(*key)) {
                (Some(a), Some(b)) => !values_equal(a, b),
                _ => true,
            })
            .cloned()
            .collect()
    }
}

/// Deep equality that treats `100` and `100.0` as the same number
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(ix), Some(iy)) = (x.as_i64(), y.as_i64()) {
                return ix == iy;
            }
            if let (Some(ux), Some(uy)) = (x.as_u64(), y.as_u64()) {
                return ux == uy;
            }
            // Distinct integers stay distinct even where f64 rounds them together
            if !(x.is_f64() || y.is_f64()) {
                return false;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(fx), Some(fy)) => fx == fy,
                _ => false,
            }
        }
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}
