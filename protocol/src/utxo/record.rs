//! UTxO records and the ledger query format.
//!
//! `query utxo --out-file` writes a JSON object keyed by `"<txhash>#<index>"`.
//! Each entry carries a `value` map: `lovelace` plus one nested map per
//! policy id, keyed by hex asset name.
//!
//! ```json
//! {
//!   "ab12..#0": {
//!     "address": "addr_test1...",
//!     "value": { "lovelace": 5000000, "<policy>": { "<asset>": 7 } }
//!   }
//! }
//! ```

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum UtxoParseError {
    #[error("query output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("query output is not a JSON object")]
    NotAnObject,

    /// An entry has no `value` map.
    #[error("utxo {id} has no value map")]
    MissingValue { id: String },

    /// A quantity is not a non-negative integer.
    #[error("utxo {id} has a non-integer {field} quantity")]
    InvalidQuantity { id: String, field: String },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A native asset: minting policy plus hex asset name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetId {
    pub policy_id: String,
    pub asset_name: String,
}

impl AssetId {
    pub fn new(policy_id: impl Into<String>, asset_name: impl Into<String>) -> Self {
        Self {
            policy_id: policy_id.into(),
            asset_name: asset_name.into(),
        }
    }

    /// `<policy>.<asset>`, the spelling the ledger tool expects in outputs.
    pub fn unit(&self) -> String {
        format!("{}.{}", self.policy_id, self.asset_name)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.policy_id, self.asset_name)
    }
}

/// One spendable output, reduced to what selection needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UtxoRecord {
    /// `"<txhash>#<index>"`.
    pub id: String,
    /// Lovelace held.
    pub ada_amount: u64,
    /// Units of the configured asset held; zero if absent.
    pub token_amount: u64,
}

impl UtxoRecord {
    pub fn new(id: impl Into<String>, ada_amount: u64, token_amount: u64) -> Self {
        Self {
            id: id.into(),
            ada_amount,
            token_amount,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a `query utxo` result, extracting lovelace and `asset` quantities.
///
/// Entries whose value map lacks `lovelace` are skipped: they cannot pay
/// for anything. Entries without the asset get `token_amount = 0`.
pub fn parse_utxo_query(json: &str, asset: &AssetId) -> Result<Vec<UtxoRecord>, UtxoParseError> {
    let root: Value = serde_json::from_str(json)?;
    let entries = root.as_object().ok_or(UtxoParseError::NotAnObject)?;

    let mut records = Vec::with_capacity(entries.len());
    for (id, entry) in entries {
        let value = entry
            .get("value")
            .and_then(Value::as_object)
            .ok_or_else(|| UtxoParseError::MissingValue { id: id.clone() })?;

        let Some(lovelace) = value.get("lovelace") else {
            continue;
        };
        let ada_amount = quantity(id, "lovelace", lovelace)?;
        let token_amount = match token_quantity(value, asset) {
            Some(q) => quantity(id, &asset.unit(), q)?,
            None => 0,
        };

        records.push(UtxoRecord::new(id.clone(), ada_amount, token_amount));
    }
    Ok(records)
}

fn token_quantity<'a>(value: &'a Map<String, Value>, asset: &AssetId) -> Option<&'a Value> {
    value
        .get(&asset.policy_id)
        .and_then(Value::as_object)
        .and_then(|assets| assets.get(&asset.asset_name))
}

fn quantity(id: &str, field: &str, v: &Value) -> Result<u64, UtxoParseError> {
    v.as_u64().ok_or_else(|| UtxoParseError::InvalidQuantity {
        id: id.to_string(),
        field: field.to_string(),
    })
}
