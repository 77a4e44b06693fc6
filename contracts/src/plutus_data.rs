//! # Plutus Data Encoding
//!
//! Datums and redeemers are handed to the ledger tool as JSON files in its
//! "detailed schema" form: every node of the data tree is an object tagged by
//! its kind.
//!
//! ```text
//!   Constructor(0, [Bytes("ab"), Int(3)])
//!
//!   {"constructor":0,"fields":[{"bytes":"ab"},{"int":3}]}
//! ```
//!
//! The encoder is purely structural. It never reorders fields, never checks
//! that a tag is meaningful for the consuming validator, and never touches
//! the filesystem. Field order and constructor tags are fixed by the
//! validator's on-chain type, so two trees that differ only in field order
//! encode to different documents.
//!
//! The integer leaf key is not uniform across validators: some deserializers
//! want `"int"`, some were compiled against `"int_"`. Callers choose via
//! [`IntKey`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while building Plutus data from untrusted input.
#[derive(Debug, Error)]
pub enum PlutusError {
    /// A byte-string leaf was given text that is not valid hex.
    #[error("{field} is not valid hex ({value:?}): {source}")]
    InvalidHex {
        /// Schema field that rejected the value.
        field: &'static str,
        /// The offending input.
        value: String,
        #[source]
        source: hex::FromHexError,
    },
}

// ---------------------------------------------------------------------------
// Key spelling
// ---------------------------------------------------------------------------

/// Spelling of the integer leaf key expected by a consuming validator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntKey {
    /// `{"int": n}`, the ledger tool's canonical spelling.
    #[default]
    #[serde(rename = "int")]
    Int,
    /// `{"int_": n}`, accepted by validators built against the older schema.
    #[serde(rename = "int_")]
    IntUnderscore,
}

impl IntKey {
    /// The JSON object key this spelling produces.
    pub fn as_str(self) -> &'static str {
        match self {
            IntKey::Int => "int",
            IntKey::IntUnderscore => "int_",
        }
    }
}

// ---------------------------------------------------------------------------
// PlutusValue
// ---------------------------------------------------------------------------

/// A node of the structured data tree passed to a Plutus validator.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PlutusValue {
    /// Hex-encoded byte string.
    Bytes(String),
    /// Signed integer.
    Int(i64),
    /// Tagged constructor with ordered fields.
    Constructor {
        /// Constructor index, as declared by the validator's type.
        tag: u64,
        /// Fields in declaration order.
        fields: Vec<PlutusValue>,
    },
}

impl PlutusValue {
    /// Byte-string leaf. The text is taken as-is.
    pub fn bytes(hex: impl Into<String>) -> Self {
        PlutusValue::Bytes(hex.into())
    }

    /// Byte-string leaf that rejects anything `hex` cannot decode.
    pub fn checked_bytes(field: &'static str, hex: &str) -> Result<Self, PlutusError> {
        hex::decode(hex).map_err(|source| PlutusError::InvalidHex {
            field,
            value: hex.to_string(),
            source,
        })?;
        Ok(PlutusValue::Bytes(hex.to_ascii_lowercase()))
    }

    /// Integer leaf.
    pub fn int(value: i64) -> Self {
        PlutusValue::Int(value)
    }

    /// Constructor node.
    pub fn constr(tag: u64, fields: Vec<PlutusValue>) -> Self {
        PlutusValue::Constructor { tag, fields }
    }

    /// `Constructor(0, [])`, the encoding of `Void`/unit.
    pub fn unit() -> Self {
        PlutusValue::constr(0, Vec::new())
    }

    /// Encode this tree with the given integer key spelling.
    pub fn encode(&self, int_key: IntKey) -> Value {
        encode(self, int_key)
    }

    /// Compact JSON text of [`PlutusValue::encode`].
    pub fn to_json_string(&self, int_key: IntKey) -> String {
        encode(self, int_key).to_string()
    }
}

/// Types with a fixed on-chain data layout.
///
/// Implementations build real [`PlutusValue`] variants so every call site
/// shares one definition of each validator type.
pub trait ToPlutus {
    /// Build the data tree, validating any hex inputs on the way.
    fn to_plutus(&self) -> Result<PlutusValue, PlutusError>;
}

/// Map a [`PlutusValue`] tree onto the ledger tool's detailed JSON schema.
///
/// Deterministic: the same tree and key spelling always produce the same
/// document, byte for byte.
pub fn encode(value: &PlutusValue, int_key: IntKey) -> Value {
    let mut node = Map::new();
    match value {
        PlutusValue::Bytes(hex) => {
            node.insert("bytes".to_string(), Value::String(hex.clone()));
        }
        PlutusValue::Int(n) => {
            node.insert(int_key.as_str().to_string(), Value::from(*n));
        }
        PlutusValue::Constructor { tag, fields } => {
            node.insert("constructor".to_string(), Value::from(*tag));
            node.insert(
                "fields".to_string(),
                Value::Array(fields.iter().map(|f| encode(f, int_key)).collect()),
            );
        }
    }
    Value::Object(node)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
