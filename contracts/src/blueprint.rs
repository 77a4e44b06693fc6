//! # Blueprint Manifests
//!
//! A blueprint is the compiled-contract manifest emitted by the Aiken
//! toolchain (`plutus.json`). We only read the `validators` array and, within
//! each entry, the `title`, `compiledCode` and `hash` fields; everything else
//! in the document (preamble, datum/redeemer schemas, definitions) is ignored.
//!
//! Lookups re-read the file every time. Blueprints change when contracts are
//! recompiled and the service is expected to pick that up without a restart.
//!
//! The ledger tool does not consume blueprints directly. A validator is
//! handed to it as a text envelope:
//!
//! ```json
//! {"type":"PlutusScriptV2","description":"Compiled Aiken Script","cborHex":"59..."}
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Script language tag written into every envelope.
pub const PLUTUS_SCRIPT_V2: &str = "PlutusScriptV2";

/// Envelope description used for spending scripts attached to a transaction.
pub const COMPILED_SCRIPT_DESCRIPTION: &str = "Compiled Aiken Script";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while loading a blueprint or writing envelopes.
#[derive(Debug, Error)]
pub enum BlueprintError {
    /// The manifest or envelope file could not be read or written.
    #[error("blueprint I/O error at {}: {source}", .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON or does not match the expected shape.
    #[error("malformed blueprint: {0}")]
    Malformed(#[from] serde_json::Error),

    /// No validator in the manifest carries the requested title.
    #[error("validator not found in blueprint: {title}")]
    ValidatorNotFound {
        /// The title that was looked up.
        title: String,
    },

    /// The manifest declares no validators at all.
    #[error("blueprint declares no validators")]
    Empty,
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// A parsed blueprint manifest.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Blueprint {
    /// Validators in manifest order.
    #[serde(default)]
    pub validators: Vec<BlueprintValidator>,
}

/// One compiled validator entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintValidator {
    /// Fully qualified title, e.g. `module.validator.spend`.
    pub title: String,
    /// CBOR-encoded script, hex.
    #[serde(default)]
    pub compiled_code: String,
    /// Script hash, hex.
    #[serde(default)]
    pub hash: String,
}

impl Blueprint {
    /// Parse a manifest from JSON text.
    pub fn from_json(text: &str) -> Result<Self, BlueprintError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse the manifest at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BlueprintError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| BlueprintError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Exact-title lookup.
    pub fn find(&self, title: &str) -> Option<&BlueprintValidator> {
        self.validators.iter().find(|v| v.title == title)
    }

    /// Exact-title lookup that reports a miss as an error.
    pub fn validator(&self, title: &str) -> Result<&BlueprintValidator, BlueprintError> {
        self.find(title)
            .ok_or_else(|| BlueprintError::ValidatorNotFound {
                title: title.to_string(),
            })
    }
}

/// Load the manifest at `path` and return the validator titled `title`.
pub fn lookup_validator(
    path: impl AsRef<Path>,
    title: &str,
) -> Result<BlueprintValidator, BlueprintError> {
    Blueprint::load(path)?.validator(title).cloned()
}

impl BlueprintValidator {
    /// Wrap the compiled code in a text envelope with the given description.
    pub fn envelope(&self, description: impl Into<String>) -> ScriptEnvelope {
        ScriptEnvelope::plutus_v2(description, self.compiled_code.clone())
    }
}

// ---------------------------------------------------------------------------
// Text envelope
// ---------------------------------------------------------------------------

/// The ledger tool's text-envelope file format for scripts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEnvelope {
    /// Script language, always [`PLUTUS_SCRIPT_V2`] here.
    #[serde(rename = "type")]
    pub script_type: String,
    /// Free-form description.
    pub description: String,
    /// CBOR-encoded script, hex.
    #[serde(rename = "cborHex")]
    pub cbor_hex: String,
}

impl ScriptEnvelope {
    /// A Plutus V2 envelope around `cbor_hex`.
    pub fn plutus_v2(description: impl Into<String>, cbor_hex: impl Into<String>) -> Self {
        Self {
            script_type: PLUTUS_SCRIPT_V2.to_string(),
            description: description.into(),
            cbor_hex: cbor_hex.into(),
        }
    }

    /// Write the envelope as compact JSON to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), BlueprintError> {
        let path = path.as_ref();
        let json = serde_json::to_vec(self)?;
        fs::write(path, json).map_err(|source| BlueprintError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "preamble": { "title": "ayllu/contracts", "plutusVersion": "v2" },
        "validators": [
            {
                "title": "registration_validator.registration_validator.spend",
                "datum": { "title": "datum", "schema": {} },
                "compiledCode": "5901aa0100",
                "hash": "deadbeef"
            },
            {
                "title": "mint_policy.mint_policy.mint",
                "compiledCode": "4e4d0100",
                "hash": "cafebabe"
            }
        ]
    }"#;

    #[test]
    fn finds_validator_by_exact_title() {
        let bp = Blueprint::from_json(MANIFEST).unwrap();
        let v = bp
            .validator("registration_validator.registration_validator.spend")
            .unwrap();
        assert_eq!(v.compiled_code, "5901aa0100");
        assert_eq!(v.hash, "deadbeef");
    }

    #[test]
    fn title_match_is_exact() {
        let bp = Blueprint::from_json(MANIFEST).unwrap();
        assert!(bp.find("registration_validator").is_none());
        assert!(bp.find("MINT_POLICY.mint_policy.mint").is_none());

        let err = bp.validator("missing.spend").unwrap_err();
        assert!(matches!(err, BlueprintError::ValidatorNotFound { ref title } if title == "missing.spend"));
    }

    #[test]
    fn malformed_manifest_is_reported() {
        let err = Blueprint::from_json("{ not json").unwrap_err();
        assert!(matches!(err, BlueprintError::Malformed(_)));
    }

    #[test]
    fn envelope_uses_ledger_field_names() {
        let bp = Blueprint::from_json(MANIFEST).unwrap();
        let env = bp.validators[1].envelope(COMPILED_SCRIPT_DESCRIPTION);
        let json: serde_json::Value = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "PlutusScriptV2");
        assert_eq!(json["description"], "Compiled Aiken Script");
        assert_eq!(json["cborHex"], "4e4d0100");
    }

    #[test]
    fn load_reads_fresh_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plutus.json");

        fs::write(&path, MANIFEST).unwrap();
        assert!(lookup_validator(&path, "mint_policy.mint_policy.mint").is_ok());

        fs::write(&path, r#"{ "validators": [] }"#).unwrap();
        assert!(lookup_validator(&path, "mint_policy.mint_policy.mint").is_err());
    }

    #[test]
    fn missing_manifest_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Blueprint::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BlueprintError::Io { .. }));
    }
}
