//! # Ledger Settings
//!
//! Everything a pipeline needs to know about its environment: where the
//! wallet files live, which token it moves, which network it talks to, and
//! the lovelace amounts the flows commit to. Loaded once at startup from a
//! JSON document and shared read-only by every run.
//!
//! Relative paths resolve against `baseDir`. A relative path with no
//! `baseDir` configured is a configuration error, never a silent guess at the
//! process working directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ayllu_contracts::IntKey;

use crate::network::NetworkFlag;
use crate::scratch::ScratchSpace;
use crate::utxo::AssetId;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Ledger tool executable looked up on `PATH`.
pub const DEFAULT_CLI_PATH: &str = "cardano-cli";

/// Era subcommand prefixed to every `transaction` command.
pub const DEFAULT_ERA: &str = "conway";

/// Lovelace attached to the receiver's output in a token transfer (10 ADA).
pub const DEFAULT_RECEIVER_LOVELACE: u64 = 10_000_000;

/// Headroom kept for the change output (1 ADA).
pub const DEFAULT_CHANGE_BUFFER_LOVELACE: u64 = 1_000_000;

/// Upper estimate of the transaction fee (0.5 ADA).
pub const DEFAULT_FEE_ESTIMATE_LOVELACE: u64 = 500_000;

/// UTxOs carrying less than this are never used as ADA top-ups (1 ADA).
pub const DEFAULT_DUST_THRESHOLD_LOVELACE: u64 = 1_000_000;

/// Lovelace sent back to the student by a registration transaction (2 ADA).
pub const DEFAULT_STUDENT_OUTPUT_LOVELACE: u64 = 2_000_000;

/// Blueprint entry spent by registration.
pub const DEFAULT_VALIDATOR_TITLE: &str = "registration_validator.registration_validator.spend";

/// Largest token amount a single claim may request.
pub const DEFAULT_MAX_CLAIM_AMOUNT: u64 = 10;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent or blank.
    #[error("missing setting: {0}")]
    Missing(&'static str),

    /// A relative path was configured without a base directory.
    #[error("relative path {} requires baseDir", .0.display())]
    RelativeWithoutBase(PathBuf),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// A setting is present but unusable.
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Lovelace amounts the transfer flow commits to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionPolicy {
    pub receiver_lovelace: u64,
    pub change_buffer_lovelace: u64,
    pub fee_estimate_lovelace: u64,
    pub dust_threshold_lovelace: u64,
}

impl SelectionPolicy {
    /// ADA the selected inputs must cover: receiver output plus change
    /// buffer plus fee estimate.
    pub fn required_ada_floor(&self) -> u64 {
        self.receiver_lovelace
            .saturating_add(self.change_buffer_lovelace)
            .saturating_add(self.fee_estimate_lovelace)
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            receiver_lovelace: DEFAULT_RECEIVER_LOVELACE,
            change_buffer_lovelace: DEFAULT_CHANGE_BUFFER_LOVELACE,
            fee_estimate_lovelace: DEFAULT_FEE_ESTIMATE_LOVELACE,
            dust_threshold_lovelace: DEFAULT_DUST_THRESHOLD_LOVELACE,
        }
    }
}

/// Registration flow parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationSettings {
    pub validator_title: String,
    pub student_output_lovelace: u64,
    /// Key used for integer leaves in datum and redeemer files. Set here
    /// because blueprint manifests carry no marker for the spelling a
    /// validator's deserializer expects.
    pub int_key: IntKey,
}

impl Default for RegistrationSettings {
    fn default() -> Self {
        Self {
            validator_title: DEFAULT_VALIDATOR_TITLE.to_string(),
            student_output_lovelace: DEFAULT_STUDENT_OUTPUT_LOVELACE,
            int_key: IntKey::Int,
        }
    }
}

/// Process-wide ledger settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerSettings {
    pub base_dir: Option<PathBuf>,
    /// File holding the sender (faucet) address.
    pub wallet_address_path: Option<PathBuf>,
    pub signing_key_path: Option<PathBuf>,
    pub policy_id: Option<String>,
    pub token_hex: Option<String>,
    /// Compiled-contract manifest (`plutus.json`).
    pub blueprint_path: Option<PathBuf>,
    /// Free-form network, canonicalised by [`NetworkFlag::from_setting`].
    pub network: Option<String>,
    pub cli_path: String,
    pub era: String,
    pub scratch_root: Option<PathBuf>,
    pub selection: SelectionPolicy,
    pub registration: RegistrationSettings,
    pub max_claim_amount: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            base_dir: None,
            wallet_address_path: None,
            signing_key_path: None,
            policy_id: None,
            token_hex: None,
            blueprint_path: None,
            network: None,
            cli_path: DEFAULT_CLI_PATH.to_string(),
            era: DEFAULT_ERA.to_string(),
            scratch_root: None,
            selection: SelectionPolicy::default(),
            registration: RegistrationSettings::default(),
            max_claim_amount: DEFAULT_MAX_CLAIM_AMOUNT,
        }
    }
}

impl LedgerSettings {
    /// Parse settings JSON. Accepts the settings object bare or nested
    /// under a top-level `"cardano"` key.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let mut value: serde_json::Value = serde_json::from_str(text)?;
        if let Some(inner) = value.get_mut("cardano") {
            value = inner.take();
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Read and parse a settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Resolve `path` against `baseDir` unless it is already absolute.
    pub fn resolve_path(&self, path: &Path) -> Result<PathBuf, ConfigError> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        match &self.base_dir {
            Some(base) => Ok(base.join(path)),
            None => Err(ConfigError::RelativeWithoutBase(path.to_path_buf())),
        }
    }

    fn required_path(
        &self,
        value: &Option<PathBuf>,
        name: &'static str,
    ) -> Result<PathBuf, ConfigError> {
        match value {
            Some(p) if !p.as_os_str().is_empty() => self.resolve_path(p),
            _ => Err(ConfigError::Missing(name)),
        }
    }

    pub fn network_flag(&self) -> Result<NetworkFlag, ConfigError> {
        match self.network.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Ok(NetworkFlag::from_setting(raw)),
            _ => Err(ConfigError::Missing("network")),
        }
    }

    pub fn signing_key(&self) -> Result<PathBuf, ConfigError> {
        self.required_path(&self.signing_key_path, "signingKeyPath")
    }

    pub fn wallet_address_file(&self) -> Result<PathBuf, ConfigError> {
        self.required_path(&self.wallet_address_path, "walletAddressPath")
    }

    pub fn blueprint(&self) -> Result<PathBuf, ConfigError> {
        self.required_path(&self.blueprint_path, "blueprintPath")
    }

    /// Read the sender address from `walletAddressPath`, trimmed.
    pub fn sender_address(&self) -> Result<String, ConfigError> {
        let path = self.wallet_address_file()?;
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let address = text.trim();
        if address.is_empty() {
            return Err(ConfigError::Invalid {
                name: "walletAddressPath",
                reason: format!("{} is empty", path.display()),
            });
        }
        Ok(address.to_string())
    }

    /// The native asset moved by the transfer flow.
    pub fn asset(&self) -> Result<AssetId, ConfigError> {
        let policy = non_blank(&self.policy_id).ok_or(ConfigError::Missing("policyId"))?;
        let name = non_blank(&self.token_hex).ok_or(ConfigError::Missing("tokenHex"))?;
        Ok(AssetId::new(policy, name))
    }

    /// Scratch space for per-run artifacts.
    pub fn scratch_space(&self) -> Result<ScratchSpace, ConfigError> {
        match &self.scratch_root {
            Some(root) => Ok(ScratchSpace::new(self.resolve_path(root)?)),
            None => Ok(ScratchSpace::system()),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_amounts() {
        let s = LedgerSettings::default();
        assert_eq!(s.cli_path, "cardano-cli");
        assert_eq!(s.era, "conway");
        assert_eq!(s.selection.required_ada_floor(), 11_500_000);
        assert_eq!(s.selection.dust_threshold_lovelace, 1_000_000);
        assert_eq!(s.registration.student_output_lovelace, 2_000_000);
        assert_eq!(s.registration.int_key, IntKey::Int);
        assert_eq!(s.max_claim_amount, 10);
    }

    #[test]
    fn parses_nested_cardano_section() {
        let json = r#"{
            "cardano": {
                "baseDir": "/srv/ayllu",
                "walletAddressPath": "wallet/payment.addr",
                "signingKeyPath": "/keys/payment.skey",
                "policyId": "abcd",
                "tokenHex": "4e4f5641",
                "network": "testnet 2",
                "selection": { "receiverLovelace": 5000000 }
            }
        }"#;
        let s = LedgerSettings::from_json(json).unwrap();
        assert_eq!(s.selection.receiver_lovelace, 5_000_000);
        // Unspecified nested fields keep their defaults.
        assert_eq!(s.selection.fee_estimate_lovelace, 500_000);
        assert_eq!(
            s.wallet_address_file().unwrap(),
            PathBuf::from("/srv/ayllu/wallet/payment.addr")
        );
        assert_eq!(s.signing_key().unwrap(), PathBuf::from("/keys/payment.skey"));
        assert_eq!(s.network_flag().unwrap().as_str(), "--testnet-magic 2");
        assert_eq!(s.asset().unwrap().unit(), "abcd.4e4f5641");
    }

    #[test]
    fn parses_bare_settings() {
        let s = LedgerSettings::from_json(r#"{"network":"mainnet","era":"babbage"}"#).unwrap();
        assert_eq!(s.era, "babbage");
        assert_eq!(s.network_flag().unwrap().as_str(), "--mainnet");
    }

    #[test]
    fn relative_path_without_base_is_rejected() {
        let s = LedgerSettings {
            signing_key_path: Some("payment.skey".into()),
            ..Default::default()
        };
        assert!(matches!(
            s.signing_key(),
            Err(ConfigError::RelativeWithoutBase(_))
        ));
    }

    #[test]
    fn missing_settings_are_named() {
        let s = LedgerSettings::default();
        assert!(matches!(s.network_flag(), Err(ConfigError::Missing("network"))));
        assert!(matches!(s.asset(), Err(ConfigError::Missing("policyId"))));
        assert!(matches!(s.blueprint(), Err(ConfigError::Missing("blueprintPath"))));
    }

    #[test]
    fn sender_address_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("payment.addr"), "  addr_test1vzsender \n").unwrap();
        let s = LedgerSettings {
            base_dir: Some(dir.path().to_path_buf()),
            wallet_address_path: Some("payment.addr".into()),
            ..Default::default()
        };
        assert_eq!(s.sender_address().unwrap(), "addr_test1vzsender");
    }

    #[test]
    fn empty_address_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("payment.addr"), "\n").unwrap();
        let s = LedgerSettings {
            base_dir: Some(dir.path().to_path_buf()),
            wallet_address_path: Some("payment.addr".into()),
            ..Default::default()
        };
        assert!(matches!(s.sender_address(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = LedgerSettings::load(Path::new("/nonexistent/ayllu.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
