//! # Registration Validator Schema
//!
//! Data types consumed by the registration spending validator. A student's
//! enrollment UTxO is locked with a [`RegistrationDatum`] naming the student,
//! and unlocked with a [`RegistrationRedeemer`] that states the action and
//! points back at the outpoint being consumed.
//!
//! ```text
//!   datum    = Constructor 0 [ Bytes pkh ]
//!   redeemer = Constructor 0 [ Constructor action []
//!                            , Bytes pkh
//!                            , Constructor 0 [ Bytes tx_hash, Int index ] ]
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::plutus_data::{PlutusError, PlutusValue, ToPlutus};

/// What the redeemer asks the validator to do with the enrollment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationAction {
    #[default]
    Register,
    Cancel,
}

impl RegistrationAction {
    /// Constructor index of the action in the validator's type.
    pub fn tag(self) -> u64 {
        match self {
            RegistrationAction::Register => 0,
            RegistrationAction::Cancel => 1,
        }
    }
}

impl fmt::Display for RegistrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationAction::Register => write!(f, "register"),
            RegistrationAction::Cancel => write!(f, "cancel"),
        }
    }
}

/// A transaction output reference, `tx_hash#output_index`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputReference {
    pub tx_hash: String,
    pub output_index: u32,
}

impl OutputReference {
    pub fn new(tx_hash: impl Into<String>, output_index: u32) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            output_index,
        }
    }
}

impl fmt::Display for OutputReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.output_index)
    }
}

impl ToPlutus for OutputReference {
    fn to_plutus(&self) -> Result<PlutusValue, PlutusError> {
        Ok(PlutusValue::constr(
            0,
            vec![
                PlutusValue::checked_bytes("txHash", &self.tx_hash)?,
                PlutusValue::int(i64::from(self.output_index)),
            ],
        ))
    }
}

/// Datum locking an enrollment UTxO.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationDatum {
    pub student_pkh: String,
}

impl ToPlutus for RegistrationDatum {
    fn to_plutus(&self) -> Result<PlutusValue, PlutusError> {
        Ok(PlutusValue::constr(
            0,
            vec![PlutusValue::checked_bytes("studentPkh", &self.student_pkh)?],
        ))
    }
}

/// Redeemer spending an enrollment UTxO.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationRedeemer {
    pub action: RegistrationAction,
    pub student_pkh: String,
    pub source: OutputReference,
}

impl ToPlutus for RegistrationRedeemer {
    fn to_plutus(&self) -> Result<PlutusValue, PlutusError> {
        Ok(PlutusValue::constr(
            0,
            vec![
                PlutusValue::constr(self.action.tag(), Vec::new()),
                PlutusValue::checked_bytes("studentPkh", &self.student_pkh)?,
                self.source.to_plutus()?,
            ],
        ))
    }
}
