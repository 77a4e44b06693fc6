//! # Validator Parameters and Minting Schema
//!
//! Parameters applied to the registration validator and the certificate
//! minting policy when they are instantiated, plus the minting redeemer.
//! No flow in this service applies them; they are encoded for tooling that
//! parameterizes the validators ahead of deployment.
//!
//! ```text
//!   RegParam  = Constructor 0 [ Bytes registrar_pkh ]
//!   MintParam = Constructor 0 [ Bytes registrar_pkh
//!                             , Bytes token_name
//!                             , Constructor 0 [ Bytes tx_id, Int index ]
//!                             , Bytes student_pkh ]
//! ```

use crate::plutus_data::{PlutusError, PlutusValue, ToPlutus};
use crate::registration::OutputReference;

/// Parameter of the registration validator: who may register students.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegParam {
    pub registrar_pkh: String,
}

impl ToPlutus for RegParam {
    fn to_plutus(&self) -> Result<PlutusValue, PlutusError> {
        Ok(PlutusValue::constr(
            0,
            vec![PlutusValue::checked_bytes("registrarPkh", &self.registrar_pkh)?],
        ))
    }
}

/// Parameter of the minting policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintParam {
    pub registrar_pkh: String,
    /// Asset name, hex.
    pub token_name: String,
    /// One-shot outpoint that must be consumed by the minting transaction.
    pub utxo: OutputReference,
    pub student_pkh: String,
}

impl ToPlutus for MintParam {
    fn to_plutus(&self) -> Result<PlutusValue, PlutusError> {
        Ok(PlutusValue::constr(
            0,
            vec![
                PlutusValue::checked_bytes("registrarPkh", &self.registrar_pkh)?,
                PlutusValue::checked_bytes("tokenName", &self.token_name)?,
                self.utxo.to_plutus()?,
                PlutusValue::checked_bytes("studentPkh", &self.student_pkh)?,
            ],
        ))
    }
}

/// The minting policy takes a unit redeemer.
pub fn mint_redeemer() -> PlutusValue {
    PlutusValue::unit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plutus_data::IntKey;
    use serde_json::json;

    #[test]
    fn reg_param_layout() {
        let p = RegParam {
            registrar_pkh: "00ff".into(),
        };
        assert_eq!(
            p.to_plutus().unwrap().encode(IntKey::Int),
            json!({ "constructor": 0, "fields": [{ "bytes": "00ff" }] })
        );
    }

    #[test]
    fn mint_param_layout_with_legacy_int_key() {
        let p = MintParam {
            registrar_pkh: "01".into(),
            token_name: "4159".into(),
            utxo: OutputReference::new("abab", 2),
            student_pkh: "02".into(),
        };
        assert_eq!(
            p.to_plutus().unwrap().encode(IntKey::IntUnderscore),
            json!({
                "constructor": 0,
                "fields": [
                    { "bytes": "01" },
                    { "bytes": "4159" },
                    { "constructor": 0, "fields": [{ "bytes": "abab" }, { "int_": 2 }] },
                    { "bytes": "02" }
                ]
            })
        );
    }

    #[test]
    fn mint_param_rejects_plain_text_token_name() {
        let p = MintParam {
            registrar_pkh: "01".into(),
            token_name: "AYLLU".into(),
            utxo: OutputReference::new("abab", 0),
            student_pkh: "02".into(),
        };
        let err = p.to_plutus().unwrap_err();
        assert!(err.to_string().contains("tokenName"));
    }

    #[test]
    fn mint_redeemer_is_unit() {
        assert_eq!(
            mint_redeemer().encode(IntKey::Int),
            json!({ "constructor": 0, "fields": [] })
        );
    }
}
