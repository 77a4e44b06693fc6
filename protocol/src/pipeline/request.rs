//! Pipeline requests.
//!
//! These are also the HTTP request bodies, so their JSON field names are a
//! public contract.

use serde::{Deserialize, Serialize};

use ayllu_contracts::RegistrationAction;

use crate::error::PipelineError;

/// Send `amount` tokens (plus the receiver lovelace) to `receiver_address`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub receiver_address: String,
    pub amount: u64,
}

impl TransferRequest {
    pub fn new(receiver_address: impl Into<String>, amount: u64) -> Self {
        Self {
            receiver_address: receiver_address.into(),
            amount,
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.amount == 0 {
            return Err(PipelineError::InvalidRequest(
                "token amount must be greater than zero".into(),
            ));
        }
        if self.receiver_address.trim().is_empty() {
            return Err(PipelineError::InvalidRequest("receiver address is empty".into()));
        }
        Ok(())
    }
}

/// Spend the enrollment UTxO `tx_hash#output_index` on behalf of a student.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub student_address: String,
    #[serde(rename = "studentPKH", alias = "studentPkh")]
    pub student_pkh: String,
    pub tx_hash: String,
    pub output_index: u32,
    #[serde(default)]
    pub action: RegistrationAction,
}

impl RegistrationRequest {
    pub fn validate(&self) -> Result<(), PipelineError> {
        let blank = [
            ("studentAddress", &self.student_address),
            ("studentPKH", &self.student_pkh),
            ("txHash", &self.tx_hash),
        ]
        .into_iter()
        .find(|(_, v)| v.trim().is_empty());

        match blank {
            Some((name, _)) => Err(PipelineError::InvalidRequest(format!("{name} is empty"))),
            None => Ok(()),
        }
    }
}
