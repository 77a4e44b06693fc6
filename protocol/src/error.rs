//! Pipeline error taxonomy.
//!
//! Every stage reports failures as a [`PipelineError`]. The pipeline tags it
//! with the stage it happened in ([`StageFailure`]) and converts that into a
//! failed [`PipelineOutcome`](crate::pipeline::PipelineOutcome). Nothing
//! escapes a run as a panic or an untyped error.

use std::path::PathBuf;

use thiserror::Error;

use ayllu_contracts::{BlueprintError, PlutusError};

use crate::config::ConfigError;
use crate::pipeline::Stage;
use crate::utxo::{InsufficientFunds, UtxoParseError};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or unusable settings.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The request itself is unusable (blank fields, zero amount).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    InsufficientFunds(#[from] InsufficientFunds),

    /// The ledger tool failed or could not be launched.
    #[error("{stage} command {}: {diagnostic}", exit_label(.exit_code))]
    ExternalProcess {
        stage: Stage,
        exit_code: Option<i32>,
        diagnostic: String,
    },

    /// The tool reported success but did not write its output file.
    #[error("expected artifact was not produced: {}", .expected_path.display())]
    MissingArtifact { expected_path: PathBuf },

    /// No validator with this title in the blueprint.
    #[error("validator not found in blueprint: {title}")]
    BlueprintLookup { title: String },

    /// Encoding or decoding data exchanged with the tool failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Scratch file I/O.
    #[error("i/o error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn exit_label(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exited with status {code}"),
        None => "could not be run".to_string(),
    }
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<UtxoParseError> for PipelineError {
    fn from(e: UtxoParseError) -> Self {
        PipelineError::Serialization(e.to_string())
    }
}

impl From<PlutusError> for PipelineError {
    fn from(e: PlutusError) -> Self {
        PipelineError::Serialization(e.to_string())
    }
}

impl From<BlueprintError> for PipelineError {
    fn from(e: BlueprintError) -> Self {
        match e {
            BlueprintError::ValidatorNotFound { title } => PipelineError::BlueprintLookup { title },
            BlueprintError::Io { path, source } => PipelineError::Io { path, source },
            other => PipelineError::Serialization(other.to_string()),
        }
    }
}

/// A [`PipelineError`] tagged with the stage it aborted.
#[derive(Debug, Error)]
#[error("{stage} failed: {error}")]
pub struct StageFailure {
    pub stage: Stage,
    #[source]
    pub error: PipelineError,
}

impl StageFailure {
    pub fn new(stage: Stage, error: PipelineError) -> Self {
        Self { stage, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_process_message_includes_exit_status() {
        let e = PipelineError::ExternalProcess {
            stage: Stage::Build,
            exit_code: Some(1),
            diagnostic: "BadInputsUTxO".into(),
        };
        assert_eq!(e.to_string(), "build command exited with status 1: BadInputsUTxO");

        let launch = PipelineError::ExternalProcess {
            stage: Stage::Query,
            exit_code: None,
            diagnostic: "failed to launch cardano-cli".into(),
        };
        assert_eq!(
            launch.to_string(),
            "query command could not be run: failed to launch cardano-cli"
        );
    }

    #[test]
    fn stage_failure_prefixes_stage() {
        let f = StageFailure::new(
            Stage::Select,
            InsufficientFunds::Tokens {
                required: 100,
                available: 8,
            }
            .into(),
        );
        assert_eq!(
            f.to_string(),
            "select failed: insufficient tokens: required 100, available 8"
        );
    }

    #[test]
    fn blueprint_not_found_maps_to_lookup_error() {
        let e: PipelineError = BlueprintError::ValidatorNotFound {
            title: "missing.spend".into(),
        }
        .into();
        assert!(matches!(e, PipelineError::BlueprintLookup { ref title } if title == "missing.spend"));
    }
}
