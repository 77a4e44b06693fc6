//! # Transaction Pipelines
//!
//! The transfer and registration workflows. Each run:
//!
//! 1. validates its request and resolves settings (`Prepare`),
//! 2. walks its flow's states one stage at a time, driving the ledger tool,
//! 3. stops at the first failing stage, and
//! 4. releases every scratch file it allocated, whatever the outcome.
//!
//! Callers only ever see a [`PipelineOutcome`]. Stage-level detail goes to
//! the injected [`DiagnosticsSink`].

pub mod addresses;
pub mod commands;
pub mod registration;
pub mod request;
pub mod state;
pub mod transfer;

use serde::{Deserialize, Serialize};

use crate::config::LedgerSettings;
use crate::diagnostics::{DiagnosticsSink, PipelineEvent};
use crate::error::StageFailure;
use crate::process::CommandRunner;
use crate::scratch::ScratchSpace;

pub use addresses::AddressDerivation;
pub use commands::{require_artifact, BuildPlan, LedgerCli, TxInput};
pub use registration::RegistrationPipeline;
pub use request::{RegistrationRequest, TransferRequest};
pub use state::{Flow, FlowState, RegistrationState, Run, Stage, TransferState};
pub use transfer::TransferPipeline;

/// The single result surfaced to callers of a pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub succeeded: bool,
    pub message: String,
}

impl PipelineOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            message: message.into(),
        }
    }
}

impl From<Result<String, StageFailure>> for PipelineOutcome {
    fn from(result: Result<String, StageFailure>) -> Self {
        match result {
            Ok(message) => PipelineOutcome::success(message),
            Err(failure) => PipelineOutcome::failure(failure.to_string()),
        }
    }
}

/// Outcome plus the trail a run left behind.
#[derive(Clone, Debug)]
pub struct RunReport<S> {
    pub outcome: PipelineOutcome,
    /// Every state visited, `Idle` first.
    pub history: Vec<S>,
    /// Scratch paths released at the end of the run.
    pub released: usize,
}

impl<S: FlowState> RunReport<S> {
    pub fn final_state(&self) -> Option<&S> {
        self.history.last()
    }
}

/// Borrowed collaborators shared by every pipeline.
#[derive(Clone, Copy)]
pub struct PipelineContext<'a> {
    pub settings: &'a LedgerSettings,
    pub runner: &'a dyn CommandRunner,
    pub sink: &'a dyn DiagnosticsSink,
    pub scratch: &'a ScratchSpace,
}

/// Close out a run: report it and package the result.
fn conclude<S: FlowState>(
    run: Run<'_, S>,
    result: Result<String, StageFailure>,
    released: usize,
) -> RunReport<S> {
    run.sink().record(PipelineEvent::Finished {
        flow: S::FLOW,
        succeeded: result.is_ok(),
        released,
    });
    RunReport {
        outcome: result.into(),
        history: run.into_history(),
        released,
    }
}

/// Message for a successful submission, with whatever the tool printed.
fn submitted(prefix: &str, tool_output: &str) -> String {
    if tool_output.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}: {tool_output}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn outcome_from_failure_uses_stage_message() {
        let outcome: PipelineOutcome = Err(StageFailure::new(
            Stage::Sign,
            PipelineError::InvalidRequest("bad".into()),
        ))
        .into();
        assert!(!outcome.succeeded);
        assert_eq!(outcome.message, "sign failed: invalid request: bad");
    }

    #[test]
    fn submitted_message_appends_tool_output() {
        assert_eq!(submitted("transaction submitted", ""), "transaction submitted");
        assert_eq!(
            submitted("transaction submitted", "Transaction successfully submitted."),
            "transaction submitted: Transaction successfully submitted."
        );
    }
}
