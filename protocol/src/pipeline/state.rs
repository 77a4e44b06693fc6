//! Pipeline state machines.
//!
//! Each flow is a strictly linear sequence of states with one absorbing
//! failure state. A successful stage moves the run exactly one state
//! forward; a failed stage moves it to `Failed { stage, reason }`. Terminal
//! states (`Done`, `Failed`) are immutable.
//!
//! ```text
//! transfer:     Idle -> UtxosQueried -> Selected -> ProtocolParamsFetched
//!                    -> Built -> Signed -> Submitted -> Done
//! registration: Idle -> ValidatorResolved -> DatumEncoded
//!                    -> Built -> Signed -> Submitted -> Done
//! ```

use std::fmt;

use serde::Serialize;

use crate::diagnostics::{DiagnosticsSink, PipelineEvent};
use crate::error::{PipelineError, StageFailure};

/// Which workflow a run belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    Transfer,
    Registration,
    Addresses,
}

impl Flow {
    pub fn as_str(self) -> &'static str {
        match self {
            Flow::Transfer => "transfer",
            Flow::Registration => "registration",
            Flow::Addresses => "addresses",
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work inside a flow.
///
/// `Prepare` covers request validation and settings resolution before the
/// first external command; a failure there leaves the run's last good state
/// as `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Prepare,
    Query,
    Select,
    ProtocolParams,
    ResolveValidator,
    EncodeDatum,
    Build,
    Sign,
    Submit,
    DeriveAddress,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Prepare => "prepare",
            Stage::Query => "query",
            Stage::Select => "select",
            Stage::ProtocolParams => "protocol-params",
            Stage::ResolveValidator => "resolve-validator",
            Stage::EncodeDatum => "encode-datum",
            Stage::Build => "build",
            Stage::Sign => "sign",
            Stage::Submit => "submit",
            Stage::DeriveAddress => "derive-address",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Flow states
// ---------------------------------------------------------------------------

/// Behaviour shared by the per-flow state enums.
pub trait FlowState: Clone + fmt::Debug + PartialEq {
    const FLOW: Flow;

    fn idle() -> Self;

    /// The stage that advances this state, or `None` when there is none.
    fn next_stage(&self) -> Option<Stage>;

    /// The state reached when [`FlowState::next_stage`] succeeds.
    fn successor(&self) -> Option<Self>;

    fn failed(stage: Stage, reason: String) -> Self;

    fn is_terminal(&self) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    UtxosQueried,
    Selected,
    ProtocolParamsFetched,
    Built,
    Signed,
    Submitted,
    Done,
    Failed { stage: Stage, reason: String },
}

impl FlowState for TransferState {
    const FLOW: Flow = Flow::Transfer;

    fn idle() -> Self {
        TransferState::Idle
    }

    fn next_stage(&self) -> Option<Stage> {
        match self {
            TransferState::Idle => Some(Stage::Query),
            TransferState::UtxosQueried => Some(Stage::Select),
            TransferState::Selected => Some(Stage::ProtocolParams),
            TransferState::ProtocolParamsFetched => Some(Stage::Build),
            TransferState::Built => Some(Stage::Sign),
            TransferState::Signed => Some(Stage::Submit),
            _ => None,
        }
    }

    fn successor(&self) -> Option<Self> {
        match self {
            TransferState::Idle => Some(TransferState::UtxosQueried),
            TransferState::UtxosQueried => Some(TransferState::Selected),
            TransferState::Selected => Some(TransferState::ProtocolParamsFetched),
            TransferState::ProtocolParamsFetched => Some(TransferState::Built),
            TransferState::Built => Some(TransferState::Signed),
            TransferState::Signed => Some(TransferState::Submitted),
            TransferState::Submitted => Some(TransferState::Done),
            _ => None,
        }
    }

    fn failed(stage: Stage, reason: String) -> Self {
        TransferState::Failed { stage, reason }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Done | TransferState::Failed { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationState {
    Idle,
    ValidatorResolved,
    DatumEncoded,
    Built,
    Signed,
    Submitted,
    Done,
    Failed { stage: Stage, reason: String },
}

impl FlowState for RegistrationState {
    const FLOW: Flow = Flow::Registration;

    fn idle() -> Self {
        RegistrationState::Idle
    }

    fn next_stage(&self) -> Option<Stage> {
        match self {
            RegistrationState::Idle => Some(Stage::ResolveValidator),
            RegistrationState::ValidatorResolved => Some(Stage::EncodeDatum),
            RegistrationState::DatumEncoded => Some(Stage::Build),
            RegistrationState::Built => Some(Stage::Sign),
            RegistrationState::Signed => Some(Stage::Submit),
            _ => None,
        }
    }

    fn successor(&self) -> Option<Self> {
        match self {
            RegistrationState::Idle => Some(RegistrationState::ValidatorResolved),
            RegistrationState::ValidatorResolved => Some(RegistrationState::DatumEncoded),
            RegistrationState::DatumEncoded => Some(RegistrationState::Built),
            RegistrationState::Built => Some(RegistrationState::Signed),
            RegistrationState::Signed => Some(RegistrationState::Submitted),
            RegistrationState::Submitted => Some(RegistrationState::Done),
            _ => None,
        }
    }

    fn failed(stage: Stage, reason: String) -> Self {
        RegistrationState::Failed { stage, reason }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, RegistrationState::Done | RegistrationState::Failed { .. })
    }
}

// ---------------------------------------------------------------------------
// Run tracker
// ---------------------------------------------------------------------------

/// Tracks one run through its flow and reports transitions to a sink.
pub struct Run<'a, S: FlowState> {
    state: S,
    history: Vec<S>,
    sink: &'a dyn DiagnosticsSink,
}

impl<'a, S: FlowState> Run<'a, S> {
    pub fn new(sink: &'a dyn DiagnosticsSink) -> Self {
        let idle = S::idle();
        Self {
            state: idle.clone(),
            history: vec![idle],
            sink,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Every state visited, starting with `Idle`.
    pub fn history(&self) -> &[S] {
        &self.history
    }

    pub fn into_history(self) -> Vec<S> {
        self.history
    }

    pub fn sink(&self) -> &'a dyn DiagnosticsSink {
        self.sink
    }

    /// Announce that `stage` is starting.
    pub fn enter(&self, stage: Stage) {
        self.sink.record(PipelineEvent::StageEntered {
            flow: S::FLOW,
            stage,
        });
    }

    /// Settle a stage that does not move the state (`Prepare`).
    pub fn check<T>(
        &mut self,
        stage: Stage,
        result: Result<T, PipelineError>,
    ) -> Result<T, StageFailure> {
        result.map_err(|error| self.fail(stage, error))
    }

    /// Settle a state-advancing stage: move forward on success, fail otherwise.
    pub fn settle<T>(
        &mut self,
        stage: Stage,
        result: Result<T, PipelineError>,
    ) -> Result<T, StageFailure> {
        match result {
            Ok(value) => {
                debug_assert_eq!(self.state.next_stage(), Some(stage));
                self.advance();
                Ok(value)
            }
            Err(error) => Err(self.fail(stage, error)),
        }
    }

    /// `Submitted -> Done`.
    pub fn finish(&mut self) {
        self.advance();
    }

    fn advance(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if let Some(next) = self.state.successor() {
            self.transition(next);
        }
    }

    fn fail(&mut self, stage: Stage, error: PipelineError) -> StageFailure {
        let reason = error.to_string();
        self.sink.record(PipelineEvent::StageFailed {
            flow: S::FLOW,
            stage,
            reason: reason.clone(),
        });
        if !self.state.is_terminal() {
            self.transition(S::failed(stage, reason));
        }
        StageFailure::new(stage, error)
    }

    fn transition(&mut self, next: S) {
        self.state = next.clone();
        self.history.push(next);
    }
}
