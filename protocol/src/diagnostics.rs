//! # Diagnostics
//!
//! Pipelines report what they are doing through an injected
//! [`DiagnosticsSink`] instead of writing to a global logger. The node wires
//! in [`TracingSink`], which forwards to `tracing`; tests use
//! [`RecordingSink`] and assert on the captured events.

use parking_lot::Mutex;

use crate::pipeline::{Flow, Stage};

/// Something that happened during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineEvent {
    StageEntered {
        flow: Flow,
        stage: Stage,
    },
    /// An external command exited (or failed to launch).
    CommandFinished {
        stage: Stage,
        command: String,
        exit_code: Option<i32>,
        succeeded: bool,
    },
    /// Coin selection picked its inputs.
    InputsSelected {
        inputs: usize,
        total_ada: u64,
        total_tokens: u64,
    },
    StageFailed {
        flow: Flow,
        stage: Stage,
        reason: String,
    },
    /// The run reached a terminal state and released its scratch files.
    Finished {
        flow: Flow,
        succeeded: bool,
        released: usize,
    },
}

/// Receives pipeline events. Must be cheap and must not fail.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, event: PipelineEvent);
}

/// Forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::StageEntered { flow, stage } => {
                tracing::debug!(%flow, %stage, "stage entered");
            }
            PipelineEvent::CommandFinished {
                stage,
                command,
                exit_code,
                succeeded,
            } => {
                if succeeded {
                    tracing::debug!(%stage, %command, "ledger command succeeded");
                } else {
                    tracing::warn!(%stage, %command, ?exit_code, "ledger command failed");
                }
            }
            PipelineEvent::InputsSelected {
                inputs,
                total_ada,
                total_tokens,
            } => {
                tracing::info!(inputs, total_ada, total_tokens, "inputs selected");
            }
            PipelineEvent::StageFailed { flow, stage, reason } => {
                tracing::error!(%flow, %stage, %reason, "stage failed");
            }
            PipelineEvent::Finished {
                flow,
                succeeded,
                released,
            } => {
                tracing::info!(%flow, succeeded, released, "run finished");
            }
        }
    }
}

/// Captures events in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().clone()
    }

    /// Stages that were entered, in order.
    pub fn stages_entered(&self) -> Vec<Stage> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::StageEntered { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    /// Rendered commands, in execution order.
    pub fn commands(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::CommandFinished { command, .. } => Some(command.clone()),
                _ => None,
            })
            .collect()
    }
}

impl DiagnosticsSink for RecordingSink {
    fn record(&self, event: PipelineEvent) {
        self.events.lock().push(event);
    }
}
