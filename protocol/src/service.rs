//! # Transaction Service
//!
//! The façade the HTTP layer and the CLI talk to. [`LedgerService`] owns the
//! long-lived collaborators (settings, process runner, diagnostics sink,
//! scratch space) and starts one independent pipeline run per call.
//!
//! Concurrent runs share nothing mutable. Two transfers may pick the same
//! UTxO; the ledger rejects whichever submits second.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ConfigError, LedgerSettings};
use crate::diagnostics::{DiagnosticsSink, TracingSink};
use crate::error::StageFailure;
use crate::pipeline::{
    AddressDerivation, PipelineContext, PipelineOutcome, RegistrationPipeline,
    RegistrationRequest, TransferPipeline, TransferRequest,
};
use crate::process::{CommandRunner, ProcessRunner};
use crate::scratch::ScratchSpace;

/// Operations exposed to request boundaries.
#[async_trait]
pub trait TransactionService: Send + Sync {
    async fn transfer_tokens(&self, request: TransferRequest) -> PipelineOutcome;

    async fn register_student(&self, request: RegistrationRequest) -> PipelineOutcome;

    /// Validator title to script address.
    async fn validator_addresses(&self) -> Result<BTreeMap<String, String>, StageFailure>;
}

/// [`TransactionService`] backed by the ledger tool.
pub struct LedgerService {
    settings: Arc<LedgerSettings>,
    runner: Arc<dyn CommandRunner>,
    sink: Arc<dyn DiagnosticsSink>,
    scratch: ScratchSpace,
}

impl LedgerService {
    /// Service spawning real processes and logging through `tracing`.
    pub fn new(settings: LedgerSettings) -> Result<Self, ConfigError> {
        Self::with_collaborators(settings, Arc::new(ProcessRunner), Arc::new(TracingSink))
    }

    pub fn with_collaborators(
        settings: LedgerSettings,
        runner: Arc<dyn CommandRunner>,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Result<Self, ConfigError> {
        let scratch = settings.scratch_space()?;
        Ok(Self {
            settings: Arc::new(settings),
            runner,
            sink,
            scratch,
        })
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    fn context(&self) -> PipelineContext<'_> {
        PipelineContext {
            settings: &self.settings,
            runner: self.runner.as_ref(),
            sink: self.sink.as_ref(),
            scratch: &self.scratch,
        }
    }
}

#[async_trait]
impl TransactionService for LedgerService {
    async fn transfer_tokens(&self, request: TransferRequest) -> PipelineOutcome {
        TransferPipeline::new(self.context()).run(&request).await
    }

    async fn register_student(&self, request: RegistrationRequest) -> PipelineOutcome {
        RegistrationPipeline::new(self.context()).run(&request).await
    }

    async fn validator_addresses(&self) -> Result<BTreeMap<String, String>, StageFailure> {
        AddressDerivation::new(self.context()).run().await
    }
}
