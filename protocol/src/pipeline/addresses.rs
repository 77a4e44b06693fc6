//! Script address derivation.
//!
//! Derives the on-chain address of every validator in the blueprint by
//! wrapping each one in a script envelope and asking the ledger tool for its
//! payment address. Not a transaction, so no state machine: one resolve step,
//! then one `address build` per validator, stopping at the first failure.

use std::collections::BTreeMap;
use std::path::Path;

use ayllu_contracts::{Blueprint, BlueprintError};

use crate::diagnostics::PipelineEvent;
use crate::error::{PipelineError, StageFailure};

use super::commands::LedgerCli;
use super::state::{Flow, Stage};
use super::PipelineContext;

pub struct AddressDerivation<'a> {
    ctx: PipelineContext<'a>,
}

impl<'a> AddressDerivation<'a> {
    pub fn new(ctx: PipelineContext<'a>) -> Self {
        Self { ctx }
    }

    /// Validator title to bech32 address, ordered by title.
    pub async fn run(&self) -> Result<BTreeMap<String, String>, StageFailure> {
        let mut scope = self.ctx.scratch.scope();
        let result = self.derive(&mut scope).await;
        let released = scope.release_all();

        if let Err(failure) = &result {
            self.ctx.sink.record(PipelineEvent::StageFailed {
                flow: Flow::Addresses,
                stage: failure.stage,
                reason: failure.error.to_string(),
            });
        }
        self.ctx.sink.record(PipelineEvent::Finished {
            flow: Flow::Addresses,
            succeeded: result.is_ok(),
            released,
        });
        result
    }

    async fn derive(
        &self,
        scope: &mut crate::scratch::ScratchScope,
    ) -> Result<BTreeMap<String, String>, StageFailure> {
        let settings = self.ctx.settings;
        let fail = |stage| move |error: PipelineError| StageFailure::new(stage, error);

        self.enter(Stage::ResolveValidator);
        let network = settings
            .network_flag()
            .map_err(PipelineError::from)
            .map_err(fail(Stage::ResolveValidator))?;
        let blueprint = settings
            .blueprint()
            .map_err(PipelineError::from)
            .and_then(|path| load_non_empty(&path))
            .map_err(fail(Stage::ResolveValidator))?;
        let dir = scope
            .directory("addresses")
            .map_err(|e| PipelineError::io(self.ctx.scratch.root(), e))
            .map_err(fail(Stage::ResolveValidator))?;

        let cli = LedgerCli::new(
            self.ctx.runner,
            self.ctx.sink,
            &settings.cli_path,
            &settings.era,
            network,
        );

        self.enter(Stage::DeriveAddress);
        let mut addresses = BTreeMap::new();
        for (i, validator) in blueprint.validators.iter().enumerate() {
            let script = dir.join(format!("validator-{i}.plutus"));
            validator
                .envelope(format!("Validator {}", validator.title))
                .write(&script)
                .map_err(PipelineError::from)
                .map_err(fail(Stage::DeriveAddress))?;

            let address = cli
                .address_build(&script)
                .await
                .map_err(fail(Stage::DeriveAddress))?;
            addresses.insert(validator.title.clone(), address);
        }
        Ok(addresses)
    }

    fn enter(&self, stage: Stage) {
        self.ctx.sink.record(PipelineEvent::StageEntered {
            flow: Flow::Addresses,
            stage,
        });
    }
}

fn load_non_empty(path: &Path) -> Result<Blueprint, PipelineError> {
    let blueprint = Blueprint::load(path)?;
    if blueprint.validators.is_empty() {
        return Err(BlueprintError::Empty.into());
    }
    Ok(blueprint)
}
