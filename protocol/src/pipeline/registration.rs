//! Student registration flow.
//!
//! Spends the student's enrollment UTxO at the registration validator. The
//! run works in a private scratch directory holding the script envelope,
//! datum, redeemer and transaction files; the directory is removed as a
//! whole when the run ends.

use std::fs;
use std::path::{Path, PathBuf};

use ayllu_contracts::blueprint::COMPILED_SCRIPT_DESCRIPTION;
use ayllu_contracts::{
    lookup_validator, IntKey, OutputReference, RegistrationDatum, RegistrationRedeemer, ToPlutus,
};

use crate::error::{PipelineError, StageFailure};
use crate::network::NetworkFlag;
use crate::scratch::ScratchScope;

use super::commands::{require_artifact, BuildPlan, LedgerCli, TxInput};
use super::request::RegistrationRequest;
use super::state::{RegistrationState, Run, Stage};
use super::{conclude, submitted, PipelineContext, PipelineOutcome, RunReport};

/// Files inside the run's scratch directory.
struct Workspace {
    script_file: PathBuf,
    datum_file: PathBuf,
    redeemer_file: PathBuf,
    raw_file: PathBuf,
    signed_file: PathBuf,
}

impl Workspace {
    fn new(dir: &Path) -> Self {
        Self {
            script_file: dir.join("validator.plutus"),
            datum_file: dir.join("datum.json"),
            redeemer_file: dir.join("redeemer.json"),
            raw_file: dir.join("tx.raw"),
            signed_file: dir.join("tx.signed"),
        }
    }
}

struct Prepared {
    network: NetworkFlag,
    signing_key: PathBuf,
    blueprint: PathBuf,
    files: Workspace,
}

pub struct RegistrationPipeline<'a> {
    ctx: PipelineContext<'a>,
}

impl<'a> RegistrationPipeline<'a> {
    pub fn new(ctx: PipelineContext<'a>) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, request: &RegistrationRequest) -> PipelineOutcome {
        self.run_traced(request).await.outcome
    }

    pub async fn run_traced(&self, request: &RegistrationRequest) -> RunReport<RegistrationState> {
        let mut run = Run::new(self.ctx.sink);
        let mut scope = self.ctx.scratch.scope();
        let result = self.drive(&mut run, &mut scope, request).await;
        let released = scope.release_all();
        conclude(run, result, released)
    }

    async fn drive(
        &self,
        run: &mut Run<'_, RegistrationState>,
        scope: &mut ScratchScope,
        request: &RegistrationRequest,
    ) -> Result<String, StageFailure> {
        let settings = self.ctx.settings;

        run.enter(Stage::Prepare);
        let prep = run.check(Stage::Prepare, self.prepare(request, scope))?;
        let files = &prep.files;

        run.enter(Stage::ResolveValidator);
        run.settle(Stage::ResolveValidator, self.resolve_validator(&prep))?;

        run.enter(Stage::EncodeDatum);
        run.settle(
            Stage::EncodeDatum,
            encode_artifacts(request, files, settings.registration.int_key),
        )?;

        let cli = LedgerCli::new(
            self.ctx.runner,
            self.ctx.sink,
            &settings.cli_path,
            &settings.era,
            prep.network.clone(),
        );

        run.enter(Stage::Build);
        let student = request.student_address.trim().to_string();
        let plan = BuildPlan {
            inputs: vec![TxInput::Script {
                utxo: OutputReference::new(request.tx_hash.trim(), request.output_index)
                    .to_string(),
                script_file: files.script_file.clone(),
                datum_file: files.datum_file.clone(),
                redeemer_file: files.redeemer_file.clone(),
            }],
            outputs: vec![format!(
                "{student}+{}",
                settings.registration.student_output_lovelace
            )],
            change_address: student,
        };
        run.settle(Stage::Build, build(&cli, &plan, files).await)?;

        run.enter(Stage::Sign);
        run.settle(Stage::Sign, sign(&cli, &prep.signing_key, files).await)?;

        run.enter(Stage::Submit);
        let output = run.settle(Stage::Submit, cli.submit(&files.signed_file).await)?;
        run.finish();

        Ok(submitted("student registered and transaction submitted", &output))
    }

    fn prepare(
        &self,
        request: &RegistrationRequest,
        scope: &mut ScratchScope,
    ) -> Result<Prepared, PipelineError> {
        request.validate()?;
        let settings = self.ctx.settings;

        let network = settings.network_flag()?;
        let signing_key = settings.signing_key()?;
        let blueprint = settings.blueprint()?;
        let dir = scope
            .directory("registration")
            .map_err(|e| PipelineError::io(self.ctx.scratch.root(), e))?;

        Ok(Prepared {
            network,
            signing_key,
            blueprint,
            files: Workspace::new(&dir),
        })
    }

    /// Look the validator up and write its script envelope.
    fn resolve_validator(&self, prep: &Prepared) -> Result<(), PipelineError> {
        let title = &self.ctx.settings.registration.validator_title;
        let validator = lookup_validator(&prep.blueprint, title)?;
        validator
            .envelope(COMPILED_SCRIPT_DESCRIPTION)
            .write(&prep.files.script_file)?;
        Ok(())
    }
}

/// Write the datum and redeemer files the build consumes.
fn encode_artifacts(
    request: &RegistrationRequest,
    files: &Workspace,
    int_key: IntKey,
) -> Result<(), PipelineError> {
    let pkh = request.student_pkh.trim().to_string();
    let datum = RegistrationDatum {
        student_pkh: pkh.clone(),
    };
    let redeemer = RegistrationRedeemer {
        action: request.action,
        student_pkh: pkh,
        source: OutputReference::new(request.tx_hash.trim(), request.output_index),
    };

    write_json(&files.datum_file, &datum.to_plutus()?.to_json_string(int_key))?;
    write_json(&files.redeemer_file, &redeemer.to_plutus()?.to_json_string(int_key))?;
    Ok(())
}

fn write_json(path: &Path, json: &str) -> Result<(), PipelineError> {
    fs::write(path, json).map_err(|e| PipelineError::io(path, e))
}

async fn build(
    cli: &LedgerCli<'_>,
    plan: &BuildPlan,
    files: &Workspace,
) -> Result<(), PipelineError> {
    cli.build(plan, &files.raw_file).await?;
    require_artifact(&files.raw_file)
}

async fn sign(
    cli: &LedgerCli<'_>,
    signing_key: &Path,
    files: &Workspace,
) -> Result<(), PipelineError> {
    cli.sign(&files.raw_file, signing_key, &files.signed_file)
        .await?;
    require_artifact(&files.signed_file)
}
