//! Token transfer flow.
//!
//! Sends `amount` units of the configured asset, plus the receiver lovelace,
//! from the wallet whose address lives in `walletAddressPath`. Change goes
//! back to the same wallet.

use std::fs;
use std::path::PathBuf;

use crate::diagnostics::PipelineEvent;
use crate::error::{PipelineError, StageFailure};
use crate::network::NetworkFlag;
use crate::scratch::ScratchScope;
use crate::utxo::{parse_utxo_query, AssetId, SelectionResult, UtxoRecord, UtxoSelector};

use super::commands::{require_artifact, BuildPlan, LedgerCli, TxInput};
use super::request::TransferRequest;
use super::state::{Run, Stage, TransferState};
use super::{conclude, submitted, PipelineContext, PipelineOutcome, RunReport};

/// Everything resolved before the first command runs.
struct Prepared {
    network: NetworkFlag,
    sender: String,
    signing_key: PathBuf,
    asset: AssetId,
    utxo_file: PathBuf,
    protocol_file: PathBuf,
    raw_file: PathBuf,
    signed_file: PathBuf,
}

pub struct TransferPipeline<'a> {
    ctx: PipelineContext<'a>,
}

impl<'a> TransferPipeline<'a> {
    pub fn new(ctx: PipelineContext<'a>) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, request: &TransferRequest) -> PipelineOutcome {
        self.run_traced(request).await.outcome
    }

    /// Run and keep the state history, for callers that want more than the
    /// outcome.
    pub async fn run_traced(&self, request: &TransferRequest) -> RunReport<TransferState> {
        let mut run = Run::new(self.ctx.sink);
        let mut scope = self.ctx.scratch.scope();
        let result = self.drive(&mut run, &mut scope, request).await;
        let released = scope.release_all();
        conclude(run, result, released)
    }

    async fn drive(
        &self,
        run: &mut Run<'_, TransferState>,
        scope: &mut ScratchScope,
        request: &TransferRequest,
    ) -> Result<String, StageFailure> {
        let settings = self.ctx.settings;

        run.enter(Stage::Prepare);
        let prep = run.check(Stage::Prepare, self.prepare(request, scope))?;
        let cli = LedgerCli::new(
            self.ctx.runner,
            self.ctx.sink,
            &settings.cli_path,
            &settings.era,
            prep.network.clone(),
        );

        run.enter(Stage::Query);
        let utxos = run.settle(Stage::Query, self.query(&cli, &prep).await)?;

        run.enter(Stage::Select);
        let selection = run.settle(Stage::Select, self.select(&utxos, request.amount))?;
        self.ctx.sink.record(PipelineEvent::InputsSelected {
            inputs: selection.selected.len(),
            total_ada: selection.total_ada,
            total_tokens: selection.total_tokens,
        });

        run.enter(Stage::ProtocolParams);
        run.settle(Stage::ProtocolParams, self.protocol_params(&cli, &prep).await)?;

        run.enter(Stage::Build);
        let plan = BuildPlan {
            inputs: selection
                .selected
                .iter()
                .map(|u| TxInput::Key(u.id.clone()))
                .collect(),
            outputs: vec![self.receiver_output(request, &prep.asset)],
            change_address: prep.sender.clone(),
        };
        run.settle(Stage::Build, self.build(&cli, &plan, &prep).await)?;

        run.enter(Stage::Sign);
        run.settle(Stage::Sign, self.sign(&cli, &prep).await)?;

        run.enter(Stage::Submit);
        let output = run.settle(Stage::Submit, cli.submit(&prep.signed_file).await)?;
        run.finish();

        Ok(submitted("transaction submitted", &output))
    }

    fn prepare(
        &self,
        request: &TransferRequest,
        scope: &mut ScratchScope,
    ) -> Result<Prepared, PipelineError> {
        request.validate()?;
        let settings = self.ctx.settings;

        let network = settings.network_flag()?;
        let sender = settings.sender_address()?;
        let signing_key = settings.signing_key()?;
        let asset = settings.asset()?;

        let root = self.ctx.scratch.root();
        let mut file = |label: &str| scope.file(label).map_err(|e| PipelineError::io(root, e));

        Ok(Prepared {
            network,
            sender,
            signing_key,
            asset,
            utxo_file: file("utxos.json")?,
            protocol_file: file("protocol.json")?,
            raw_file: file("tx.raw")?,
            signed_file: file("tx.signed")?,
        })
    }

    async fn query(
        &self,
        cli: &LedgerCli<'_>,
        prep: &Prepared,
    ) -> Result<Vec<UtxoRecord>, PipelineError> {
        cli.query_utxo(&prep.sender, &prep.utxo_file).await?;
        require_artifact(&prep.utxo_file)?;
        let text = fs::read_to_string(&prep.utxo_file)
            .map_err(|e| PipelineError::io(&prep.utxo_file, e))?;
        Ok(parse_utxo_query(&text, &prep.asset)?)
    }

    fn select(&self, utxos: &[UtxoRecord], amount: u64) -> Result<SelectionResult, PipelineError> {
        let policy = &self.ctx.settings.selection;
        let selector = UtxoSelector::new(policy.dust_threshold_lovelace);
        Ok(selector.select(utxos, amount, policy.required_ada_floor())?)
    }

    async fn protocol_params(
        &self,
        cli: &LedgerCli<'_>,
        prep: &Prepared,
    ) -> Result<(), PipelineError> {
        cli.query_protocol_parameters(&prep.protocol_file).await?;
        require_artifact(&prep.protocol_file)
    }

    async fn build(
        &self,
        cli: &LedgerCli<'_>,
        plan: &BuildPlan,
        prep: &Prepared,
    ) -> Result<(), PipelineError> {
        cli.build(plan, &prep.raw_file).await?;
        require_artifact(&prep.raw_file)
    }

    async fn sign(&self, cli: &LedgerCli<'_>, prep: &Prepared) -> Result<(), PipelineError> {
        cli.sign(&prep.raw_file, &prep.signing_key, &prep.signed_file)
            .await?;
        require_artifact(&prep.signed_file)
    }

    /// `receiver+lovelace+amount policy.asset`
    fn receiver_output(&self, request: &TransferRequest, asset: &AssetId) -> String {
        format!(
            "{}+{}+{} {}",
            request.receiver_address.trim(),
            self.ctx.settings.selection.receiver_lovelace,
            request.amount,
            asset.unit()
        )
    }
}
