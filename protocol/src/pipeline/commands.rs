//! Ledger tool invocations.
//!
//! [`LedgerCli`] knows the argument layout of every subcommand the pipelines
//! use and turns a failed [`CommandOutcome`](crate::process::CommandOutcome)
//! into a [`PipelineError::ExternalProcess`]. The era prefix applies to
//! `transaction` subcommands only; queries and `address build` are
//! era-agnostic.

use std::path::{Path, PathBuf};

use crate::diagnostics::{DiagnosticsSink, PipelineEvent};
use crate::error::PipelineError;
use crate::network::NetworkFlag;
use crate::process::{render_command, CommandRunner};

use super::Stage;

/// One transaction input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxInput {
    /// Spent with the signing key.
    Key(String),
    /// Locked at a script; witnessed by script, datum and redeemer files.
    Script {
        utxo: String,
        script_file: PathBuf,
        datum_file: PathBuf,
        redeemer_file: PathBuf,
    },
}

/// Everything `transaction build` needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildPlan {
    pub inputs: Vec<TxInput>,
    /// Outputs in the tool's `address+lovelace[+qty policy.asset]` syntax.
    pub outputs: Vec<String>,
    pub change_address: String,
}

/// The ledger tool as seen by one run.
pub struct LedgerCli<'a> {
    runner: &'a dyn CommandRunner,
    sink: &'a dyn DiagnosticsSink,
    program: &'a str,
    era: &'a str,
    network: NetworkFlag,
}

impl<'a> LedgerCli<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        sink: &'a dyn DiagnosticsSink,
        program: &'a str,
        era: &'a str,
        network: NetworkFlag,
    ) -> Self {
        Self {
            runner,
            sink,
            program,
            era,
            network,
        }
    }

    pub fn network(&self) -> &NetworkFlag {
        &self.network
    }

    /// `query utxo --address A <net> --out-file F`
    pub async fn query_utxo(
        &self,
        address: &str,
        out_file: &Path,
    ) -> Result<String, PipelineError> {
        let mut args = strings(&["query", "utxo", "--address", address]);
        args.extend(self.network.args());
        push_path(&mut args, "--out-file", out_file);
        self.invoke(Stage::Query, args).await
    }

    /// `query protocol-parameters <net> --out-file F`
    pub async fn query_protocol_parameters(
        &self,
        out_file: &Path,
    ) -> Result<String, PipelineError> {
        let mut args = strings(&["query", "protocol-parameters"]);
        args.extend(self.network.args());
        push_path(&mut args, "--out-file", out_file);
        self.invoke(Stage::ProtocolParams, args).await
    }

    /// `<era> transaction build <net> --tx-in ... --tx-out ... --change-address C --out-file F`
    pub async fn build(&self, plan: &BuildPlan, out_file: &Path) -> Result<String, PipelineError> {
        let mut args = self.transaction(&["build"]);
        args.extend(self.network.args());
        for input in &plan.inputs {
            match input {
                TxInput::Key(utxo) => {
                    args.push("--tx-in".into());
                    args.push(utxo.clone());
                }
                TxInput::Script {
                    utxo,
                    script_file,
                    datum_file,
                    redeemer_file,
                } => {
                    args.push("--tx-in".into());
                    args.push(utxo.clone());
                    push_path(&mut args, "--tx-in-script-file", script_file);
                    push_path(&mut args, "--tx-in-datum-file", datum_file);
                    push_path(&mut args, "--tx-in-redeemer-file", redeemer_file);
                }
            }
        }
        for output in &plan.outputs {
            args.push("--tx-out".into());
            args.push(output.clone());
        }
        args.push("--change-address".into());
        args.push(plan.change_address.clone());
        push_path(&mut args, "--out-file", out_file);
        self.invoke(Stage::Build, args).await
    }

    /// `<era> transaction sign --tx-body-file B --signing-key-file K <net> --out-file F`
    pub async fn sign(
        &self,
        body_file: &Path,
        signing_key: &Path,
        out_file: &Path,
    ) -> Result<String, PipelineError> {
        let mut args = self.transaction(&["sign"]);
        push_path(&mut args, "--tx-body-file", body_file);
        push_path(&mut args, "--signing-key-file", signing_key);
        args.extend(self.network.args());
        push_path(&mut args, "--out-file", out_file);
        self.invoke(Stage::Sign, args).await
    }

    /// `<era> transaction submit --tx-file F <net>`
    pub async fn submit(&self, tx_file: &Path) -> Result<String, PipelineError> {
        let mut args = self.transaction(&["submit"]);
        push_path(&mut args, "--tx-file", tx_file);
        args.extend(self.network.args());
        self.invoke(Stage::Submit, args).await
    }

    /// `address build --payment-script-file S <net>`
    pub async fn address_build(&self, script_file: &Path) -> Result<String, PipelineError> {
        let mut args = strings(&["address", "build"]);
        push_path(&mut args, "--payment-script-file", script_file);
        args.extend(self.network.args());
        self.invoke(Stage::DeriveAddress, args).await
    }

    fn transaction(&self, sub: &[&str]) -> Vec<String> {
        let mut args = Vec::with_capacity(16);
        if !self.era.is_empty() {
            args.push(self.era.to_string());
        }
        args.push("transaction".to_string());
        args.extend(sub.iter().map(|s| s.to_string()));
        args
    }

    async fn invoke(&self, stage: Stage, args: Vec<String>) -> Result<String, PipelineError> {
        let outcome = self.runner.run(self.program, &args).await;
        self.sink.record(PipelineEvent::CommandFinished {
            stage,
            command: render_command(self.program, &args),
            exit_code: outcome.exit_code,
            succeeded: outcome.succeeded,
        });

        if outcome.succeeded {
            Ok(outcome.output)
        } else {
            Err(PipelineError::ExternalProcess {
                stage,
                exit_code: outcome.exit_code,
                diagnostic: outcome.output,
            })
        }
    }
}

/// Fail with [`PipelineError::MissingArtifact`] unless `path` exists.
pub fn require_artifact(path: &Path) -> Result<(), PipelineError> {
    if path.exists() {
        Ok(())
    } else {
        Err(PipelineError::MissingArtifact {
            expected_path: path.to_path_buf(),
        })
    }
}

fn strings(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn push_path(args: &mut Vec<String>, flag: &str, path: &Path) {
    args.push(flag.to_string());
    args.push(path.to_string_lossy().into_owned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use crate::process::CommandOutcome;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Capture {
        calls: Mutex<Vec<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl CommandRunner for Capture {
        async fn run(&self, _program: &str, args: &[String]) -> CommandOutcome {
            self.calls.lock().push(args.to_vec());
            if self.fail {
                CommandOutcome::failure(Some(1), "Command failed: BadInputsUTxO")
            } else {
                CommandOutcome::success("ok")
            }
        }
    }

    fn cli<'a>(runner: &'a Capture, sink: &'a RecordingSink) -> LedgerCli<'a> {
        LedgerCli::new(
            runner,
            sink,
            "cardano-cli",
            "conway",
            NetworkFlag::from_setting("testnet 2"),
        )
    }

    #[tokio::test]
    async fn query_utxo_has_no_era_prefix() {
        let runner = Capture::default();
        let sink = RecordingSink::default();
        cli(&runner, &sink)
            .query_utxo("addr_test1sender", Path::new("/tmp/u.json"))
            .await
            .unwrap();

        assert_eq!(
            runner.calls.lock()[0],
            strings(&[
                "query",
                "utxo",
                "--address",
                "addr_test1sender",
                "--testnet-magic",
                "2",
                "--out-file",
                "/tmp/u.json",
            ])
        );
    }

    #[tokio::test]
    async fn build_lists_script_witness_files() {
        let runner = Capture::default();
        let sink = RecordingSink::default();
        let plan = BuildPlan {
            inputs: vec![TxInput::Script {
                utxo: "abcd#0".into(),
                script_file: "/s/validator.plutus".into(),
                datum_file: "/s/datum.json".into(),
                redeemer_file: "/s/redeemer.json".into(),
            }],
            outputs: vec!["addr_test1student+2000000".into()],
            change_address: "addr_test1student".into(),
        };
        cli(&runner, &sink)
            .build(&plan, Path::new("/s/tx.raw"))
            .await
            .unwrap();

        assert_eq!(
            runner.calls.lock()[0],
            strings(&[
                "conway",
                "transaction",
                "build",
                "--testnet-magic",
                "2",
                "--tx-in",
                "abcd#0",
                "--tx-in-script-file",
                "/s/validator.plutus",
                "--tx-in-datum-file",
                "/s/datum.json",
                "--tx-in-redeemer-file",
                "/s/redeemer.json",
                "--tx-out",
                "addr_test1student+2000000",
                "--change-address",
                "addr_test1student",
                "--out-file",
                "/s/tx.raw",
            ])
        );
    }

    #[tokio::test]
    async fn failure_carries_stage_and_diagnostic() {
        let runner = Capture {
            fail: true,
            ..Default::default()
        };
        let sink = RecordingSink::default();
        let err = cli(&runner, &sink)
            .submit(Path::new("/tmp/tx.signed"))
            .await
            .unwrap_err();

        match err {
            PipelineError::ExternalProcess {
                stage,
                exit_code,
                diagnostic,
            } => {
                assert_eq!(stage, Stage::Submit);
                assert_eq!(exit_code, Some(1));
                assert_eq!(diagnostic, "Command failed: BadInputsUTxO");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(sink.commands().len(), 1);
    }

    #[test]
    fn empty_era_is_omitted() {
        let runner = Capture::default();
        let sink = RecordingSink::default();
        let cli = LedgerCli::new(
            &runner,
            &sink,
            "cardano-cli",
            "",
            NetworkFlag::from_setting("mainnet"),
        );
        assert_eq!(cli.transaction(&["sign"]), strings(&["transaction", "sign"]));
    }

    #[test]
    fn missing_artifact_is_reported_with_path() {
        let err = require_artifact(Path::new("/nonexistent/tx.raw")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingArtifact { .. }));
    }
}
