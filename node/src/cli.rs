//! # CLI Interface
//!
//! Defines the command-line argument structure for `ayllu-node` using
//! `clap` derive. `run` serves the HTTP API; `claim`, `register` and
//! `addresses` run a single pipeline and print its outcome.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Ayllu reward and enrollment service.
///
/// Transfers reward tokens and registers students on the ledger by driving
/// the ledger command-line tool, either behind an HTTP API or one request at
/// a time from the shell.
#[derive(Parser, Debug)]
#[command(
    name = "ayllu-node",
    about = "Ayllu reward and enrollment service",
    version,
    propagate_version = true
)]
pub struct AylluNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Ayllu node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API and the metrics endpoint.
    Run(RunArgs),
    /// Transfer reward tokens to a receiver address.
    Claim(ClaimArgs),
    /// Register a student against the registration validator.
    Register(RegisterArgs),
    /// Print the script address of every validator in the blueprint.
    Addresses(AddressesArgs),
    /// Print version information and exit.
    Version,
}

/// Location of the ledger settings file, shared by every pipeline command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to the ledger settings file (JSON).
    ///
    /// Either a bare settings object or one nested under a `cardano` key.
    #[arg(long, short = 'c', env = "AYLLU_CONFIG")]
    pub config: PathBuf,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "AYLLU_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub settings: ConfigArgs,

    /// Address the API and metrics listeners bind to.
    #[arg(long, env = "AYLLU_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port for the REST API.
    #[arg(long, env = "AYLLU_API_PORT", default_value_t = 8080)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "AYLLU_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,
}

/// Arguments for the `claim` subcommand.
#[derive(Parser, Debug)]
pub struct ClaimArgs {
    #[command(flatten)]
    pub settings: ConfigArgs,

    /// Bech32 address receiving the tokens.
    #[arg(long)]
    pub receiver: String,

    /// Number of reward tokens to transfer.
    #[arg(long)]
    pub amount: u64,
}

/// Arguments for the `register` subcommand.
#[derive(Parser, Debug)]
pub struct RegisterArgs {
    #[command(flatten)]
    pub settings: ConfigArgs,

    /// Student's bech32 address. Receives the output and the change.
    #[arg(long)]
    pub student_address: String,

    /// Student's payment key hash (hex).
    #[arg(long)]
    pub student_pkh: String,

    /// Transaction hash of the script UTxO being spent.
    #[arg(long)]
    pub tx_hash: String,

    /// Output index of the script UTxO being spent.
    #[arg(long, default_value_t = 0)]
    pub output_index: u32,

    /// Spend with the cancel redeemer instead of register.
    #[arg(long)]
    pub cancel: bool,
}

/// Arguments for the `addresses` subcommand.
#[derive(Parser, Debug)]
pub struct AddressesArgs {
    #[command(flatten)]
    pub settings: ConfigArgs,
}
