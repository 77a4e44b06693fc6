// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ayllu Protocol — Transaction Orchestration
//!
//! Ayllu moves its reward token and enrolls students by driving an external
//! ledger tool. This crate is everything between "a request arrived" and
//! "the tool said the transaction was submitted".
//!
//! ## Architecture
//!
//! - **config** — Ledger settings and the lovelace policy amounts.
//! - **network** — Canonical network flags from free-form settings.
//! - **process** — The external process runner seam.
//! - **scratch** — Per-run scratch files, released on every exit path.
//! - **utxo** — Query parsing and coin selection.
//! - **pipeline** — Transfer and registration state machines, plus script
//!   address derivation.
//! - **diagnostics** — Injected event sink replacing ad-hoc logging.
//! - **service** — The façade request boundaries call.
//!
//! ## Design Philosophy
//!
//! 1. The ledger tool is the authority on signing, scripts and consensus. We
//!    invoke it, we never re-implement it.
//! 2. Every run ends with one outcome and zero leftover files.
//! 3. Arguments are argv entries, never shell strings.
//! 4. Selection is deterministic. Same wallet, same request, same inputs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod network;
pub mod pipeline;
pub mod process;
pub mod scratch;
pub mod service;
pub mod utxo;

pub use config::{LedgerSettings, RegistrationSettings, SelectionPolicy};
pub use diagnostics::{DiagnosticsSink, PipelineEvent, RecordingSink, TracingSink};
pub use error::{PipelineError, StageFailure};
pub use pipeline::{PipelineOutcome, RegistrationRequest, TransferRequest};
pub use process::{CommandOutcome, CommandRunner, ProcessRunner};
pub use scratch::{ScratchScope, ScratchSpace};
pub use service::{LedgerService, TransactionService};
