//! # Ayllu Contracts
//!
//! The off-chain half of the Ayllu validators: how their data is laid out,
//! how it is serialized for the ledger tool, and where their compiled code
//! lives.
//!
//! - **Plutus data** — the [`PlutusValue`] tree and its JSON encoder.
//! - **Blueprint** — loading the compiled-contract manifest and wrapping
//!   validators in the ledger tool's script envelope.
//! - **Registration** — datum and redeemer of the enrollment validator.
//! - **Minting** — validator parameters and the minting redeemer.
//!
//! ## Design Principles
//!
//! 1. Every datum, redeemer and parameter is built from real enum variants,
//!    never ad-hoc JSON, so the transfer and registration flows cannot drift
//!    apart on schema.
//! 2. The encoder is structural only. Whether a tree is semantically valid
//!    is the validator's call.
//! 3. No caching. The manifest is read on every lookup.

pub mod blueprint;
pub mod minting;
pub mod plutus_data;
pub mod registration;

pub use blueprint::{lookup_validator, Blueprint, BlueprintError, BlueprintValidator, ScriptEnvelope};
pub use minting::{mint_redeemer, MintParam, RegParam};
pub use plutus_data::{encode, IntKey, PlutusError, PlutusValue, ToPlutus};
pub use registration::{
    OutputReference, RegistrationAction, RegistrationDatum, RegistrationRedeemer,
};
