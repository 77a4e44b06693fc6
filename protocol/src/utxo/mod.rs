//! # UTxO Handling
//!
//! Turning a ledger query into something coin selection can reason about,
//! and choosing which outputs fund a transfer.
//!
//! - **record** — [`UtxoRecord`], [`AssetId`] and the query-file parser.
//! - **selection** — the greedy token-first, ADA-top-up selector.

pub mod record;
pub mod selection;

pub use record::{parse_utxo_query, AssetId, UtxoParseError, UtxoRecord};
pub use selection::{InsufficientFunds, SelectionResult, UtxoSelector};
