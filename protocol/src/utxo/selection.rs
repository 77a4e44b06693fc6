//! # Coin Selection
//!
//! Chooses which UTxOs fund a token transfer. Two phases, both greedy:
//!
//! 1. **Tokens.** Outputs holding the asset, richest first, until the
//!    requested amount is covered.
//! 2. **ADA top-up.** If the token inputs do not carry enough lovelace for
//!    the receiver output, change buffer and fee, add token-free outputs,
//!    largest first, skipping anything below the dust threshold.
//!
//! Ties are broken by ADA (descending) and then by id, so the same input set
//! always yields the same selection. Selection is pure: it never mutates its
//! input and reads no global state.

use std::cmp::Ordering;

use thiserror::Error;

use super::record::UtxoRecord;
use crate::config::DEFAULT_DUST_THRESHOLD_LOVELACE;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The available outputs cannot cover the request.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InsufficientFunds {
    #[error("insufficient tokens: required {required}, available {available}")]
    Tokens { required: u64, available: u64 },

    /// Available counts token inputs plus every eligible top-up.
    #[error("insufficient ADA: required {required} lovelace, available {available}")]
    Ada { required: u64, available: u64 },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The chosen inputs and their totals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionResult {
    /// Token inputs first, then ADA top-ups, each in selection order.
    pub selected: Vec<UtxoRecord>,
    pub total_ada: u64,
    pub total_tokens: u64,
}

impl SelectionResult {
    /// Ids of the selected outputs, in order.
    pub fn input_ids(&self) -> Vec<String> {
        self.selected.iter().map(|u| u.id.clone()).collect()
    }
}

/// Greedy two-phase selector.
#[derive(Clone, Copy, Debug)]
pub struct UtxoSelector {
    dust_threshold: u64,
}

impl Default for UtxoSelector {
    fn default() -> Self {
        Self::new(DEFAULT_DUST_THRESHOLD_LOVELACE)
    }
}

impl UtxoSelector {
    pub fn new(dust_threshold: u64) -> Self {
        Self { dust_threshold }
    }

    pub fn dust_threshold(&self) -> u64 {
        self.dust_threshold
    }

    /// Select inputs covering `required_tokens` units and at least
    /// `required_ada_floor` lovelace.
    pub fn select(
        &self,
        utxos: &[UtxoRecord],
        required_tokens: u64,
        required_ada_floor: u64,
    ) -> Result<SelectionResult, InsufficientFunds> {
        let mut token_pool: Vec<&UtxoRecord> =
            utxos.iter().filter(|u| u.token_amount > 0).collect();

        let available_tokens = token_pool
            .iter()
            .fold(0u64, |acc, u| acc.saturating_add(u.token_amount));
        if available_tokens < required_tokens {
            return Err(InsufficientFunds::Tokens {
                required: required_tokens,
                available: available_tokens,
            });
        }

        token_pool.sort_by(|a, b| by_tokens(a, b));

        let mut selected = Vec::new();
        let mut total_tokens = 0u64;
        let mut total_ada = 0u64;

        for utxo in &token_pool {
            if total_tokens >= required_tokens {
                break;
            }
            total_tokens = total_tokens.saturating_add(utxo.token_amount);
            total_ada = total_ada.saturating_add(utxo.ada_amount);
            selected.push((*utxo).clone());
        }

        if total_ada < required_ada_floor {
            let mut ada_pool: Vec<&UtxoRecord> = utxos
                .iter()
                .filter(|u| u.token_amount == 0 && u.ada_amount >= self.dust_threshold)
                .collect();
            ada_pool.sort_by(|a, b| by_ada(a, b));

            for utxo in &ada_pool {
                if total_ada >= required_ada_floor {
                    break;
                }
                total_ada = total_ada.saturating_add(utxo.ada_amount);
                selected.push((*utxo).clone());
            }

            if total_ada < required_ada_floor {
                return Err(InsufficientFunds::Ada {
                    required: required_ada_floor,
                    available: total_ada,
                });
            }
        }

        Ok(SelectionResult {
            selected,
            total_ada,
            total_tokens,
        })
    }
}

fn by_tokens(a: &UtxoRecord, b: &UtxoRecord) -> Ordering {
    b.token_amount
        .cmp(&a.token_amount)
        .then_with(|| by_ada(a, b))
}

fn by_ada(a: &UtxoRecord, b: &UtxoRecord) -> Ordering {
    b.ada_amount
        .cmp(&a.ada_amount)
        .then_with(|| a.id.cmp(&b.id))
}
