// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! # Chain Adapters
//!
//! One adapter per supported chain family answers a single question: has
//! this transaction confirmed, and was it sent by the expected wallet?
//!
//! ## Strategy
//!
//! Adapters never return a plain error. Every outcome folds into [`TxCheck`]
//! so the monitor can distinguish "keep polling" from "give up":
//!
//! - `Confirmed`: on-chain success and the sender matches
//! - `StillPending`: not visible or not yet confirmed; poll again
//! - `PermanentFailure`: reverted, failed on-chain, or sender mismatch;
//!   never retried
//! - `TransientError`: RPC trouble (timeout, 5xx, decode); poll again
//!
//! Chain selection keys on the tip's `chain_id` string: `solana`, `bitcoin`,
//! the Sui sentinel id, and numeric EVM chain ids.

pub mod bitcoin;
pub mod evm;
pub mod solana;
pub mod sui;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, SUI_CHAIN_ID};

/// Outcome of one confirmation poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxCheck {
    /// Transaction succeeded on-chain and the sender matches.
    Confirmed,
    /// Transaction not yet visible or not yet confirmed.
    StillPending,
    /// Transaction can never confirm for this tip; stop polling.
    PermanentFailure(String),
    /// RPC-level trouble; the transaction itself is not implicated.
    TransientError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("invalid RPC URL for chain {chain}: {source}")]
    InvalidRpcUrl {
        chain: String,
        source: url::ParseError,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A chain family's confirmation check.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Human-readable chain name for logging.
    fn chain(&self) -> &str;

    /// Poll the chain once for the transaction's status.
    async fn check_transaction(&self, tx_hash: &str, expected_sender: &str) -> TxCheck;
}

/// Adapter lookup by tip `chain_id`.
pub struct ChainRegistry {
    evm: HashMap<String, Arc<dyn ChainAdapter>>,
    bitcoin: Arc<dyn ChainAdapter>,
    solana: Arc<dyn ChainAdapter>,
    sui: Arc<dyn ChainAdapter>,
}

impl ChainRegistry {
    pub fn from_config(config: &Config) -> Result<Self, ChainError> {
        let mut evm: HashMap<String, Arc<dyn ChainAdapter>> = HashMap::new();
        for (chain_id, rpc_url) in &config.evm_rpc_urls {
            let adapter = evm::EvmAdapter::new(chain_id, rpc_url)?;
            evm.insert(chain_id.clone(), Arc::new(adapter));
        }

        Ok(Self {
            evm,
            bitcoin: Arc::new(bitcoin::BitcoinAdapter::new(&config.bitcoin_api_url)?),
            solana: Arc::new(solana::SolanaAdapter::new(&config.solana_rpc_url)?),
            sui: Arc::new(sui::SuiAdapter::new(&config.sui_rpc_url)?),
        })
    }

    /// Resolve the adapter for a tip's `chain_id`. `None` means the chain is
    /// not supported and the tip must be rejected at intake.
    pub fn adapter_for(&self, chain_id: &str) -> Option<Arc<dyn ChainAdapter>> {
        match chain_id {
            "solana" => Some(self.solana.clone()),
            "bitcoin" => Some(self.bitcoin.clone()),
            SUI_CHAIN_ID => Some(self.sui.clone()),
            evm_id => self.evm.get(evm_id).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ChainRegistry {
        ChainRegistry::from_config(&Config::from_env()).unwrap()
    }

    #[test]
    fn selection_covers_all_chain_families() {
        let registry = registry();

        assert_eq!(registry.adapter_for("solana").unwrap().chain(), "solana");
        assert_eq!(registry.adapter_for("bitcoin").unwrap().chain(), "bitcoin");
        assert_eq!(registry.adapter_for("100003").unwrap().chain(), "sui");
        assert_eq!(registry.adapter_for("8453").unwrap().chain(), "evm-8453");
    }

    #[test]
    fn unknown_evm_chain_has_no_adapter() {
        assert!(registry().adapter_for("999999").is_none());
    }
}
