// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! EVM confirmation adapter.
//!
//! Two RPC reads per poll: the receipt settles success/revert, the
//! transaction body yields the recovered sender. A missing receipt reads as
//! still pending; a revert or sender mismatch is permanent.

use std::str::FromStr;

use alloy::{
    network::TransactionResponse,
    primitives::TxHash,
    providers::{Provider, RootProvider},
};
use async_trait::async_trait;
use tokio::time::timeout;

use super::{ChainAdapter, ChainError, TxCheck};
use crate::config::CHAIN_CALL_TIMEOUT;

pub struct EvmAdapter {
    /// `evm-<chain_id>`, for logging.
    name: String,
    provider: RootProvider,
}

impl EvmAdapter {
    pub fn new(chain_id: &str, rpc_url: &str) -> Result<Self, ChainError> {
        let url: url::Url = rpc_url.parse().map_err(|source| ChainError::InvalidRpcUrl {
            chain: chain_id.to_string(),
            source,
        })?;
        Ok(Self {
            name: format!("evm-{chain_id}"),
            provider: RootProvider::new_http(url),
        })
    }
}

#[async_trait]
impl ChainAdapter for EvmAdapter {
    fn chain(&self) -> &str {
        &self.name
    }

    async fn check_transaction(&self, tx_hash: &str, expected_sender: &str) -> TxCheck {
        let hash = match TxHash::from_str(tx_hash) {
            Ok(hash) => hash,
            Err(_) => return TxCheck::PermanentFailure("malformed transaction hash".to_string()),
        };

        let receipt = match timeout(
            CHAIN_CALL_TIMEOUT,
            self.provider.get_transaction_receipt(hash),
        )
        .await
        {
            Err(_) => return TxCheck::TransientError("receipt lookup timed out".to_string()),
            Ok(Err(err)) => return TxCheck::TransientError(err.to_string()),
            Ok(Ok(None)) => return TxCheck::StillPending,
            Ok(Ok(Some(receipt))) => receipt,
        };

        if !receipt.status() {
            return TxCheck::PermanentFailure("transaction reverted".to_string());
        }

        let tx = match timeout(
            CHAIN_CALL_TIMEOUT,
            self.provider.get_transaction_by_hash(hash),
        )
        .await
        {
            Err(_) => return TxCheck::TransientError("transaction lookup timed out".to_string()),
            Ok(Err(err)) => return TxCheck::TransientError(err.to_string()),
            // Receipt exists but the body is gone: a reorg window, keep polling.
            Ok(Ok(None)) => return TxCheck::StillPending,
            Ok(Ok(Some(tx))) => tx,
        };

        let from = tx.from();
        if from.to_string().eq_ignore_ascii_case(expected_sender) {
            TxCheck::Confirmed
        } else {
            TxCheck::PermanentFailure(format!(
                "sender mismatch: tx.from={from}, expected={expected_sender}"
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_hash_is_a_permanent_failure() {
        let adapter = EvmAdapter::new("8453", "https://mainnet.base.org").unwrap();
        let verdict = adapter.check_transaction("not-a-hash", "0xabc").await;
        assert!(matches!(verdict, TxCheck::PermanentFailure(_)));
    }

    #[test]
    fn bad_rpc_url_rejected_at_construction() {
        assert!(matches!(
            EvmAdapter::new("1", "not a url"),
            Err(ChainError::InvalidRpcUrl { .. })
        ));
    }
}
