// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! Solana confirmation adapter over JSON-RPC `getTransaction`.
//!
//! A null result means the transaction is not yet finalized (or unknown),
//! so the poll continues. A non-null `meta.err` is a permanent on-chain
//! failure. The sender check matches the expected wallet against the
//! transaction's signer account keys.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{ChainAdapter, ChainError, TxCheck};
use crate::config::CHAIN_CALL_TIMEOUT;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<TxResult>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    meta: Option<TxMeta>,
    #[serde(default)]
    transaction: Option<TxBody>,
}

#[derive(Debug, Deserialize)]
struct TxMeta {
    #[serde(default)]
    err: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TxBody {
    #[serde(default)]
    message: Option<TxMessage>,
}

#[derive(Debug, Deserialize)]
struct TxMessage {
    #[serde(default, rename = "accountKeys")]
    account_keys: Vec<AccountKey>,
}

#[derive(Debug, Deserialize)]
struct AccountKey {
    pubkey: String,
    #[serde(default)]
    signer: bool,
}

pub struct SolanaAdapter {
    client: reqwest::Client,
    rpc_url: String,
}

impl SolanaAdapter {
    pub fn new(rpc_url: &str) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(CHAIN_CALL_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
        })
    }
}

#[async_trait]
impl ChainAdapter for SolanaAdapter {
    fn chain(&self) -> &str {
        "solana"
    }

    async fn check_transaction(&self, tx_hash: &str, expected_sender: &str) -> TxCheck {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getTransaction",
            "params": [
                tx_hash,
                {
                    "encoding": "jsonParsed",
                    "maxSupportedTransactionVersion": 0
                }
            ]
        });

        let response = match self.client.post(&self.rpc_url).json(&payload).send().await {
            Ok(response) => response,
            Err(err) => return TxCheck::TransientError(err.to_string()),
        };

        let rpc: RpcResponse = match response.json().await {
            Ok(rpc) => rpc,
            Err(err) => return TxCheck::TransientError(err.to_string()),
        };

        evaluate(&rpc, expected_sender)
    }
}

fn evaluate(rpc: &RpcResponse, expected_sender: &str) -> TxCheck {
    if let Some(error) = &rpc.error {
        return TxCheck::TransientError(format!("RPC error: {}", error.message));
    }

    let Some(result) = &rpc.result else {
        return TxCheck::StillPending;
    };

    if let Some(meta) = &result.meta {
        if meta.err.is_some() {
            return TxCheck::PermanentFailure("transaction failed on-chain".to_string());
        }
    }

    // Base58 pubkeys are case-sensitive; compare exactly.
    if let Some(message) = result.transaction.as_ref().and_then(|tx| tx.message.as_ref()) {
        let signer_matches = message
            .account_keys
            .iter()
            .any(|key| key.signer && key.pubkey == expected_sender);
        if signer_matches {
            TxCheck::Confirmed
        } else {
            TxCheck::PermanentFailure(format!("sender mismatch: expected {expected_sender}"))
        }
    } else {
        // Parsed message absent; the on-chain status already passed.
        TxCheck::Confirmed
    }
}
