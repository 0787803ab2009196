// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! Sui confirmation adapter over JSON-RPC `sui_getTransactionBlock`.
//!
//! Sui nodes report unknown digests as an RPC error rather than a null
//! result, so RPC errors read as still pending here. Only an explicit
//! non-success effects status or a sender mismatch is permanent.

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
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    effects: Option<TxEffects>,
    #[serde(default)]
    transaction: Option<TxBody>,
}

#[derive(Debug, Deserialize)]
struct TxEffects {
    #[serde(default)]
    status: Option<TxStatus>,
}

#[derive(Debug, Deserialize)]
struct TxStatus {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct TxBody {
    #[serde(default)]
    data: Option<TxData>,
}

#[derive(Debug, Deserialize)]
struct TxData {
    #[serde(default)]
    sender: String,
}

pub struct SuiAdapter {
    client: reqwest::Client,
    rpc_url: String,
}

impl SuiAdapter {
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
impl ChainAdapter for SuiAdapter {
    fn chain(&self) -> &str {
        "sui"
    }

    async fn check_transaction(&self, tx_hash: &str, expected_sender: &str) -> TxCheck {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "sui_getTransactionBlock",
            "params": [
                tx_hash,
                {
                    "showEffects": true,
                    "showInput": true
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
    // "digest not found" arrives as an RPC error; treat any error as pending
    // and let the monitor timeout bound truly invalid digests.
    if rpc.error.is_some() {
        return TxCheck::StillPending;
    }
    let Some(result) = &rpc.result else {
        return TxCheck::StillPending;
    };

    let succeeded = result
        .effects
        .as_ref()
        .and_then(|effects| effects.status.as_ref())
        .is_some_and(|status| status.status == "success");
    if !succeeded {
        return TxCheck::PermanentFailure("transaction failed on-chain".to_string());
    }

    let Some(sender) = result
        .transaction
        .as_ref()
        .and_then(|tx| tx.data.as_ref())
        .map(|data| data.sender.as_str())
    else {
        return TxCheck::PermanentFailure("transaction data missing".to_string());
    };

    if sender == expected_sender {
        TxCheck::Confirmed
    } else {
        TxCheck::PermanentFailure(format!(
            "sender mismatch: expected {expected_sender}, got {sender}"
        ))
    }
}
