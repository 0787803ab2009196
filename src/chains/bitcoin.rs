// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! Bitcoin confirmation adapter over an Esplora-style REST API
//! (mempool.space compatible).
//!
//! The sender check walks the transaction inputs looking for the expected
//! wallet among the previous-output addresses. Amount verification is
//! deliberately skipped: change outputs and fees make it unreliable, and the
//! sender check already prevents claiming someone else's transaction.

use async_trait::async_trait;
use serde::Deserialize;

use super::{ChainAdapter, ChainError, TxCheck};
use crate::config::CHAIN_CALL_TIMEOUT;

#[derive(Debug, Deserialize)]
struct EsploraTx {
    status: EsploraStatus,
    #[serde(default)]
    vin: Vec<EsploraVin>,
}

#[derive(Debug, Deserialize)]
struct EsploraStatus {
    confirmed: bool,
}

#[derive(Debug, Deserialize)]
struct EsploraVin {
    #[serde(default)]
    prevout: Option<EsploraPrevout>,
}

#[derive(Debug, Deserialize)]
struct EsploraPrevout {
    #[serde(default)]
    scriptpubkey_address: Option<String>,
}

pub struct BitcoinAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl BitcoinAdapter {
    pub fn new(base_url: &str) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(CHAIN_CALL_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ChainAdapter for BitcoinAdapter {
    fn chain(&self) -> &str {
        "bitcoin"
    }

    async fn check_transaction(&self, tx_hash: &str, expected_sender: &str) -> TxCheck {
        let url = format!("{}/tx/{tx_hash}", self.base_url);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => return TxCheck::TransientError(err.to_string()),
        };

        // Unknown txid: not broadcast yet, or a bad hash. Keep polling; the
        // overall monitor timeout bounds the bad-hash case.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return TxCheck::StillPending;
        }
        if !response.status().is_success() {
            return TxCheck::TransientError(format!("API error: {}", response.status()));
        }

        let tx: EsploraTx = match response.json().await {
            Ok(tx) => tx,
            Err(err) => return TxCheck::TransientError(err.to_string()),
        };

        evaluate(&tx, expected_sender)
    }
}

fn evaluate(tx: &EsploraTx, expected_sender: &str) -> TxCheck {
    if !tx.status.confirmed {
        return TxCheck::StillPending;
    }

    let sender_found = tx.vin.iter().any(|input| {
        input
            .prevout
            .as_ref()
            .and_then(|prevout| prevout.scriptpubkey_address.as_deref())
            .is_some_and(|address| address.eq_ignore_ascii_case(expected_sender))
    });

    if sender_found {
        TxCheck::Confirmed
    } else {
        TxCheck::PermanentFailure(format!(
            "sender {expected_sender} not found in transaction inputs"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> EsploraTx {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn unconfirmed_transaction_still_pending() {
        let tx = parse(r#"{"status":{"confirmed":false},"vin":[]}"#);
        assert_eq!(evaluate(&tx, "bc1qsender"), TxCheck::StillPending);
    }

    #[test]
    fn confirmed_with_matching_input_confirms() {
        let tx = parse(
            r#"{
                "status": {"confirmed": true},
                "vin": [
                    {"prevout": {"scriptpubkey_address": "bc1qother", "value": 1000}},
                    {"prevout": {"scriptpubkey_address": "bc1qsender", "value": 5000}}
                ]
            }"#,
        );
        assert_eq!(evaluate(&tx, "bc1qsender"), TxCheck::Confirmed);
    }

    #[test]
    fn confirmed_without_matching_input_fails_permanently() {
        let tx = parse(
            r#"{
                "status": {"confirmed": true},
                "vin": [{"prevout": {"scriptpubkey_address": "bc1qother"}}]
            }"#,
        );
        assert!(matches!(
            evaluate(&tx, "bc1qsender"),
            TxCheck::PermanentFailure(_)
        ));
    }

    #[test]
    fn coinbase_style_input_without_prevout_tolerated() {
        let tx = parse(r#"{"status":{"confirmed":true},"vin":[{}]}"#);
        assert!(matches!(
            evaluate(&tx, "bc1qsender"),
            TxCheck::PermanentFailure(_)
        ));
    }
}
