// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! Wire-level request and response types for the HTTP API.
//!
//! Tip submission fields use camelCase to match the widget frontend; auth
//! and profile payloads use snake_case.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Wallet login request. The client signs the canonical challenge
/// `{"address":"<address>","timestamp":<timestamp>}` with its wallet key.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WalletLoginRequest {
    pub address: String,
    /// Unix seconds at which the challenge was signed.
    pub timestamp: i64,
    /// Hex (EVM) or base58 (Solana-style) encoded signature.
    pub signature: String,
}

/// Successful wallet login, or a handoff to signup for unknown wallets.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WalletLoginResponse {
    /// `success` or `signup_needed`.
    pub status: String,
    /// User session token (present when the wallet maps to an account).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Wallet session token authorizing tip submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Short-lived credential for completing signup; does not authorize tipping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signup_token: Option<String>,
}

/// Signup completion for a wallet that passed login but has no account yet.
/// The wallet address comes from the signup token, not the request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub username: String,
    pub signup_token: String,
    #[serde(default)]
    pub main_wallet: bool,
}

/// Successful signup: the fresh account plus both session tokens.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignupResponse {
    pub status: String,
    pub token: String,
    pub wallet_token: String,
    pub expires_in: u64,
    pub username: String,
    pub widget_token: String,
}

/// Tip submission from the widget frontend.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TipRequest {
    /// Username of the streamer receiving the tip.
    pub streamer_id: String,
    /// Display name of the tipper.
    pub sender: String,
    #[serde(default)]
    pub message: String,
    pub amount: String,
    pub tx_hash: String,
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub chain_id: String,
    #[serde(default)]
    pub source_chain: String,
    #[serde(default)]
    pub dest_chain: String,
    #[serde(default)]
    pub source_address: String,
    #[serde(default)]
    pub dest_address: String,
}

/// Event pushed to every connected overlay of the recipient streamer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TipNotification {
    /// Always `"TIP"`.
    pub r#type: String,
    pub streamer_id: String,
    pub sender: String,
    pub message: String,
    pub amount: String,
}

impl TipNotification {
    pub fn new(streamer_id: &str, sender: &str, message: &str, amount: &str) -> Self {
        Self {
            r#type: "TIP".to_string(),
            streamer_id: streamer_id.to_string(),
            sender: sender.to_string(),
            message: message.to_string(),
            amount: amount.to_string(),
        }
    }
}

/// Acknowledgement that a tip was accepted for confirmation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TipSubmitResponse {
    /// Always `pending`; the overlay fires only after on-chain confirmation.
    pub status: String,
    pub tip_id: u64,
    pub message: String,
}

/// One tip in the streamer's paginated history.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TipHistoryItem {
    pub created_at: String,
    pub sender: String,
    pub message: String,
    pub amount: String,
    pub asset: String,
    pub tx_hash: String,
    pub source_chain: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TipsResponse {
    pub tips: Vec<TipHistoryItem>,
    /// Cursor for the next page; empty when exhausted.
    pub next_cursor: String,
}

/// Immediately broadcasts a confirmed-looking notification, bypassing chain
/// verification. Overlay styling aid.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebugTipRequest {
    pub streamer_id: String,
    pub sender: String,
    #[serde(default)]
    pub message: String,
    pub amount: String,
}

/// Public profile, as shown on the tipping page.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicProfileResponse {
    pub id: u64,
    pub username: String,
    pub wallet_address: String,
}

/// Authenticated view of the caller's own account.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: u64,
    pub username: String,
    pub wallet_address: String,
    pub main_wallet: bool,
    pub widget_token: String,
}

/// Overlay configuration resolved from a widget token.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WidgetConfigResponse {
    pub username: String,
    pub wallet_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tip_notification_wire_format() {
        let event = TipNotification::new("alice", "0xABCD", "gg", "5");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"TIP","streamerId":"alice","sender":"0xABCD","message":"gg","amount":"5"}"#
        );
    }

    #[test]
    fn tip_request_accepts_camel_case() {
        let json = r#"{
            "streamerId": "alice",
            "sender": "bob.eth",
            "amount": "5",
            "txHash": "0x1234",
            "chainId": "8453",
            "sourceAddress": "0xabc"
        }"#;
        let req: TipRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.streamer_id, "alice");
        assert_eq!(req.tx_hash, "0x1234");
        assert_eq!(req.chain_id, "8453");
        assert!(req.message.is_empty());
    }
}
