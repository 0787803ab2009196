// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::ApiError,
    models::{
        DebugTipRequest, TipHistoryItem, TipNotification, TipRequest, TipSubmitResponse,
        TipsResponse,
    },
    state::AppState,
    storage::auth::AuthRepository,
    storage::tips::{NewTip, TipRepository},
    storage::users::UserRepository,
};

use super::{require_user_session, require_wallet_session};

/// Minimum tip message length, in bytes. Matches the widget frontend's
/// validation so the two reject the same inputs.
const MIN_MESSAGE_LEN: usize = 27;

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 50;

#[utoipa::path(
    post,
    path = "/v1/tips",
    request_body = TipRequest,
    tag = "Tips",
    security(("bearer" = [])),
    responses(
        (status = 200, body = TipSubmitResponse),
        (status = 400, description = "Validation failure or unsupported chain"),
        (status = 401, description = "Missing or invalid wallet session"),
        (status = 403, description = "Wallet is blacklisted"),
        (status = 429, description = "Submitted again within the cooldown window")
    )
)]
pub async fn submit_tip(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TipRequest>,
) -> Result<Json<TipSubmitResponse>, ApiError> {
    let session = require_wallet_session(&state, &headers)?;
    let wallet = session.wallet_address;

    if request.message.len() < MIN_MESSAGE_LEN {
        return Err(ApiError::bad_request(format!(
            "Message must be at least {MIN_MESSAGE_LEN} characters long"
        )));
    }
    if request.tx_hash.is_empty() || request.amount.is_empty() {
        return Err(ApiError::bad_request("Missing transaction hash or amount"));
    }
    // The monitor verifies the on-chain sender against the session wallet,
    // so the claimed source address must be the wallet that authenticated.
    if !request.source_address.eq_ignore_ascii_case(&wallet) {
        return Err(ApiError::bad_request(
            "Source address does not match authenticated wallet",
        ));
    }

    let user_repo = UserRepository::new(&state.store);
    if user_repo.get_by_username(&request.streamer_id).is_err() {
        return Err(ApiError::not_found("Streamer not found"));
    }

    if AuthRepository::new(&state.store).is_wallet_blacklisted(&wallet)? {
        return Err(ApiError::forbidden("Wallet is blacklisted"));
    }

    // Charged only after validation, so a rejected request does not burn
    // the wallet's cooldown.
    if !state.rate_limiter.check_and_update(&wallet) {
        return Err(ApiError::too_many_requests(
            "Rate limit exceeded. Please wait 5 seconds.",
        ));
    }

    let adapter = state
        .registry
        .adapter_for(&request.chain_id)
        .ok_or_else(|| ApiError::bad_request("Unsupported chain"))?;

    let tip = TipRepository::new(&state.store).create(NewTip {
        streamer_id: request.streamer_id,
        sender: request.sender,
        message: request.message,
        amount: request.amount,
        asset: request.asset,
        tx_hash: request.tx_hash,
        chain_id: request.chain_id,
        source_chain: request.source_chain,
        dest_chain: request.dest_chain,
        source_address: wallet,
        dest_address: request.dest_address,
    })?;

    tracing::info!(tip_id = tip.id, chain = adapter.chain(), tx_hash = %tip.tx_hash, "Tip accepted; monitoring");
    let tip_id = tip.id;
    state.monitor.spawn(tip, adapter);

    Ok(Json(TipSubmitResponse {
        status: "pending".to_string(),
        tip_id,
        message: "Tip received! Waiting for transaction confirmation...".to_string(),
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TipsQuery {
    /// Page size; clamped to 50.
    pub limit: Option<usize>,
    /// Tip id to continue after; omit for the newest page.
    pub cursor: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/v1/tips",
    params(TipsQuery),
    tag = "Tips",
    security(("bearer" = [])),
    responses(
        (status = 200, body = TipsResponse),
        (status = 401, description = "Missing or invalid session")
    )
)]
pub async fn my_tips(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TipsQuery>,
) -> Result<Json<TipsResponse>, ApiError> {
    let session = require_user_session(&state, &headers)?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let cursor = query.cursor.unwrap_or(0);

    let tips = TipRepository::new(&state.store).list_by_streamer(
        &session.username,
        limit,
        cursor,
    )?;

    let next_cursor = match tips.last() {
        Some(last) if tips.len() == limit => last.id.to_string(),
        _ => String::new(),
    };

    let items = tips
        .into_iter()
        .map(|tip| TipHistoryItem {
            created_at: tip.created_at.to_rfc3339(),
            sender: tip.sender,
            message: tip.message,
            amount: tip.amount,
            asset: tip.asset,
            tx_hash: tip.tx_hash,
            source_chain: tip.source_chain,
            status: tip.status.as_str().to_string(),
        })
        .collect();

    Ok(Json(TipsResponse {
        tips: items,
        next_cursor,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/tips/debug",
    request_body = DebugTipRequest,
    tag = "Tips",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Notification broadcast to connected overlays"),
        (status = 401, description = "Missing or invalid session")
    )
)]
pub async fn debug_tip(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DebugTipRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Overlay styling aid for logged-in streamers; bypasses chain checks but
    // never touches tip storage.
    let session = require_user_session(&state, &headers)?;
    if session.username != request.streamer_id {
        return Err(ApiError::forbidden("Can only send test tips to yourself"));
    }

    let event = TipNotification::new(
        &request.streamer_id,
        &request.sender,
        &request.message,
        &request.amount,
    );
    let delivered = state.hub.broadcast(&request.streamer_id, &event);
    Ok(Json(serde_json::json!({
        "status": "sent",
        "delivered": delivered
    })))
}
