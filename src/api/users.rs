// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};

use crate::{
    error::ApiError,
    models::{MeResponse, PublicProfileResponse},
    state::AppState,
    storage::users::UserRepository,
};

use super::require_user_session;

#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, body = MeResponse),
        (status = 401, description = "Missing or invalid session")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, ApiError> {
    let session = require_user_session(&state, &headers)?;
    let user = UserRepository::new(&state.store).get_by_username(&session.username)?;

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        wallet_address: user.wallet_address,
        main_wallet: user.main_wallet,
        widget_token: user.widget_token,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/users/me/widget-token",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "New widget token; old overlay URLs stop working"),
        (status = 401, description = "Missing or invalid session")
    )
)]
pub async fn regenerate_widget_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session = require_user_session(&state, &headers)?;
    let token = UserRepository::new(&state.store).regenerate_widget_token(&session.username)?;

    tracing::info!(username = %session.username, "Widget token rotated");
    Ok(Json(serde_json::json!({ "widget_token": token })))
}

#[utoipa::path(
    get,
    path = "/v1/users/{username}",
    params(("username" = String, Path, description = "Streamer username")),
    tag = "Users",
    responses(
        (status = 200, body = PublicProfileResponse),
        (status = 404, description = "No such streamer")
    )
)]
pub async fn public_profile(
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PublicProfileResponse>, ApiError> {
    let user = UserRepository::new(&state.store)
        .get_by_username(&username)
        .map_err(|_| ApiError::not_found("Streamer not found"))?;

    // Public view: never expose the widget token here.
    Ok(Json(PublicProfileResponse {
        id: user.id,
        username: user.username,
        wallet_address: user.wallet_address,
    }))
}
