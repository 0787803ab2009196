// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! Overlay websocket and widget configuration.
//!
//! The OBS overlay connects with the account's widget token in the URL; the
//! token is the only credential (overlays cannot hold login sessions). The
//! socket is one-way: the server pushes tip notifications, and inbound
//! frames are drained only to detect disconnects.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
    Json,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::unbounded_channel;

use crate::{error::ApiError, models::WidgetConfigResponse, state::AppState,
    storage::users::UserRepository};

#[utoipa::path(
    get,
    path = "/v1/widget/config/{token}",
    params(("token" = String, Path, description = "Widget token from the dashboard")),
    tag = "Widget",
    responses(
        (status = 200, body = WidgetConfigResponse),
        (status = 404, description = "Unknown widget token")
    )
)]
pub async fn widget_config(
    Path(token): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<WidgetConfigResponse>, ApiError> {
    let user = UserRepository::new(&state.store)
        .get_by_widget_token(&token)
        .map_err(|_| ApiError::not_found("Widget not found"))?;

    Ok(Json(WidgetConfigResponse {
        username: user.username,
        wallet_address: user.wallet_address,
    }))
}

/// Upgrade an overlay connection after widget-token authentication.
pub async fn overlay_ws(
    Path(token): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let user = UserRepository::new(&state.store)
        .get_by_widget_token(&token)
        .map_err(|_| ApiError::unauthorized("Invalid widget token"))?;

    let username = user.username;
    tracing::info!(username = %username, "Overlay connected");
    Ok(ws.on_upgrade(move |socket| serve_overlay(state, username, socket)))
}

async fn serve_overlay(state: AppState, username: String, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (event_tx, mut event_rx) = unbounded_channel();
    let conn_id = state.hub.register(&username, event_tx);

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(err) => {
                        tracing::error!(error = %err, "Could not encode notification");
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            // Inbound traffic is ignored; a closed or failed read ends the
            // connection.
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
        }
    }

    state.hub.unregister(conn_id);
    tracing::info!(username = %username, "Overlay disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::Config::from_env();
        config.data_dir = dir.path().to_string_lossy().into_owned();
        config.jwt_secret = "test-secret".to_string();
        let state = AppState::build(config, CancellationToken::new()).unwrap();
        (state, dir)
    }

    #[tokio::test]
    async fn widget_config_resolves_token() {
        let (state, _dir) = test_state();
        let user = UserRepository::new(&state.store)
            .create("alice", "0xabc", true)
            .unwrap();

        let Json(response) = widget_config(Path(user.widget_token), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(response.username, "alice");

        let err = widget_config(Path("bogus".to_string()), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
    }
}
