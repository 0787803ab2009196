// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Streamtip

//! HTTP surface: auth, tips, profiles, overlay websocket, docs.

use axum::{
    http::{header, HeaderMap},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::ApiError,
    models::{
        DebugTipRequest, MeResponse, PublicProfileResponse, SignupRequest, SignupResponse,
        TipHistoryItem, TipNotification, TipRequest, TipSubmitResponse, TipsResponse,
        WalletLoginRequest, WalletLoginResponse, WidgetConfigResponse,
    },
    state::AppState,
    storage::auth::{AuthRepository, UserSessionRecord, WalletSessionRecord},
};

pub mod auth;
pub mod health;
pub mod tips;
pub mod users;
pub mod widget;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/wallet-login", post(auth::wallet_login))
        .route("/auth/signup", post(auth::signup))
        .route("/tips", post(tips::submit_tip).get(tips::my_tips))
        .route("/tips/debug", post(tips::debug_tip))
        .route("/users/me", get(users::me))
        .route("/users/me/widget-token", post(users::regenerate_widget_token))
        .route("/users/{username}", get(users::public_profile))
        .route("/widget/config/{token}", get(widget::widget_config))
        .route("/widget/ws/{token}", get(widget::overlay_ws))
        .with_state(state);

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", v1_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
}

/// Extract the bearer token from the Authorization header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Missing or invalid token"))
}

/// Validate a user session bearer token against both the JWT and the
/// session table (so revoked sessions fail even with a valid signature).
pub(crate) fn require_user_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<UserSessionRecord, ApiError> {
    let token = bearer_token(headers)?;
    state
        .authenticator
        .tokens()
        .verify_user_session(token)
        .map_err(|_| ApiError::unauthorized("Invalid session token"))?;
    AuthRepository::new(&state.store)
        .get_user_session(token)
        .map_err(|_| ApiError::unauthorized("Invalid session token"))
}

/// Validate a wallet session bearer token the same two-step way.
pub(crate) fn require_wallet_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<WalletSessionRecord, ApiError> {
    let token = bearer_token(headers)?;
    state
        .authenticator
        .tokens()
        .verify_wallet_session(token)
        .map_err(|_| ApiError::unauthorized("Invalid session token"))?;
    AuthRepository::new(&state.store)
        .get_wallet_session(token)
        .map_err(|_| ApiError::unauthorized("Invalid session token"))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::wallet_login,
        auth::signup,
        tips::submit_tip,
        tips::my_tips,
        tips::debug_tip,
        users::me,
        users::regenerate_widget_token,
        users::public_profile,
        widget::widget_config,
        health::health
    ),
    components(
        schemas(
            WalletLoginRequest,
            WalletLoginResponse,
            SignupRequest,
            SignupResponse,
            TipRequest,
            TipSubmitResponse,
            TipHistoryItem,
            TipsResponse,
            TipNotification,
            DebugTipRequest,
            MeResponse,
            PublicProfileResponse,
            WidgetConfigResponse,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Wallet signature login and signup"),
        (name = "Tips", description = "Tip submission and history"),
        (name = "Users", description = "Profiles and widget tokens"),
        (name = "Widget", description = "Overlay websocket and configuration"),
        (name = "Health", description = "Liveness")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc");

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_err());
    }
}
