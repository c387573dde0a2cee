// src/auth/handlers.rs
// Route handlers for /api

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::error::{ApiError, ApiResult};
use super::session::{clear_cookie, token_from_headers, SessionUser};
use super::AuthState;
use crate::types::{AuthProvider, User};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailLoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn google_login_handler(State(state): State<AuthState>) -> Response {
    begin_oauth(&state, AuthProvider::Google)
}

pub async fn github_login_handler(State(state): State<AuthState>) -> Response {
    begin_oauth(&state, AuthProvider::Github)
}

pub async fn google_callback_handler(
    State(state): State<AuthState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    finish_oauth(&state, AuthProvider::Google, params).await
}

pub async fn github_callback_handler(
    State(state): State<AuthState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    finish_oauth(&state, AuthProvider::Github, params).await
}

fn failure_redirect(state: &AuthState, provider: AuthProvider) -> Response {
    let url = format!(
        "{}/login?error={}_auth_failed",
        state.config.client_url.trim_end_matches('/'),
        provider
    );
    Redirect::to(&url).into_response()
}

fn begin_oauth(state: &AuthState, provider: AuthProvider) -> Response {
    match state.oauth.authorize_url(provider) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            warn!(%provider, "Cannot start OAuth login: {}", e);
            failure_redirect(state, provider)
        }
    }
}

async fn finish_oauth(state: &AuthState, provider: AuthProvider, params: CallbackParams) -> Response {
    if let Some(error) = params.error {
        warn!(%provider, "Provider returned error: {}", error);
        return failure_redirect(state, provider);
    }

    let (Some(code), Some(csrf)) = (params.code, params.state) else {
        warn!(%provider, "Callback missing code or state");
        return failure_redirect(state, provider);
    };

    match state.oauth.complete(provider, &code, &csrf).await {
        Ok(user) => {
            let token = state.sessions.create(user).await;
            let url = format!("{}?auth=success", state.config.client_url.trim_end_matches('/'));
            (
                [(header::SET_COOKIE, state.cookie_for(&token))],
                Redirect::to(&url),
            )
                .into_response()
        }
        Err(e) => {
            warn!(%provider, "OAuth login failed: {}", e);
            failure_redirect(state, provider)
        }
    }
}

async fn session_user(state: &AuthState, headers: &HeaderMap) -> Option<SessionUser> {
    let token = token_from_headers(headers)?;
    state.sessions.get(&token).await
}

/// The signed-in user; the provider access token is never part of the body
pub async fn current_user_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> ApiResult<Json<User>> {
    session_user(&state, &headers)
        .await
        .map(|s| Json(s.user))
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))
}

/// Password is accepted as-is; there is no credential store behind this login
pub async fn email_login_handler(
    State(state): State<AuthState>,
    body: Result<Json<EmailLoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let missing = || ApiError::bad_request("Email and password required");

    let Json(body) = body.map_err(|_| missing())?;
    let email = body
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(missing)?;
    body.password
        .filter(|p| !p.is_empty())
        .ok_or_else(missing)?;

    let user = email_user(&email, Utc::now().timestamp_millis());
    let token = state
        .sessions
        .create(SessionUser {
            user: user.clone(),
            access_token: None,
        })
        .await;

    info!(user_id = %user.id, "Email login");
    Ok(([(header::SET_COOKIE, state.cookie_for(&token))], Json(user)).into_response())
}

pub fn email_user(email: &str, millis: i64) -> User {
    let name = email.split('@').next().unwrap_or(email).to_string();
    User {
        id: format!("email_{}", millis),
        name,
        email: email.to_string(),
        avatar: None,
        provider: AuthProvider::Email,
    }
}

pub async fn logout_handler(State(state): State<AuthState>, headers: HeaderMap) -> Response {
    if let Some(token) = token_from_headers(&headers) {
        if state.sessions.destroy(&token).await {
            info!("Session destroyed");
        }
    }

    (
        [(header::SET_COOKIE, clear_cookie(state.config.is_production()))],
        Json(json!({ "message": "Logged out successfully" })),
    )
        .into_response()
}

pub async fn not_found_handler() -> ApiError {
    ApiError {
        message: "Not found".to_string(),
        status_code: axum::http::StatusCode::NOT_FOUND,
        error_code: Some("NOT_FOUND".to_string()),
    }
}
