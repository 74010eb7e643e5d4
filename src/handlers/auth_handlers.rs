//! HTTP handlers for sign-in, sign-out, session polling, and the
//! connectivity toggle. Auth errors surface to the client as messages;
//! they are never absorbed the way catalog errors are.

use crate::{errors::AppError, state::AppState};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ConnectivityRequest {
    pub online: bool,
}

/// POST `/api/auth/login` — email/password sign-in.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .gate
        .sign_in_with_password(&req.email, &req.password)
        .await?;
    Ok(Json(session))
}

/// POST `/api/auth/google` — interactive provider flow.
pub async fn login_google(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let session = state.gate.sign_in_interactive().await?;
    Ok(Json(session))
}

/// POST `/api/auth/logout`.
pub async fn logout(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.gate.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/api/auth/session` — poll the provider once and return the
/// resulting session snapshot.
pub async fn session(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let session = state.gate.refresh().await?;
    Ok(Json(session))
}

/// POST `/api/auth/connectivity` — host-reported online/offline toggle,
/// passed through to the role database client.
pub async fn connectivity(
    State(state): State<AppState>,
    Json(req): Json<ConnectivityRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.gate.set_online(req.online).await;
    Ok(StatusCode::NO_CONTENT)
}
