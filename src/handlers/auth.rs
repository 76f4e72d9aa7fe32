use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::JsonBody;
use crate::errors::AppError;
use crate::models::{Role, Session};
use crate::services::{accounts, session};
use crate::state::AppState;

/// Resolves the caller from `Authorization: Bearer <token>`. The role always
/// comes from the signed token, never from anything else the client sends.
pub fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<Session, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;

    session::verify_token(token, &state.config.session_secret)
}

// POST /register
#[derive(Serialize)]
pub struct AccountResponse {
    id: String,
    name: String,
    email: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<accounts::Registration>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let account = accounts::register(&state.db, &state.config, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            id: account.id,
            name: account.name,
            email: account.email,
        }),
    ))
}

// POST /login
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
    role: Role,
    email: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let session = accounts::login(&state.db, &state.config, &body.email, &body.password).await?;

    let token = session::issue_token(
        &session,
        &state.config.session_secret,
        state.config.session_ttl(),
    )?;

    Ok(Json(LoginResponse {
        token,
        role: session.role,
        email: session.email,
    }))
}
