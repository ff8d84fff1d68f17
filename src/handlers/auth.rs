//! Signup, login and token refresh handlers

use axum::{extract::State, response::IntoResponse, Json};
use tracing::info;

use super::ApiJson;
use crate::error::AppError;
use crate::models::auth::{RefreshRequest, TokenKind, TokenResponse};
use crate::models::user::{LoginRequest, SignupRequest};
use crate::server::AppState;
use crate::services::accounts;

/// Register a publisher account and return a token pair
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = accounts::signup(state.store.as_ref(), payload, state.config.jwt.bcrypt_cost).await?;
    let pair = state.tokens.issue(&user)?;

    info!(user_id = %user.id, "User signed up");
    Ok(Json(TokenResponse::new(pair, &user)))
}

/// Exchange credentials for a token pair
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = accounts::authenticate(state.store.as_ref(), &payload).await?;
    let pair = state.tokens.issue(&user)?;

    Ok(Json(TokenResponse::new(pair, &user)))
}

/// Exchange a refresh token for a fresh pair
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let claims = state.tokens.verify(&payload.refresh, TokenKind::Refresh)?;

    let user = match state.store.get_user(claims.user_id()?).await {
        Ok(user) if user.is_active => user,
        Ok(_) | Err(AppError::NotFound { .. }) => {
            return Err(AppError::Authentication("User no longer available".to_string()))
        }
        Err(e) => return Err(e),
    };

    let pair = state.tokens.issue(&user)?;
    Ok(Json(TokenResponse::new(pair, &user)))
}
