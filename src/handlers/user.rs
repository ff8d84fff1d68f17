//! User management handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use uuid::Uuid;

use super::{ApiJson, ApiPath};
use crate::error::AppError;
use crate::models::auth::AuthContext;
use crate::models::user::{CreateUser, UpdateUser, UserProfile};
use crate::policy::{self, Action};
use crate::server::AppState;
use crate::services::accounts;

/// List all users
pub async fn list_users(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
) -> Result<impl IntoResponse, AppError> {
    policy::guard(state.enforce_policies(), auth.as_deref(), Action::ManageUsers)?;

    let users = state.store.list_users().await?;
    let profiles: Vec<UserProfile> = users.into_iter().map(UserProfile::from).collect();
    Ok(Json(profiles))
}

/// Create a user
pub async fn create_user(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiJson(payload): ApiJson<CreateUser>,
) -> Result<impl IntoResponse, AppError> {
    policy::guard(state.enforce_policies(), auth.as_deref(), Action::ManageUsers)?;

    let user =
        accounts::create_user(state.store.as_ref(), payload, state.config.jwt.bcrypt_cost).await?;
    Ok((StatusCode::CREATED, Json(UserProfile::from(user))))
}

/// Get a user by id
pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.store.get_user(id).await?;
    Ok(Json(UserProfile::from(user)))
}

/// Partially update a user; users may edit themselves
pub async fn update_user(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateUser>,
) -> Result<impl IntoResponse, AppError> {
    let is_self = auth.as_deref().is_some_and(|a| a.user_id == id);
    if !is_self || payload.role.is_some() {
        policy::guard(state.enforce_policies(), auth.as_deref(), Action::ManageUsers)?;
    }
    payload.validate_all()?;

    let user = state.store.update_user(id, payload).await?;
    tracing::info!(user_id = %user.id, "User updated");
    Ok(Json(UserProfile::from(user)))
}
