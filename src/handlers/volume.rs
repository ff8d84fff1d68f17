//! Volume handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use uuid::Uuid;
use validator::Validate;

use super::{ApiJson, ApiPath};
use crate::error::AppError;
use crate::models::auth::AuthContext;
use crate::models::volume::{CreateVolume, UpdateVolume, VolumeDetail};
use crate::policy::{self, Action};
use crate::server::AppState;

pub async fn list_volumes(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store.list_volumes().await?))
}

pub async fn create_volume(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiJson(payload): ApiJson<CreateVolume>,
) -> Result<impl IntoResponse, AppError> {
    policy::guard(state.enforce_policies(), auth.as_deref(), Action::ManageCatalog)?;
    payload.validate()?;

    let volume = state.store.insert_volume(payload).await?;
    tracing::info!(volume_id = %volume.id, journal_id = %volume.journal_id, "Volume created");
    Ok((StatusCode::CREATED, Json(volume)))
}

/// Volume with its journal and issues
pub async fn get_volume(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let volume = state.store.get_volume(id).await?;
    let journal = state.store.get_journal(volume.journal_id).await?;
    let issues = state.store.issues_for_volumes(&[volume.id]).await?;

    Ok(Json(VolumeDetail {
        volume,
        journal,
        issues,
    }))
}

pub async fn update_volume(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateVolume>,
) -> Result<impl IntoResponse, AppError> {
    policy::guard(state.enforce_policies(), auth.as_deref(), Action::ManageCatalog)?;
    payload.validate()?;

    let volume = state.store.update_volume(id, payload).await?;
    Ok(Json(volume))
}

pub async fn delete_volume(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    policy::guard(state.enforce_policies(), auth.as_deref(), Action::ManageCatalog)?;

    state.store.delete_volume(id).await?;
    tracing::info!(volume_id = %id, "Volume deleted");
    Ok(StatusCode::NO_CONTENT)
}
