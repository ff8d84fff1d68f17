//! Issue handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use uuid::Uuid;
use validator::Validate;

use super::{ApiJson, ApiPath};
use crate::error::AppError;
use crate::models::auth::AuthContext;
use crate::models::issue::{CreateIssue, IssueDetail, UpdateIssue};
use crate::policy::{self, Action};
use crate::server::AppState;

pub async fn list_issues(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store.list_issues().await?))
}

pub async fn create_issue(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiJson(payload): ApiJson<CreateIssue>,
) -> Result<impl IntoResponse, AppError> {
    policy::guard(state.enforce_policies(), auth.as_deref(), Action::ManageCatalog)?;
    payload.validate()?;

    let issue = state.store.insert_issue(payload).await?;
    tracing::info!(issue_id = %issue.id, volume_id = %issue.volume_id, "Issue created");
    Ok((StatusCode::CREATED, Json(issue)))
}

/// Issue with its owning volume
pub async fn get_issue(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let issue = state.store.get_issue(id).await?;
    let volume = state.store.get_volume(issue.volume_id).await?;
    Ok(Json(IssueDetail { issue, volume }))
}

pub async fn update_issue(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateIssue>,
) -> Result<impl IntoResponse, AppError> {
    policy::guard(state.enforce_policies(), auth.as_deref(), Action::ManageCatalog)?;
    payload.validate_all()?;

    let issue = state.store.update_issue(id, payload).await?;
    Ok(Json(issue))
}

pub async fn delete_issue(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    policy::guard(state.enforce_policies(), auth.as_deref(), Action::ManageCatalog)?;

    state.store.delete_issue(id).await?;
    tracing::info!(issue_id = %id, "Issue deleted");
    Ok(StatusCode::NO_CONTENT)
}
