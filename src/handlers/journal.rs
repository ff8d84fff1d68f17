//! Journal handlers, including the nested read models

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use uuid::Uuid;

use super::{ApiJson, ApiPath};
use crate::error::AppError;
use crate::models::auth::AuthContext;
use crate::models::journal::{CreateJournal, UpdateJournal};
use crate::policy::{self, Action};
use crate::server::AppState;
use crate::services::{
    catalog,
    projection::{self, JournalKey},
};

/// List journals
pub async fn list_journals(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let journals = state.store.list_journals().await?;
    Ok(Json(journals))
}

/// Create a journal
pub async fn create_journal(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiJson(payload): ApiJson<CreateJournal>,
) -> Result<impl IntoResponse, AppError> {
    policy::guard(state.enforce_policies(), auth.as_deref(), Action::ManageCatalog)?;

    let journal = catalog::create_journal(
        state.store.as_ref(),
        state.config.slug.on_journal_slug_collision,
        payload,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(journal)))
}

/// Get a journal by slug
pub async fn get_journal(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let journal = state.store.get_journal_by_slug(&slug).await?;
    Ok(Json(journal))
}

/// Partially update a journal
pub async fn update_journal(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiPath(slug): ApiPath<String>,
    ApiJson(payload): ApiJson<UpdateJournal>,
) -> Result<impl IntoResponse, AppError> {
    policy::guard(state.enforce_policies(), auth.as_deref(), Action::ManageCatalog)?;

    let journal = catalog::update_journal(
        state.store.as_ref(),
        state.config.slug.on_journal_slug_collision,
        &slug,
        payload,
    )
    .await?;
    Ok(Json(journal))
}

/// Delete a journal with everything under it
pub async fn delete_journal(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiPath(slug): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    policy::guard(state.enforce_policies(), auth.as_deref(), Action::ManageCatalog)?;

    let journal = state.store.get_journal_by_slug(&slug).await?;
    state.store.delete_journal(journal.id).await?;

    tracing::info!(journal_id = %journal.id, slug = %journal.slug, "Journal deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Every journal with volumes, issues and full article lists
pub async fn journals_detailed(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let trees = projection::all_journals_with_articles(state.store.as_ref()).await?;
    Ok(Json(trees))
}

/// One journal with volumes, issues and per-issue article counts
pub async fn journal_data(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let tree = projection::journal_with_counts(state.store.as_ref(), JournalKey::Slug(&slug)).await?;
    Ok(Json(tree))
}

/// Issue reached through its journal and volume, with its articles
pub async fn issue_in_journal(
    State(state): State<AppState>,
    ApiPath((slug, volume_id, issue_id)): ApiPath<(String, Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let chain = projection::issue_chain(state.store.as_ref(), &slug, volume_id, issue_id).await?;
    Ok(Json(chain))
}
