//! Article handlers, including manuscript and payment proof uploads

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use tracing::info;
use uuid::Uuid;

use super::{ApiJson, ApiPath, ApiQuery};
use crate::error::AppError;
use crate::models::article::{ArticleFilter, CreateArticle, UpdateArticle};
use crate::models::auth::AuthContext;
use crate::models::blob::BlobKind;
use crate::policy::{self, Action};
use crate::server::AppState;
use crate::services::catalog;

/// List articles, newest first, optionally filtered
pub async fn list_articles(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ArticleFilter>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store.list_articles(&filter).await?))
}

/// Create an article, deriving its slug from the title when none is given
pub async fn create_article(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiJson(payload): ApiJson<CreateArticle>,
) -> Result<impl IntoResponse, AppError> {
    let enforce = state.enforce_policies();
    let auth = auth.as_deref();
    policy::guard(enforce, auth, Action::SubmitArticle)?;
    if payload.status.is_some_and(|s| !s.is_author_controlled()) {
        policy::guard(enforce, auth, Action::ReviewArticle)?;
    }
    if payload.payment_verified == Some(true) {
        policy::guard(enforce, auth, Action::VerifyPayment)?;
    }

    let article = catalog::create_article(state.store.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn get_article(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store.get_article_by_slug(&slug).await?))
}

/// Partially update an article
pub async fn update_article(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiPath(slug): ApiPath<String>,
    ApiJson(payload): ApiJson<UpdateArticle>,
) -> Result<impl IntoResponse, AppError> {
    for action in policy::article_update_actions(&payload) {
        policy::guard(state.enforce_policies(), auth.as_deref(), action)?;
    }

    let article = catalog::update_article(state.store.as_ref(), &slug, payload).await?;
    Ok(Json(article))
}

pub async fn delete_article(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiPath(slug): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    policy::guard(state.enforce_policies(), auth.as_deref(), Action::SubmitArticle)?;

    let article = state.store.get_article_by_slug(&slug).await?;
    state.store.delete_article(article.id).await?;

    info!(article_id = %article.id, slug = %article.slug, "Article deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Articles assigned to one issue
pub async fn articles_by_issue(
    State(state): State<AppState>,
    ApiPath(issue_id): ApiPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let issue = state.store.get_issue(issue_id).await?;
    let articles = state.store.articles_for_issues(&[issue.id]).await?;
    Ok(Json(articles))
}

/// Store uploaded `file` and/or `payment_proof` parts and attach them
pub async fn upload_files(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    ApiPath(slug): ApiPath<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    policy::guard(state.enforce_policies(), auth.as_deref(), Action::SubmitArticle)?;

    let article = state.store.get_article_by_slug(&slug).await?;
    let mut update = UpdateArticle::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let kind = BlobKind::from_field(&name)
            .ok_or_else(|| AppError::BadRequest(format!("Unexpected upload field '{}'", name)))?;
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await?;

        if bytes.is_empty() {
            return Err(AppError::invalid_field(
                match kind {
                    BlobKind::Manuscript => "file",
                    BlobKind::PaymentProof => "payment_proof",
                },
                "empty",
                "The submitted file is empty.",
            ));
        }

        let blob = state.blobs.put(kind, &file_name, &bytes).await?;
        match kind {
            BlobKind::Manuscript => update.file = Some(Some(blob)),
            BlobKind::PaymentProof => update.payment_proof = Some(Some(blob)),
        }
    }

    if update.file.is_none() && update.payment_proof.is_none() {
        return Err(AppError::BadRequest("No file was submitted".to_string()));
    }

    let article = state.store.update_article(article.id, update).await?;
    info!(article_id = %article.id, "Article files uploaded");
    Ok(Json(article))
}
