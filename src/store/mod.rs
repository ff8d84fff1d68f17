//! Store traits for data access.
//!
//! Each entity has its own trait; [`Store`] bundles them so handlers and
//! services can hold a single `Arc<dyn Store>`. Writes report broken
//! invariants as [`AppError::UniquenessViolation`] or
//! [`AppError::ReferenceNotFound`] naming the offending field, and deletes
//! cascade atomically.
//!
//! [`AppError::UniquenessViolation`]: crate::error::AppError::UniquenessViolation
//! [`AppError::ReferenceNotFound`]: crate::error::AppError::ReferenceNotFound

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    article::{Article, ArticleFilter, NewArticle, UpdateArticle},
    issue::{CreateIssue, Issue, UpdateIssue},
    journal::{Journal, NewJournal, UpdateJournal},
    user::{NewUser, UpdateUser, User},
    volume::{CreateVolume, UpdateVolume, Volume},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, input: NewUser) -> Result<User>;
    async fn get_user(&self, id: Uuid) -> Result<User>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn update_user(&self, id: Uuid, input: UpdateUser) -> Result<User>;
    async fn record_login(&self, id: Uuid) -> Result<()>;
    /// Removes the user and every article they published.
    async fn delete_user(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn insert_journal(&self, input: NewJournal) -> Result<Journal>;
    async fn get_journal(&self, id: Uuid) -> Result<Journal>;
    async fn get_journal_by_slug(&self, slug: &str) -> Result<Journal>;
    async fn list_journals(&self) -> Result<Vec<Journal>>;
    async fn journal_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool>;
    /// `input.slug`, when present, is stored verbatim.
    async fn update_journal(&self, id: Uuid, input: UpdateJournal) -> Result<Journal>;
    /// Removes the journal with its volumes, issues and their articles.
    async fn delete_journal(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait VolumeStore: Send + Sync {
    async fn insert_volume(&self, input: CreateVolume) -> Result<Volume>;
    async fn get_volume(&self, id: Uuid) -> Result<Volume>;
    async fn list_volumes(&self) -> Result<Vec<Volume>>;
    /// Volumes of the given journals, ordered by number.
    async fn volumes_for_journals(&self, journal_ids: &[Uuid]) -> Result<Vec<Volume>>;
    async fn update_volume(&self, id: Uuid, input: UpdateVolume) -> Result<Volume>;
    async fn delete_volume(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn insert_issue(&self, input: CreateIssue) -> Result<Issue>;
    async fn get_issue(&self, id: Uuid) -> Result<Issue>;
    async fn list_issues(&self) -> Result<Vec<Issue>>;
    /// Issues of the given volumes, ordered by number.
    async fn issues_for_volumes(&self, volume_ids: &[Uuid]) -> Result<Vec<Issue>>;
    async fn update_issue(&self, id: Uuid, input: UpdateIssue) -> Result<Issue>;
    async fn delete_issue(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn insert_article(&self, input: NewArticle) -> Result<Article>;
    async fn get_article(&self, id: Uuid) -> Result<Article>;
    async fn get_article_by_slug(&self, slug: &str) -> Result<Article>;
    /// Newest first.
    async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>>;
    async fn article_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool>;
    /// Articles assigned to the given issues, newest first.
    async fn articles_for_issues(&self, issue_ids: &[Uuid]) -> Result<Vec<Article>>;
    /// Article count per issue; issues without articles may be absent.
    async fn count_articles_for_issues(&self, issue_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>>;
    /// `input.slug`, when present, is stored verbatim.
    async fn update_article(&self, id: Uuid, input: UpdateArticle) -> Result<Article>;
    async fn delete_article(&self, id: Uuid) -> Result<()>;
}

/// Every entity store behind one object
pub trait Store: UserStore + JournalStore + VolumeStore + IssueStore + ArticleStore {}

impl<T> Store for T where T: UserStore + JournalStore + VolumeStore + IssueStore + ArticleStore {}

/// Single-column uniqueness failure, worded like the public API reports it.
pub(crate) fn duplicate(entity: &str, field: &str) -> AppError {
    AppError::unique(field, format!("{} with this {} already exists.", entity, field))
}

/// `(parent, number)` uniqueness failure for volumes and issues.
pub(crate) fn duplicate_number(parent: &str) -> AppError {
    AppError::unique(
        "number",
        format!("The fields {}, number must make a unique set.", parent),
    )
}
