//! PostgreSQL store backed by an sqlx pool.
//!
//! Constraint names from `migrations/001_initial_schema.sql` are mapped back
//! to the field they guard, so callers see the same errors as with
//! [`MemoryStore`](super::MemoryStore). Cascades are declared in the schema
//! (`ON DELETE CASCADE`), making each delete a single atomic statement.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    duplicate, duplicate_number, ArticleStore, IssueStore, JournalStore, UserStore, VolumeStore,
};
use crate::error::{AppError, Result};
use crate::models::{
    article::{Article, ArticleFilter, NewArticle, UpdateArticle},
    issue::{CreateIssue, Issue, UpdateIssue},
    journal::{Journal, NewJournal, UpdateJournal},
    user::{NewUser, UpdateUser, User},
    volume::{CreateVolume, UpdateVolume, Volume},
};

const USER_COLUMNS: &str = "id, name, bio, institution, email, email_verified, image, \
     password_hash, role, is_active, is_staff, last_login, created_at, updated_at";
const JOURNAL_COLUMNS: &str = "id, name, slug, description, issn, created_at, updated_at";
const VOLUME_COLUMNS: &str = "id, number, year, journal_id, created_at, updated_at";
const ISSUE_COLUMNS: &str = "id, number, title, month, volume_id, created_at, updated_at";
const ARTICLE_COLUMNS: &str = "id, title, slug, authors, abstract, file, status, payment_proof, \
     payment_verified, issue_id, publisher_id, created_at, updated_at";

/// Translate constraint failures into field-level errors.
fn map_db_error(err: sqlx::Error) -> AppError {
    let constraint = match &err {
        sqlx::Error::Database(db) => db.constraint().map(str::to_owned),
        _ => None,
    };

    match constraint.as_deref() {
        Some("users_email_key") => duplicate("user", "email"),
        Some("journals_name_key") => duplicate("journal", "name"),
        Some("journals_slug_key") => duplicate("journal", "slug"),
        Some("journals_issn_key") => duplicate("journal", "issn"),
        Some("articles_slug_key") => duplicate("article", "slug"),
        Some("volumes_journal_id_number_key") => duplicate_number("journal"),
        Some("issues_volume_id_number_key") => duplicate_number("volume"),
        Some("volumes_journal_id_fkey") => AppError::reference("journal_id"),
        Some("issues_volume_id_fkey") => AppError::reference("volume_id"),
        Some("articles_issue_id_fkey") => AppError::reference("issue_id"),
        Some("articles_publisher_id_fkey") => AppError::reference("publisher_id"),
        _ => AppError::Database(err),
    }
}

/// Split a nullable patch into a "was supplied" flag and the new value.
fn nullable_bind<T: Clone>(value: &Option<Option<T>>) -> (bool, Option<T>) {
    (value.is_some(), value.clone().flatten())
}

/// PostgreSQL implementation of every store trait
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn delete_row(&self, table: &str, entity: &str, id: Uuid) -> Result<()> {
        let query = format!("DELETE FROM {} WHERE id = $1", table);
        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(entity, id));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, input: NewUser) -> Result<User> {
        let query = format!(
            r#"
            INSERT INTO users (id, name, bio, institution, email, image, password_hash, role, is_staff)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(&input.name)
            .bind(&input.bio)
            .bind(&input.institution)
            .bind(&input.email)
            .bind(&input.image)
            .bind(&input.password_hash)
            .bind(input.role)
            .bind(input.is_staff)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_user(&self, id: Uuid) -> Result<User> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {} FROM users ORDER BY email", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_user(&self, id: Uuid, input: UpdateUser) -> Result<User> {
        let (set_name, name) = nullable_bind(&input.name);
        let (set_bio, bio) = nullable_bind(&input.bio);
        let (set_institution, institution) = nullable_bind(&input.institution);
        let (set_image, image) = nullable_bind(&input.image);
        let (set_verified, verified) = nullable_bind(&input.email_verified);

        let query = format!(
            r#"
            UPDATE users SET
                name = CASE WHEN $2 THEN $3 ELSE name END,
                bio = CASE WHEN $4 THEN $5 ELSE bio END,
                institution = CASE WHEN $6 THEN $7 ELSE institution END,
                image = CASE WHEN $8 THEN $9 ELSE image END,
                email_verified = CASE WHEN $10 THEN $11 ELSE email_verified END,
                role = COALESCE($12, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(set_name)
            .bind(name)
            .bind(set_bio)
            .bind(bio)
            .bind(set_institution)
            .bind(institution)
            .bind(set_image)
            .bind(image)
            .bind(set_verified)
            .bind(verified)
            .bind(input.role)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    async fn record_login(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        self.delete_row("users", "User", id).await
    }
}

#[async_trait]
impl JournalStore for PgStore {
    async fn insert_journal(&self, input: NewJournal) -> Result<Journal> {
        let query = format!(
            r#"
            INSERT INTO journals (id, name, slug, description, issn)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            JOURNAL_COLUMNS
        );

        sqlx::query_as::<_, Journal>(&query)
            .bind(Uuid::new_v4())
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.description)
            .bind(&input.issn)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_journal(&self, id: Uuid) -> Result<Journal> {
        let query = format!("SELECT {} FROM journals WHERE id = $1", JOURNAL_COLUMNS);
        sqlx::query_as::<_, Journal>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Journal", id))
    }

    async fn get_journal_by_slug(&self, slug: &str) -> Result<Journal> {
        let query = format!("SELECT {} FROM journals WHERE slug = $1", JOURNAL_COLUMNS);
        sqlx::query_as::<_, Journal>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Journal", slug))
    }

    async fn list_journals(&self) -> Result<Vec<Journal>> {
        let query = format!("SELECT {} FROM journals ORDER BY name", JOURNAL_COLUMNS);
        Ok(sqlx::query_as::<_, Journal>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn journal_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM journals WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn update_journal(&self, id: Uuid, input: UpdateJournal) -> Result<Journal> {
        let (set_description, description) = nullable_bind(&input.description);
        let (set_issn, issn) = nullable_bind(&input.issn);

        let query = format!(
            r#"
            UPDATE journals SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = CASE WHEN $4 THEN $5 ELSE description END,
                issn = CASE WHEN $6 THEN $7 ELSE issn END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            JOURNAL_COLUMNS
        );

        sqlx::query_as::<_, Journal>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(set_description)
            .bind(description)
            .bind(set_issn)
            .bind(issn)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::not_found("Journal", id))
    }

    async fn delete_journal(&self, id: Uuid) -> Result<()> {
        self.delete_row("journals", "Journal", id).await
    }
}

#[async_trait]
impl VolumeStore for PgStore {
    async fn insert_volume(&self, input: CreateVolume) -> Result<Volume> {
        let query = format!(
            r#"
            INSERT INTO volumes (id, number, year, journal_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            VOLUME_COLUMNS
        );

        sqlx::query_as::<_, Volume>(&query)
            .bind(Uuid::new_v4())
            .bind(input.number)
            .bind(input.year)
            .bind(input.journal_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_volume(&self, id: Uuid) -> Result<Volume> {
        let query = format!("SELECT {} FROM volumes WHERE id = $1", VOLUME_COLUMNS);
        sqlx::query_as::<_, Volume>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Volume", id))
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        let query = format!("SELECT {} FROM volumes ORDER BY number, created_at", VOLUME_COLUMNS);
        Ok(sqlx::query_as::<_, Volume>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn volumes_for_journals(&self, journal_ids: &[Uuid]) -> Result<Vec<Volume>> {
        let query = format!(
            "SELECT {} FROM volumes WHERE journal_id = ANY($1) ORDER BY number",
            VOLUME_COLUMNS
        );
        Ok(sqlx::query_as::<_, Volume>(&query)
            .bind(journal_ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_volume(&self, id: Uuid, input: UpdateVolume) -> Result<Volume> {
        let query = format!(
            r#"
            UPDATE volumes SET
                number = COALESCE($2, number),
                year = COALESCE($3, year),
                journal_id = COALESCE($4, journal_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            VOLUME_COLUMNS
        );

        sqlx::query_as::<_, Volume>(&query)
            .bind(id)
            .bind(input.number)
            .bind(input.year)
            .bind(input.journal_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::not_found("Volume", id))
    }

    async fn delete_volume(&self, id: Uuid) -> Result<()> {
        self.delete_row("volumes", "Volume", id).await
    }
}

#[async_trait]
impl IssueStore for PgStore {
    async fn insert_issue(&self, input: CreateIssue) -> Result<Issue> {
        let query = format!(
            r#"
            INSERT INTO issues (id, number, title, month, volume_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            ISSUE_COLUMNS
        );

        sqlx::query_as::<_, Issue>(&query)
            .bind(Uuid::new_v4())
            .bind(input.number)
            .bind(&input.title)
            .bind(input.month)
            .bind(input.volume_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_issue(&self, id: Uuid) -> Result<Issue> {
        let query = format!("SELECT {} FROM issues WHERE id = $1", ISSUE_COLUMNS);
        sqlx::query_as::<_, Issue>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Issue", id))
    }

    async fn list_issues(&self) -> Result<Vec<Issue>> {
        let query = format!("SELECT {} FROM issues ORDER BY number, created_at", ISSUE_COLUMNS);
        Ok(sqlx::query_as::<_, Issue>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn issues_for_volumes(&self, volume_ids: &[Uuid]) -> Result<Vec<Issue>> {
        let query = format!(
            "SELECT {} FROM issues WHERE volume_id = ANY($1) ORDER BY number",
            ISSUE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Issue>(&query)
            .bind(volume_ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_issue(&self, id: Uuid, input: UpdateIssue) -> Result<Issue> {
        let (set_title, title) = nullable_bind(&input.title);
        let (set_month, month) = nullable_bind(&input.month);

        let query = format!(
            r#"
            UPDATE issues SET
                number = COALESCE($2, number),
                title = CASE WHEN $3 THEN $4 ELSE title END,
                month = CASE WHEN $5 THEN $6 ELSE month END,
                volume_id = COALESCE($7, volume_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ISSUE_COLUMNS
        );

        sqlx::query_as::<_, Issue>(&query)
            .bind(id)
            .bind(input.number)
            .bind(set_title)
            .bind(title)
            .bind(set_month)
            .bind(month)
            .bind(input.volume_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::not_found("Issue", id))
    }

    async fn delete_issue(&self, id: Uuid) -> Result<()> {
        self.delete_row("issues", "Issue", id).await
    }
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn insert_article(&self, input: NewArticle) -> Result<Article> {
        let query = format!(
            r#"
            INSERT INTO articles (id, title, slug, authors, abstract, file, status,
                                  payment_proof, payment_verified, issue_id, publisher_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            ARTICLE_COLUMNS
        );

        sqlx::query_as::<_, Article>(&query)
            .bind(Uuid::new_v4())
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.authors)
            .bind(&input.abstract_text)
            .bind(&input.file)
            .bind(input.status)
            .bind(&input.payment_proof)
            .bind(input.payment_verified)
            .bind(input.issue_id)
            .bind(input.publisher_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn get_article(&self, id: Uuid) -> Result<Article> {
        let query = format!("SELECT {} FROM articles WHERE id = $1", ARTICLE_COLUMNS);
        sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Article", id))
    }

    async fn get_article_by_slug(&self, slug: &str) -> Result<Article> {
        let query = format!("SELECT {} FROM articles WHERE slug = $1", ARTICLE_COLUMNS);
        sqlx::query_as::<_, Article>(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Article", slug))
    }

    async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        let query = format!(
            r#"
            SELECT {} FROM articles
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR issue_id = $2)
              AND ($3::uuid IS NULL OR publisher_id = $3)
            ORDER BY created_at DESC
            "#,
            ARTICLE_COLUMNS
        );

        Ok(sqlx::query_as::<_, Article>(&query)
            .bind(filter.status)
            .bind(filter.issue)
            .bind(filter.publisher)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn article_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM articles WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn articles_for_issues(&self, issue_ids: &[Uuid]) -> Result<Vec<Article>> {
        let query = format!(
            "SELECT {} FROM articles WHERE issue_id = ANY($1) ORDER BY created_at DESC",
            ARTICLE_COLUMNS
        );
        Ok(sqlx::query_as::<_, Article>(&query)
            .bind(issue_ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_articles_for_issues(&self, issue_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT issue_id, COUNT(*) FROM articles
            WHERE issue_id = ANY($1)
            GROUP BY issue_id
            "#,
        )
        .bind(issue_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn update_article(&self, id: Uuid, input: UpdateArticle) -> Result<Article> {
        let (set_abstract, abstract_text) = nullable_bind(&input.abstract_text);
        let (set_file, file) = nullable_bind(&input.file);
        let (set_proof, payment_proof) = nullable_bind(&input.payment_proof);
        let (set_issue, issue_id) = nullable_bind(&input.issue_id);

        let query = format!(
            r#"
            UPDATE articles SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                authors = COALESCE($4, authors),
                abstract = CASE WHEN $5 THEN $6 ELSE abstract END,
                file = CASE WHEN $7 THEN $8 ELSE file END,
                status = COALESCE($9, status),
                payment_proof = CASE WHEN $10 THEN $11 ELSE payment_proof END,
                payment_verified = COALESCE($12, payment_verified),
                issue_id = CASE WHEN $13 THEN $14 ELSE issue_id END,
                publisher_id = COALESCE($15, publisher_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ARTICLE_COLUMNS
        );

        sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.slug)
            .bind(&input.authors)
            .bind(set_abstract)
            .bind(abstract_text)
            .bind(set_file)
            .bind(file)
            .bind(input.status)
            .bind(set_proof)
            .bind(payment_proof)
            .bind(input.payment_verified)
            .bind(set_issue)
            .bind(issue_id)
            .bind(input.publisher_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?
            .ok_or_else(|| AppError::not_found("Article", id))
    }

    async fn delete_article(&self, id: Uuid) -> Result<()> {
        self.delete_row("articles", "Article", id).await
    }
}
