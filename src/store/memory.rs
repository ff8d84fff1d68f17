//! In-process store used for development and tests.
//!
//! All tables sit behind one `RwLock`, so every operation (cascading deletes
//! included) is applied atomically.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    duplicate, duplicate_number, ArticleStore, IssueStore, JournalStore, UserStore, VolumeStore,
};
use crate::error::{AppError, Result};
use crate::models::{
    article::{Article, ArticleFilter, NewArticle, UpdateArticle},
    issue::{CreateIssue, Issue, UpdateIssue},
    journal::{Journal, NewJournal, UpdateJournal},
    patch, patch_nullable, Entity,
    user::{NewUser, UpdateUser, User},
    volume::{CreateVolume, UpdateVolume, Volume},
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    journals: Vec<Journal>,
    volumes: Vec<Volume>,
    issues: Vec<Issue>,
    articles: Vec<Article>,
}

impl Tables {
    fn user_mut(&mut self, id: Uuid) -> Result<&mut User> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found("User", id))
    }

    fn journal_mut(&mut self, id: Uuid) -> Result<&mut Journal> {
        self.journals
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| AppError::not_found("Journal", id))
    }

    fn volume_mut(&mut self, id: Uuid) -> Result<&mut Volume> {
        self.volumes
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| AppError::not_found("Volume", id))
    }

    fn issue_mut(&mut self, id: Uuid) -> Result<&mut Issue> {
        self.issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::not_found("Issue", id))
    }

    fn article_mut(&mut self, id: Uuid) -> Result<&mut Article> {
        self.articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| AppError::not_found("Article", id))
    }

    fn check_journal_unique(
        &self,
        id: Option<Uuid>,
        name: Option<&str>,
        slug: Option<&str>,
        issn: Option<&str>,
    ) -> Result<()> {
        for other in self.journals.iter().filter(|j| Some(j.id) != id) {
            if name == Some(other.name.as_str()) {
                return Err(duplicate("journal", "name"));
            }
            if slug == Some(other.slug.as_str()) {
                return Err(duplicate("journal", "slug"));
            }
            if issn.is_some() && issn == other.issn.as_deref() {
                return Err(duplicate("journal", "issn"));
            }
        }
        Ok(())
    }

    fn check_volume(&self, id: Option<Uuid>, journal_id: Uuid, number: i32) -> Result<()> {
        if !self.journals.iter().any(|j| j.id == journal_id) {
            return Err(AppError::reference("journal_id"));
        }
        let taken = self
            .volumes
            .iter()
            .any(|v| Some(v.id) != id && v.journal_id == journal_id && v.number == number);
        if taken {
            return Err(duplicate_number("journal"));
        }
        Ok(())
    }

    fn check_issue(&self, id: Option<Uuid>, volume_id: Uuid, number: i32) -> Result<()> {
        if !self.volumes.iter().any(|v| v.id == volume_id) {
            return Err(AppError::reference("volume_id"));
        }
        let taken = self
            .issues
            .iter()
            .any(|i| Some(i.id) != id && i.volume_id == volume_id && i.number == number);
        if taken {
            return Err(duplicate_number("volume"));
        }
        Ok(())
    }

    fn check_article(
        &self,
        id: Option<Uuid>,
        slug: &str,
        issue_id: Option<Uuid>,
        publisher_id: Uuid,
    ) -> Result<()> {
        if let Some(issue_id) = issue_id {
            if !self.issues.iter().any(|i| i.id == issue_id) {
                return Err(AppError::reference("issue_id"));
            }
        }
        if !self.users.iter().any(|u| u.id == publisher_id) {
            return Err(AppError::reference("publisher_id"));
        }
        if self.slug_taken(slug, id) {
            return Err(duplicate("article", "slug"));
        }
        Ok(())
    }

    fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> bool {
        self.articles
            .iter()
            .any(|a| a.slug == slug && Some(a.id) != exclude)
    }

    fn remove_issues(&mut self, issue_ids: &HashSet<Uuid>) {
        self.articles
            .retain(|a| !a.issue_id.is_some_and(|i| issue_ids.contains(&i)));
        self.issues.retain(|i| !issue_ids.contains(&i.id));
    }

    fn remove_volumes(&mut self, volume_ids: &HashSet<Uuid>) {
        let issue_ids: HashSet<Uuid> = self
            .issues
            .iter()
            .filter(|i| volume_ids.contains(&i.volume_id))
            .map(|i| i.id)
            .collect();
        self.remove_issues(&issue_ids);
        self.volumes.retain(|v| !volume_ids.contains(&v.id));
    }
}

/// Newest first; among equal timestamps the later insert wins.
fn newest_first<'a, T>(rows: impl DoubleEndedIterator<Item = &'a T>) -> Vec<T>
where
    T: Entity + Clone + 'a,
{
    let mut out: Vec<T> = rows.rev().cloned().collect();
    out.sort_by_key(|row| std::cmp::Reverse(row.created_at()));
    out
}

/// In-memory implementation of every store trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, input: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;

        if let Some(email) = &input.email {
            if tables.users.iter().any(|u| u.email.as_ref() == Some(email)) {
                return Err(duplicate("user", "email"));
            }
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: input.name,
            bio: input.bio,
            institution: input.institution,
            email: input.email,
            email_verified: None,
            image: input.image,
            password_hash: input.password_hash,
            role: input.role,
            is_active: true,
            is_staff: input.is_staff,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("User", id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users = tables.users.clone();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, input: UpdateUser) -> Result<User> {
        let mut tables = self.tables.write().await;
        let user = tables.user_mut(id)?;

        patch_nullable(&mut user.name, &input.name);
        patch_nullable(&mut user.bio, &input.bio);
        patch_nullable(&mut user.institution, &input.institution);
        patch_nullable(&mut user.image, &input.image);
        patch_nullable(&mut user.email_verified, &input.email_verified);
        patch(&mut user.role, &input.role);
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn record_login(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.user_mut(id)?.last_login = Some(Utc::now());
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.user_mut(id)?;
        tables.articles.retain(|a| a.publisher_id != id);
        tables.users.retain(|u| u.id != id);
        Ok(())
    }
}

#[async_trait]
impl JournalStore for MemoryStore {
    async fn insert_journal(&self, input: NewJournal) -> Result<Journal> {
        let mut tables = self.tables.write().await;
        tables.check_journal_unique(
            None,
            Some(&input.name),
            Some(&input.slug),
            input.issn.as_deref(),
        )?;

        let now = Utc::now();
        let journal = Journal {
            id: Uuid::new_v4(),
            name: input.name,
            slug: input.slug,
            description: input.description,
            issn: input.issn,
            created_at: now,
            updated_at: now,
        };
        tables.journals.push(journal.clone());
        Ok(journal)
    }

    async fn get_journal(&self, id: Uuid) -> Result<Journal> {
        let tables = self.tables.read().await;
        tables
            .journals
            .iter()
            .find(|j| j.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Journal", id))
    }

    async fn get_journal_by_slug(&self, slug: &str) -> Result<Journal> {
        let tables = self.tables.read().await;
        tables
            .journals
            .iter()
            .find(|j| j.slug == slug)
            .cloned()
            .ok_or_else(|| AppError::not_found("Journal", slug))
    }

    async fn list_journals(&self) -> Result<Vec<Journal>> {
        let tables = self.tables.read().await;
        let mut journals = tables.journals.clone();
        journals.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(journals)
    }

    async fn journal_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .journals
            .iter()
            .any(|j| j.slug == slug && Some(j.id) != exclude))
    }

    async fn update_journal(&self, id: Uuid, input: UpdateJournal) -> Result<Journal> {
        let mut tables = self.tables.write().await;
        tables.journal_mut(id)?;

        let issn = match &input.issn {
            Some(value) => value.as_deref(),
            None => None,
        };
        tables.check_journal_unique(Some(id), input.name.as_deref(), input.slug.as_deref(), issn)?;

        let journal = tables.journal_mut(id)?;
        patch(&mut journal.name, &input.name);
        patch(&mut journal.slug, &input.slug);
        patch_nullable(&mut journal.description, &input.description);
        patch_nullable(&mut journal.issn, &input.issn);
        journal.updated_at = Utc::now();

        Ok(journal.clone())
    }

    async fn delete_journal(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.journal_mut(id)?;

        let volume_ids: HashSet<Uuid> = tables
            .volumes
            .iter()
            .filter(|v| v.journal_id == id)
            .map(|v| v.id)
            .collect();
        tables.remove_volumes(&volume_ids);
        tables.journals.retain(|j| j.id != id);
        Ok(())
    }
}

#[async_trait]
impl VolumeStore for MemoryStore {
    async fn insert_volume(&self, input: CreateVolume) -> Result<Volume> {
        let mut tables = self.tables.write().await;
        tables.check_volume(None, input.journal_id, input.number)?;

        let now = Utc::now();
        let volume = Volume {
            id: Uuid::new_v4(),
            number: input.number,
            year: input.year,
            journal_id: input.journal_id,
            created_at: now,
            updated_at: now,
        };
        tables.volumes.push(volume.clone());
        Ok(volume)
    }

    async fn get_volume(&self, id: Uuid) -> Result<Volume> {
        let tables = self.tables.read().await;
        tables
            .volumes
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Volume", id))
    }

    async fn list_volumes(&self) -> Result<Vec<Volume>> {
        let tables = self.tables.read().await;
        let mut volumes = tables.volumes.clone();
        volumes.sort_by_key(|v| v.number);
        Ok(volumes)
    }

    async fn volumes_for_journals(&self, journal_ids: &[Uuid]) -> Result<Vec<Volume>> {
        let tables = self.tables.read().await;
        let mut volumes: Vec<Volume> = tables
            .volumes
            .iter()
            .filter(|v| journal_ids.contains(&v.journal_id))
            .cloned()
            .collect();
        volumes.sort_by_key(|v| v.number);
        Ok(volumes)
    }

    async fn update_volume(&self, id: Uuid, input: UpdateVolume) -> Result<Volume> {
        let mut tables = self.tables.write().await;
        let current = tables.volume_mut(id)?.clone();

        let journal_id = input.journal_id.unwrap_or(current.journal_id);
        let number = input.number.unwrap_or(current.number);
        tables.check_volume(Some(id), journal_id, number)?;

        let volume = tables.volume_mut(id)?;
        volume.journal_id = journal_id;
        volume.number = number;
        patch(&mut volume.year, &input.year);
        volume.updated_at = Utc::now();

        Ok(volume.clone())
    }

    async fn delete_volume(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.volume_mut(id)?;
        tables.remove_volumes(&HashSet::from([id]));
        Ok(())
    }
}

#[async_trait]
impl IssueStore for MemoryStore {
    async fn insert_issue(&self, input: CreateIssue) -> Result<Issue> {
        let mut tables = self.tables.write().await;
        tables.check_issue(None, input.volume_id, input.number)?;

        let now = Utc::now();
        let issue = Issue {
            id: Uuid::new_v4(),
            number: input.number,
            title: input.title,
            month: input.month,
            volume_id: input.volume_id,
            created_at: now,
            updated_at: now,
        };
        tables.issues.push(issue.clone());
        Ok(issue)
    }

    async fn get_issue(&self, id: Uuid) -> Result<Issue> {
        let tables = self.tables.read().await;
        tables
            .issues
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Issue", id))
    }

    async fn list_issues(&self) -> Result<Vec<Issue>> {
        let tables = self.tables.read().await;
        let mut issues = tables.issues.clone();
        issues.sort_by_key(|i| i.number);
        Ok(issues)
    }

    async fn issues_for_volumes(&self, volume_ids: &[Uuid]) -> Result<Vec<Issue>> {
        let tables = self.tables.read().await;
        let mut issues: Vec<Issue> = tables
            .issues
            .iter()
            .filter(|i| volume_ids.contains(&i.volume_id))
            .cloned()
            .collect();
        issues.sort_by_key(|i| i.number);
        Ok(issues)
    }

    async fn update_issue(&self, id: Uuid, input: UpdateIssue) -> Result<Issue> {
        let mut tables = self.tables.write().await;
        let current = tables.issue_mut(id)?.clone();

        let volume_id = input.volume_id.unwrap_or(current.volume_id);
        let number = input.number.unwrap_or(current.number);
        tables.check_issue(Some(id), volume_id, number)?;

        let issue = tables.issue_mut(id)?;
        issue.volume_id = volume_id;
        issue.number = number;
        patch_nullable(&mut issue.title, &input.title);
        patch_nullable(&mut issue.month, &input.month);
        issue.updated_at = Utc::now();

        Ok(issue.clone())
    }

    async fn delete_issue(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.issue_mut(id)?;
        tables.remove_issues(&HashSet::from([id]));
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert_article(&self, input: NewArticle) -> Result<Article> {
        let mut tables = self.tables.write().await;
        tables.check_article(None, &input.slug, input.issue_id, input.publisher_id)?;

        let now = Utc::now();
        let article = Article {
            id: Uuid::new_v4(),
            title: input.title,
            slug: input.slug,
            authors: input.authors,
            abstract_text: input.abstract_text,
            file: input.file,
            status: input.status,
            payment_proof: input.payment_proof,
            payment_verified: input.payment_verified,
            issue_id: input.issue_id,
            publisher_id: input.publisher_id,
            created_at: now,
            updated_at: now,
        };
        tables.articles.push(article.clone());
        Ok(article)
    }

    async fn get_article(&self, id: Uuid) -> Result<Article> {
        let tables = self.tables.read().await;
        tables
            .articles
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Article", id))
    }

    async fn get_article_by_slug(&self, slug: &str) -> Result<Article> {
        let tables = self.tables.read().await;
        tables
            .articles
            .iter()
            .find(|a| a.slug == slug)
            .cloned()
            .ok_or_else(|| AppError::not_found("Article", slug))
    }

    async fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.articles.iter().filter(|a| filter.matches(a)),
        ))
    }

    async fn article_slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.slug_taken(slug, exclude))
    }

    async fn articles_for_issues(&self, issue_ids: &[Uuid]) -> Result<Vec<Article>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.articles.iter().filter(|a| {
            a.issue_id.is_some_and(|i| issue_ids.contains(&i))
        })))
    }

    async fn count_articles_for_issues(&self, issue_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for issue_id in tables.articles.iter().filter_map(|a| a.issue_id) {
            if issue_ids.contains(&issue_id) {
                *counts.entry(issue_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn update_article(&self, id: Uuid, input: UpdateArticle) -> Result<Article> {
        let mut tables = self.tables.write().await;
        let current = tables.article_mut(id)?.clone();

        let slug = input.slug.clone().unwrap_or(current.slug);
        let issue_id = match input.issue_id {
            Some(value) => value,
            None => current.issue_id,
        };
        let publisher_id = input.publisher_id.unwrap_or(current.publisher_id);
        tables.check_article(Some(id), &slug, issue_id, publisher_id)?;

        let article = tables.article_mut(id)?;
        article.slug = slug;
        article.issue_id = issue_id;
        article.publisher_id = publisher_id;
        patch(&mut article.title, &input.title);
        patch(&mut article.authors, &input.authors);
        patch_nullable(&mut article.abstract_text, &input.abstract_text);
        patch_nullable(&mut article.file, &input.file);
        patch(&mut article.status, &input.status);
        patch_nullable(&mut article.payment_proof, &input.payment_proof);
        patch(&mut article.payment_verified, &input.payment_verified);
        article.updated_at = Utc::now();

        Ok(article.clone())
    }

    async fn delete_article(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.article_mut(id)?;
        tables.articles.retain(|a| a.id != id);
        Ok(())
    }
}
