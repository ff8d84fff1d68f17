//! Journal and article writes that need slug assignment.

use tracing::{debug, info};
use validator::Validate;

use super::slug::{assign_slug, is_slug_conflict, AssignedSlug};
use crate::config::CollisionPolicy;
use crate::error::Result;
use crate::models::{
    article::{Article, CreateArticle, NewArticle, UpdateArticle},
    journal::{CreateJournal, Journal, NewJournal, UpdateJournal},
};
use crate::store::Store;

/// Inserts retried when a generated article slug loses a race.
const SLUG_INSERT_ATTEMPTS: usize = 3;

pub async fn create_journal(
    store: &dyn Store,
    policy: CollisionPolicy,
    input: CreateJournal,
) -> Result<Journal> {
    input.validate()?;

    let AssignedSlug { value: slug, .. } =
        assign_slug("name", &input.name, input.slug.as_deref(), policy, |s| async move {
            store.journal_slug_taken(&s, None).await
        })
        .await?;

    let journal = store
        .insert_journal(NewJournal {
            name: input.name,
            slug,
            description: input.description,
            issn: input.issn,
        })
        .await?;

    info!(journal_id = %journal.id, slug = %journal.slug, "Journal created");
    Ok(journal)
}

/// Partial update addressed by the journal's current slug.
///
/// A new name without an explicit slug re-derives the slug.
pub async fn update_journal(
    store: &dyn Store,
    policy: CollisionPolicy,
    slug: &str,
    mut input: UpdateJournal,
) -> Result<Journal> {
    input.validate_all()?;
    let current = store.get_journal_by_slug(slug).await?;

    let renamed = input.name.as_ref().filter(|n| **n != current.name);
    if let (Some(name), None) = (renamed, input.slug.as_ref()) {
        let id = current.id;
        let assigned = assign_slug("name", name, None, policy, |s| async move {
            store.journal_slug_taken(&s, Some(id)).await
        })
        .await?;
        input.slug = Some(assigned.value);
    }

    let journal = store.update_journal(current.id, input).await?;
    info!(journal_id = %journal.id, slug = %journal.slug, "Journal updated");
    Ok(journal)
}

pub async fn create_article(store: &dyn Store, input: CreateArticle) -> Result<Article> {
    input.validate()?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        let assigned = assign_slug(
            "title",
            &input.title,
            input.slug.as_deref(),
            CollisionPolicy::Suffix,
            |s| async move { store.article_slug_taken(&s, None).await },
        )
        .await?;

        let record = NewArticle {
            title: input.title.clone(),
            slug: assigned.value,
            authors: input.authors.clone(),
            abstract_text: input.abstract_text.clone(),
            file: input.file.clone(),
            status: input.status.unwrap_or_default(),
            payment_proof: input.payment_proof.clone(),
            payment_verified: input.payment_verified.unwrap_or(false),
            issue_id: input.issue_id,
            publisher_id: input.publisher_id,
        };

        match store.insert_article(record).await {
            Ok(article) => {
                info!(article_id = %article.id, slug = %article.slug, "Article created");
                return Ok(article);
            }
            Err(err)
                if assigned.generated && is_slug_conflict(&err) && attempt < SLUG_INSERT_ATTEMPTS =>
            {
                debug!(attempt, "Generated article slug taken concurrently; retrying");
            }
            Err(err) => return Err(err),
        }
    }
}

/// Partial update addressed by the article's current slug.
///
/// A new title without an explicit slug re-derives the slug.
pub async fn update_article(
    store: &dyn Store,
    slug: &str,
    input: UpdateArticle,
) -> Result<Article> {
    input.validate()?;
    let current = store.get_article_by_slug(slug).await?;

    let renamed = input.title.clone().filter(|t| *t != current.title);
    let Some(title) = renamed.filter(|_| input.slug.is_none()) else {
        let article = store.update_article(current.id, input).await?;
        info!(article_id = %article.id, "Article updated");
        return Ok(article);
    };

    let id = current.id;
    let mut attempt = 0;
    loop {
        attempt += 1;
        let assigned = assign_slug("title", &title, None, CollisionPolicy::Suffix, |s| async move {
            store.article_slug_taken(&s, Some(id)).await
        })
        .await?;

        let patch = UpdateArticle {
            slug: Some(assigned.value),
            ..input.clone()
        };
        match store.update_article(id, patch).await {
            Ok(article) => {
                info!(article_id = %article.id, slug = %article.slug, "Article updated");
                return Ok(article);
            }
            Err(err) if is_slug_conflict(&err) && attempt < SLUG_INSERT_ATTEMPTS => {
                debug!(attempt, "Re-derived article slug taken concurrently; retrying");
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{user::NewUser, ArticleStatus, Role};
    use crate::store::{MemoryStore, UserStore};
    use uuid::Uuid;

    async fn publisher(store: &MemoryStore) -> Uuid {
        store
            .insert_user(NewUser {
                name: None,
                bio: None,
                institution: None,
                email: Some("p@example.com".to_string()),
                image: None,
                password_hash: "!".to_string(),
                role: Role::Publisher,
                is_staff: false,
            })
            .await
            .unwrap()
            .id
    }

    fn journal(name: &str) -> CreateJournal {
        CreateJournal {
            name: name.to_string(),
            ..CreateJournal::default()
        }
    }

    fn article(title: &str, publisher_id: Uuid) -> CreateArticle {
        CreateArticle {
            title: title.to_string(),
            slug: None,
            authors: "A. Author".to_string(),
            abstract_text: Some("Findings.".to_string()),
            file: None,
            status: None,
            payment_proof: None,
            payment_verified: None,
            issue_id: None,
            publisher_id,
        }
    }

    #[tokio::test]
    async fn journal_slug_derived_from_name() {
        let store = MemoryStore::new();
        let created = create_journal(&store, CollisionPolicy::Reject, journal("Nature"))
            .await
            .unwrap();
        assert_eq!(created.slug, "nature");
    }

    #[tokio::test]
    async fn duplicate_journal_name_rejected_on_name() {
        let store = MemoryStore::new();
        create_journal(&store, CollisionPolicy::Reject, journal("Nature"))
            .await
            .unwrap();

        let err = create_journal(&store, CollisionPolicy::Reject, journal("Nature"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UniquenessViolation { ref field, .. } if field == "name"));
    }

    #[tokio::test]
    async fn journal_slug_collision_follows_policy() {
        let store = MemoryStore::new();
        create_journal(&store, CollisionPolicy::Reject, journal("Nature"))
            .await
            .unwrap();

        let err = create_journal(&store, CollisionPolicy::Reject, journal("Nature!"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UniquenessViolation { ref field, .. } if field == "slug"));

        let suffixed = create_journal(&store, CollisionPolicy::Suffix, journal("Nature!"))
            .await
            .unwrap();
        assert_eq!(suffixed.slug, "nature-1");
    }

    #[tokio::test]
    async fn journal_rename_rederives_slug() {
        let store = MemoryStore::new();
        create_journal(&store, CollisionPolicy::Reject, journal("Nature"))
            .await
            .unwrap();

        let renamed = update_journal(
            &store,
            CollisionPolicy::Reject,
            "nature",
            UpdateJournal {
                name: Some("Nature Physics".to_string()),
                ..UpdateJournal::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.slug, "nature-physics");

        let described = update_journal(
            &store,
            CollisionPolicy::Reject,
            "nature-physics",
            UpdateJournal {
                description: Some(Some("Monthly".to_string())),
                ..UpdateJournal::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(described.slug, "nature-physics");
        assert_eq!(described.name, "Nature Physics");
    }

    #[tokio::test]
    async fn same_title_gets_suffixed_slug() {
        let store = MemoryStore::new();
        let publisher_id = publisher(&store).await;

        let first = create_article(&store, article("Study A", publisher_id))
            .await
            .unwrap();
        let second = create_article(&store, article("Study A", publisher_id))
            .await
            .unwrap();

        assert_eq!(first.slug, "study-a");
        assert_eq!(second.slug, "study-a-1");
    }

    #[tokio::test]
    async fn explicit_article_slug_conflict_is_not_retried() {
        let store = MemoryStore::new();
        let publisher_id = publisher(&store).await;
        create_article(&store, article("Study A", publisher_id))
            .await
            .unwrap();

        let mut input = article("Other", publisher_id);
        input.slug = Some("study-a".to_string());
        let err = create_article(&store, input).await.unwrap_err();
        assert!(matches!(err, AppError::UniquenessViolation { ref field, .. } if field == "slug"));
    }

    #[tokio::test]
    async fn status_update_keeps_other_fields() {
        let store = MemoryStore::new();
        let publisher_id = publisher(&store).await;
        create_article(&store, article("Study A", publisher_id))
            .await
            .unwrap();

        let updated = update_article(
            &store,
            "study-a",
            UpdateArticle {
                status: Some(ArticleStatus::Submitted),
                ..UpdateArticle::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.status, ArticleStatus::Submitted);
        assert_eq!(updated.title, "Study A");
        assert_eq!(updated.slug, "study-a");
        assert_eq!(updated.authors, "A. Author");
        assert_eq!(updated.abstract_text.as_deref(), Some("Findings."));
    }

    #[tokio::test]
    async fn retitle_excludes_own_slug() {
        let store = MemoryStore::new();
        let publisher_id = publisher(&store).await;
        create_article(&store, article("Study A", publisher_id))
            .await
            .unwrap();

        // Only punctuation changes, so the derived slug is the article's own
        let updated = update_article(
            &store,
            "study-a",
            UpdateArticle {
                title: Some("Study A!".to_string()),
                ..UpdateArticle::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.slug, "study-a");
    }

    #[tokio::test]
    async fn missing_publisher_is_reference_error() {
        let store = MemoryStore::new();
        let err = create_article(&store, article("Orphan", Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ReferenceNotFound { ref field } if field == "publisher_id"));
    }
}
