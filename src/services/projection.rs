//! Nested Journal → Volume → Issue → Article read models.
//!
//! Trees are assembled from four batched store reads (journals, volumes,
//! issues, then articles or counts), independent of how large the tree is.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{article::Article, issue::Issue, journal::Journal, volume::Volume};
use crate::store::Store;

/// How a journal is addressed
#[derive(Debug, Clone, Copy)]
pub enum JournalKey<'a> {
    Id(Uuid),
    Slug(&'a str),
}

/// Issue leaf carrying only the number of assigned articles
#[derive(Debug, Clone, Serialize)]
pub struct IssueWithCount {
    pub id: Uuid,
    pub number: i32,
    pub title: Option<String>,
    pub month: Option<i32>,
    pub article_count: i64,
}

/// Issue leaf carrying its articles, newest first
#[derive(Debug, Clone, Serialize)]
pub struct IssueWithArticles {
    pub id: Uuid,
    pub number: i32,
    pub title: Option<String>,
    pub month: Option<i32>,
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeNode<I> {
    pub id: Uuid,
    pub number: i32,
    pub year: i32,
    pub issues: Vec<I>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalTree<I> {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub issn: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub volumes: Vec<VolumeNode<I>>,
}

/// Journal summary inside an issue's parent chain
#[derive(Debug, Clone, Serialize)]
pub struct JournalRef {
    pub name: String,
    pub slug: String,
    pub issn: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeRef {
    pub id: Uuid,
    pub number: i32,
    pub year: i32,
    pub journal: JournalRef,
}

/// Issue with its volume and journal, plus the full article list
#[derive(Debug, Clone, Serialize)]
pub struct IssueChain {
    pub id: Uuid,
    pub number: i32,
    pub title: Option<String>,
    pub month: Option<i32>,
    pub volume: VolumeRef,
    pub articles: Vec<Article>,
}

async fn leaves_with_counts(store: &dyn Store, issues: Vec<Issue>) -> Result<Vec<IssueWithCount>> {
    let ids: Vec<Uuid> = issues.iter().map(|i| i.id).collect();
    let counts = store.count_articles_for_issues(&ids).await?;

    Ok(issues
        .into_iter()
        .map(|issue| IssueWithCount {
            article_count: counts.get(&issue.id).copied().unwrap_or(0),
            id: issue.id,
            number: issue.number,
            title: issue.title,
            month: issue.month,
        })
        .collect())
}

async fn leaves_with_articles(
    store: &dyn Store,
    issues: Vec<Issue>,
) -> Result<Vec<IssueWithArticles>> {
    let ids: Vec<Uuid> = issues.iter().map(|i| i.id).collect();
    let mut by_issue = group_articles(store.articles_for_issues(&ids).await?);

    Ok(issues
        .into_iter()
        .map(|issue| IssueWithArticles {
            articles: by_issue.remove(&issue.id).unwrap_or_default(),
            id: issue.id,
            number: issue.number,
            title: issue.title,
            month: issue.month,
        })
        .collect())
}

/// Buckets articles by issue, keeping their relative order.
fn group_articles(articles: Vec<Article>) -> HashMap<Uuid, Vec<Article>> {
    let mut grouped: HashMap<Uuid, Vec<Article>> = HashMap::new();
    for article in articles {
        if let Some(issue_id) = article.issue_id {
            grouped.entry(issue_id).or_default().push(article);
        }
    }
    grouped
}

/// Volumes and issues under the given journals, each sorted by number.
async fn load_skeleton(store: &dyn Store, journals: &[Journal]) -> Result<(Vec<Volume>, Vec<Issue>)> {
    let journal_ids: Vec<Uuid> = journals.iter().map(|j| j.id).collect();
    let volumes = store.volumes_for_journals(&journal_ids).await?;

    let volume_ids: Vec<Uuid> = volumes.iter().map(|v| v.id).collect();
    let issues = store.issues_for_volumes(&volume_ids).await?;

    Ok((volumes, issues))
}

/// Stitch leaves back under their volumes and journals.
///
/// `issue_volumes[i]` is the volume owning `leaves[i]`. Inputs arrive sorted,
/// so pushing in order keeps that order.
fn assemble<I>(
    journals: Vec<Journal>,
    volumes: Vec<Volume>,
    issue_volumes: Vec<Uuid>,
    leaves: Vec<I>,
) -> Vec<JournalTree<I>> {
    let mut issues_by_volume: HashMap<Uuid, Vec<I>> = HashMap::new();
    for (volume_id, leaf) in issue_volumes.into_iter().zip(leaves) {
        issues_by_volume.entry(volume_id).or_default().push(leaf);
    }

    let mut volumes_by_journal: HashMap<Uuid, Vec<VolumeNode<I>>> = HashMap::new();
    for volume in volumes {
        volumes_by_journal
            .entry(volume.journal_id)
            .or_default()
            .push(VolumeNode {
                issues: issues_by_volume.remove(&volume.id).unwrap_or_default(),
                id: volume.id,
                number: volume.number,
                year: volume.year,
            });
    }

    journals
        .into_iter()
        .map(|journal| JournalTree {
            volumes: volumes_by_journal.remove(&journal.id).unwrap_or_default(),
            id: journal.id,
            name: journal.name,
            slug: journal.slug,
            description: journal.description,
            issn: journal.issn,
            created_at: journal.created_at,
            updated_at: journal.updated_at,
        })
        .collect()
}

async fn trees_with_counts(
    store: &dyn Store,
    journals: Vec<Journal>,
) -> Result<Vec<JournalTree<IssueWithCount>>> {
    let (volumes, issues) = load_skeleton(store, &journals).await?;
    let owners = issues.iter().map(|i| i.volume_id).collect();
    let leaves = leaves_with_counts(store, issues).await?;
    Ok(assemble(journals, volumes, owners, leaves))
}

async fn trees_with_articles(
    store: &dyn Store,
    journals: Vec<Journal>,
) -> Result<Vec<JournalTree<IssueWithArticles>>> {
    let (volumes, issues) = load_skeleton(store, &journals).await?;
    let owners = issues.iter().map(|i| i.volume_id).collect();
    let leaves = leaves_with_articles(store, issues).await?;
    Ok(assemble(journals, volumes, owners, leaves))
}

async fn find_journal(store: &dyn Store, key: JournalKey<'_>) -> Result<Journal> {
    match key {
        JournalKey::Id(id) => store.get_journal(id).await,
        JournalKey::Slug(slug) => store.get_journal_by_slug(slug).await,
    }
}

/// One journal with per-issue article counts.
pub async fn journal_with_counts(
    store: &dyn Store,
    key: JournalKey<'_>,
) -> Result<JournalTree<IssueWithCount>> {
    let journal = find_journal(store, key).await?;
    let mut trees = trees_with_counts(store, vec![journal]).await?;
    trees
        .pop()
        .ok_or_else(|| AppError::Internal("projection lost its journal".to_string()))
}

/// One journal with full article lists.
pub async fn journal_with_articles(
    store: &dyn Store,
    key: JournalKey<'_>,
) -> Result<JournalTree<IssueWithArticles>> {
    let journal = find_journal(store, key).await?;
    let mut trees = trees_with_articles(store, vec![journal]).await?;
    trees
        .pop()
        .ok_or_else(|| AppError::Internal("projection lost its journal".to_string()))
}

/// Every journal with full article lists.
pub async fn all_journals_with_articles(
    store: &dyn Store,
) -> Result<Vec<JournalTree<IssueWithArticles>>> {
    let journals = store.list_journals().await?;
    trees_with_articles(store, journals).await
}

/// Issue addressed through its journal slug and volume id.
///
/// Any mismatch along the chain is reported as the issue not being found.
pub async fn issue_chain(
    store: &dyn Store,
    journal_slug: &str,
    volume_id: Uuid,
    issue_id: Uuid,
) -> Result<IssueChain> {
    let missing = || AppError::not_found("Issue", issue_id);

    let issue = store.get_issue(issue_id).await.map_err(|e| match e {
        AppError::NotFound { .. } => missing(),
        other => other,
    })?;
    if issue.volume_id != volume_id {
        return Err(missing());
    }

    let volume = store.get_volume(volume_id).await?;
    let journal = store.get_journal(volume.journal_id).await?;
    if journal.slug != journal_slug {
        return Err(missing());
    }

    let articles = store.articles_for_issues(&[issue.id]).await?;

    Ok(IssueChain {
        id: issue.id,
        number: issue.number,
        title: issue.title,
        month: issue.month,
        volume: VolumeRef {
            id: volume.id,
            number: volume.number,
            year: volume.year,
            journal: JournalRef {
                name: journal.name,
                slug: journal.slug,
                issn: journal.issn,
            },
        },
        articles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        article::NewArticle, issue::CreateIssue, journal::NewJournal, user::NewUser,
        volume::CreateVolume, ArticleStatus, Role,
    };
    use crate::store::{ArticleStore, IssueStore, JournalStore, MemoryStore, UserStore, VolumeStore};

    struct Fixture {
        store: MemoryStore,
        journal: Journal,
        volume_ids: Vec<Uuid>,
        issue_ids: Vec<Uuid>,
    }

    /// Journal "cell" with volumes 2 and 1 (inserted out of order), two
    /// issues in volume 1 holding 2 and 0 articles, and one issue in volume 2
    /// holding 1 article.
    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let user = store
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
            .unwrap();
        let journal = store
            .insert_journal(NewJournal {
                name: "Cell".to_string(),
                slug: "cell".to_string(),
                description: None,
                issn: Some("0092-8674".to_string()),
            })
            .await
            .unwrap();

        let mut volume_ids = Vec::new();
        for number in [2, 1] {
            let volume = store
                .insert_volume(CreateVolume {
                    number,
                    year: 2020 + number,
                    journal_id: journal.id,
                })
                .await
                .unwrap();
            volume_ids.push(volume.id);
        }
        // volume_ids[0] is number 2, volume_ids[1] is number 1

        let mut issue_ids = Vec::new();
        for (volume_id, number) in [(volume_ids[1], 2), (volume_ids[1], 1), (volume_ids[0], 1)] {
            let issue = store
                .insert_issue(CreateIssue {
                    number,
                    title: None,
                    month: Some(3),
                    volume_id,
                })
                .await
                .unwrap();
            issue_ids.push(issue.id);
        }

        let placements = [("a", issue_ids[1]), ("b", issue_ids[1]), ("c", issue_ids[2])];
        for (slug, issue_id) in placements {
            store
                .insert_article(NewArticle {
                    title: slug.to_string(),
                    slug: slug.to_string(),
                    authors: "A. Author".to_string(),
                    abstract_text: None,
                    file: None,
                    status: ArticleStatus::Published,
                    payment_proof: None,
                    payment_verified: false,
                    issue_id: Some(issue_id),
                    publisher_id: user.id,
                })
                .await
                .unwrap();
        }

        Fixture {
            store,
            journal,
            volume_ids,
            issue_ids,
        }
    }

    #[tokio::test]
    async fn counts_match_article_lists() {
        let f = fixture().await;
        let counts = journal_with_counts(&f.store, JournalKey::Slug("cell"))
            .await
            .unwrap();
        let full = journal_with_articles(&f.store, JournalKey::Id(f.journal.id))
            .await
            .unwrap();

        let count_leaves: Vec<i64> = counts
            .volumes
            .iter()
            .flat_map(|v| v.issues.iter().map(|i| i.article_count))
            .collect();
        let list_leaves: Vec<i64> = full
            .volumes
            .iter()
            .flat_map(|v| v.issues.iter().map(|i| i.articles.len() as i64))
            .collect();
        assert_eq!(count_leaves, list_leaves);
        assert_eq!(count_leaves, vec![2, 0, 1]);
    }

    #[tokio::test]
    async fn volumes_and_issues_ordered_by_number() {
        let f = fixture().await;
        let tree = journal_with_counts(&f.store, JournalKey::Slug("cell"))
            .await
            .unwrap();

        let volume_numbers: Vec<i32> = tree.volumes.iter().map(|v| v.number).collect();
        assert_eq!(volume_numbers, vec![1, 2]);
        let issue_numbers: Vec<i32> = tree.volumes[0].issues.iter().map(|i| i.number).collect();
        assert_eq!(issue_numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn articles_newest_first() {
        let f = fixture().await;
        let tree = journal_with_articles(&f.store, JournalKey::Slug("cell"))
            .await
            .unwrap();
        let slugs: Vec<&str> = tree.volumes[0].issues[0]
            .articles
            .iter()
            .map(|a| a.slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn journal_without_volumes_is_empty_tree() {
        let store = MemoryStore::new();
        store
            .insert_journal(NewJournal {
                name: "Empty".to_string(),
                slug: "empty".to_string(),
                description: None,
                issn: None,
            })
            .await
            .unwrap();

        let tree = journal_with_counts(&store, JournalKey::Slug("empty"))
            .await
            .unwrap();
        assert!(tree.volumes.is_empty());

        let err = journal_with_counts(&store, JournalKey::Slug("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn all_journals_share_batches() {
        let f = fixture().await;
        f.store
            .insert_journal(NewJournal {
                name: "Another".to_string(),
                slug: "another".to_string(),
                description: None,
                issn: None,
            })
            .await
            .unwrap();

        let trees = all_journals_with_articles(&f.store).await.unwrap();
        assert_eq!(trees.len(), 2);
        assert_eq!(trees[0].slug, "another");
        assert!(trees[0].volumes.is_empty());
        assert_eq!(trees[1].volumes.len(), 2);
    }

    #[tokio::test]
    async fn issue_chain_checks_every_parent() {
        let f = fixture().await;
        let chain = issue_chain(&f.store, "cell", f.volume_ids[1], f.issue_ids[1])
            .await
            .unwrap();
        assert_eq!(chain.volume.journal.slug, "cell");
        assert_eq!(chain.volume.number, 1);
        assert_eq!(chain.articles.len(), 2);

        let wrong_volume = issue_chain(&f.store, "cell", f.volume_ids[0], f.issue_ids[1]).await;
        assert!(matches!(wrong_volume, Err(AppError::NotFound { .. })));

        let wrong_journal = issue_chain(&f.store, "nature", f.volume_ids[1], f.issue_ids[1]).await;
        assert!(matches!(wrong_journal, Err(AppError::NotFound { .. })));
    }
}
