//! Article models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::{blank_as_none, blob::BlobRef, nullable, ArticleStatus, SLUG_REGEX};

/// Article model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub authors: String,
    #[serde(rename = "abstract")]
    #[sqlx(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub file: Option<BlobRef>,
    pub status: ArticleStatus,
    pub payment_proof: Option<BlobRef>,
    pub payment_verified: bool,
    #[serde(rename = "issue")]
    pub issue_id: Option<Uuid>,
    #[serde(rename = "publisher")]
    pub publisher_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Article creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateArticle {
    #[validate(length(min = 1, max = 255, message = "This field may not be blank."))]
    pub title: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(regex(path = *SLUG_REGEX, message = "Enter a valid slug."))]
    pub slug: Option<String>,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub file: Option<BlobRef>,
    pub status: Option<ArticleStatus>,
    pub payment_proof: Option<BlobRef>,
    pub payment_verified: Option<bool>,
    #[serde(alias = "issue")]
    pub issue_id: Option<Uuid>,
    #[serde(alias = "publisher")]
    pub publisher_id: Uuid,
}

/// Article partial update request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateArticle {
    #[validate(length(min = 1, max = 255, message = "This field may not be blank."))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(regex(path = *SLUG_REGEX, message = "Enter a valid slug."))]
    pub slug: Option<String>,
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub authors: Option<String>,
    #[serde(rename = "abstract", default, deserialize_with = "nullable")]
    pub abstract_text: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub file: Option<Option<BlobRef>>,
    pub status: Option<ArticleStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub payment_proof: Option<Option<BlobRef>>,
    pub payment_verified: Option<bool>,
    #[serde(default, alias = "issue", deserialize_with = "nullable")]
    pub issue_id: Option<Option<Uuid>>,
    #[serde(alias = "publisher")]
    pub publisher_id: Option<Uuid>,
}

/// Fully resolved article record handed to the store
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub slug: String,
    pub authors: String,
    pub abstract_text: Option<String>,
    pub file: Option<BlobRef>,
    pub status: ArticleStatus,
    pub payment_proof: Option<BlobRef>,
    pub payment_verified: bool,
    pub issue_id: Option<Uuid>,
    pub publisher_id: Uuid,
}

/// Optional filters for article listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleFilter {
    pub status: Option<ArticleStatus>,
    pub issue: Option<Uuid>,
    pub publisher: Option<Uuid>,
}

impl ArticleFilter {
    pub fn matches(&self, article: &Article) -> bool {
        self.status.map_or(true, |s| article.status == s)
            && self.issue.map_or(true, |i| article.issue_id == Some(i))
            && self.publisher.map_or(true, |p| article.publisher_id == p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_article_accepts_original_field_names() {
        let publisher = Uuid::new_v4();
        let body = serde_json::json!({
            "title": "Study A",
            "authors": "A. Author",
            "abstract": "Findings.",
            "publisher": publisher,
        });

        let create: CreateArticle = serde_json::from_value(body).unwrap();
        assert_eq!(create.publisher_id, publisher);
        assert_eq!(create.abstract_text.as_deref(), Some("Findings."));
        assert!(create.issue_id.is_none());
        assert!(create.validate().is_ok());
    }

    #[test]
    fn test_update_article_status_only() {
        let update: UpdateArticle = serde_json::from_str(r#"{"status": "SUBMITTED"}"#).unwrap();
        assert_eq!(update.status, Some(ArticleStatus::Submitted));
        assert!(update.title.is_none());
        assert!(update.abstract_text.is_none());
        assert!(update.issue_id.is_none());
    }

    #[test]
    fn test_update_article_can_unassign_issue() {
        let update: UpdateArticle = serde_json::from_str(r#"{"issue": null}"#).unwrap();
        assert_eq!(update.issue_id, Some(None));
    }

    #[test]
    fn test_article_output_uses_original_field_names() {
        let article = Article {
            id: Uuid::new_v4(),
            title: "Study A".to_string(),
            slug: "study-a".to_string(),
            authors: "A. Author".to_string(),
            abstract_text: None,
            file: None,
            status: ArticleStatus::Draft,
            payment_proof: None,
            payment_verified: false,
            issue_id: None,
            publisher_id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["publisher"], article.publisher_id.to_string());
        assert!(json["issue"].is_null());
        assert!(json.get("publisher_id").is_none());
        assert!(json.get("issue_id").is_none());
    }

    #[test]
    fn test_blank_slug_is_left_for_derivation() {
        let body = serde_json::json!({
            "title": "Study A",
            "slug": "",
            "authors": "A. Author",
            "publisher": Uuid::new_v4(),
        });

        let create: CreateArticle = serde_json::from_value(body).unwrap();
        assert!(create.slug.is_none());
        assert!(create.validate().is_ok());
    }
}
