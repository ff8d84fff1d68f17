//! Issue models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::{check_nullable_length, nullable, volume::Volume};

/// Issue model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Issue {
    pub id: Uuid,
    pub number: i32,
    pub title: Option<String>,
    pub month: Option<i32>,
    pub volume_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Issue creation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateIssue {
    #[validate(range(min = 0))]
    pub number: i32,
    #[validate(length(max = 255))]
    pub title: Option<String>,
    #[validate(range(min = 1, max = 12, message = "Month must be between 1 and 12."))]
    pub month: Option<i32>,
    #[serde(alias = "volume")]
    pub volume_id: Uuid,
}

/// Issue partial update request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateIssue {
    #[validate(range(min = 0))]
    pub number: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub month: Option<Option<i32>>,
    #[serde(alias = "volume")]
    pub volume_id: Option<Uuid>,
}

impl UpdateIssue {
    /// Checks the nullable fields the derive cannot reach.
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_default();
        check_nullable_length(&mut errors, "title", &self.title, 255);
        if let Some(Some(month)) = self.month {
            if !(1..=12).contains(&month) {
                errors.add(
                    "month",
                    validator::ValidationError::new("range")
                        .with_message("Month must be between 1 and 12.".into()),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Issue with its owning volume, for detail views
#[derive(Debug, Clone, Serialize)]
pub struct IssueDetail {
    #[serde(flatten)]
    pub issue: Issue,
    pub volume: Volume,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_range() {
        let create = CreateIssue {
            number: 1,
            title: None,
            month: Some(13),
            volume_id: Uuid::new_v4(),
        };
        assert!(create.validate().is_err());

        let update: UpdateIssue = serde_json::from_str(r#"{"month": 0}"#).unwrap();
        assert!(update.validate_all().is_err());

        let update: UpdateIssue = serde_json::from_str(r#"{"month": null}"#).unwrap();
        assert!(update.validate_all().is_ok());
        assert_eq!(update.month, Some(None));
    }

    #[test]
    fn test_update_title_length() {
        let long = "x".repeat(300);
        let update: UpdateIssue =
            serde_json::from_value(serde_json::json!({ "title": long, "month": 13 })).unwrap();
        let errors = update.validate_all().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
        assert!(errors.field_errors().contains_key("month"));

        let update: UpdateIssue = serde_json::from_str(r#"{"title": null}"#).unwrap();
        assert!(update.validate_all().is_ok());
    }
}
