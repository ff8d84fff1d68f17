//! Journal models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::{blank_as_none, nullable, SLUG_REGEX};

/// Journal model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Journal {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub issn: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Journal creation request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateJournal {
    #[validate(length(min = 1, max = 255, message = "This field may not be blank."))]
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(regex(path = *SLUG_REGEX, message = "Enter a valid slug."))]
    pub slug: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20, message = "Ensure this field has no more than 20 characters."))]
    pub issn: Option<String>,
}

/// Journal partial update request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateJournal {
    #[validate(length(min = 1, max = 255, message = "This field may not be blank."))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(regex(path = *SLUG_REGEX, message = "Enter a valid slug."))]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub issn: Option<Option<String>>,
}

impl UpdateJournal {
    /// Checks the nullable fields the derive cannot reach.
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;
        if let Some(Some(issn)) = &self.issn {
            if issn.is_empty() || issn.chars().count() > 20 {
                let mut errors = validator::ValidationErrors::new();
                errors.add(
                    "issn",
                    validator::ValidationError::new("length").with_message(
                        "Ensure this field has no more than 20 characters.".into(),
                    ),
                );
                return Err(errors);
            }
        }
        Ok(())
    }
}

/// Fully resolved journal record handed to the store
#[derive(Debug, Clone)]
pub struct NewJournal {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub issn: Option<String>,
}
