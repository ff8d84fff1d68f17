//! Domain models for the journal backend

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::{ValidateLength, ValidateUrl, ValidationError, ValidationErrors};

pub mod article;
pub mod auth;
pub mod blob;
pub mod issue;
pub mod journal;
pub mod user;
pub mod volume;

/// Common trait for database entities
pub trait Entity {
    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
}

macro_rules! impl_entity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::models::Entity for $ty {
                fn id(&self) -> ::uuid::Uuid {
                    self.id
                }

                fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                    self.created_at
                }

                fn updated_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                    self.updated_at
                }
            }
        )+
    };
}

impl_entity!(
    user::User,
    journal::Journal,
    volume::Volume,
    issue::Issue,
    article::Article,
);

/// Well-formed slug: lowercase ASCII words joined by single hyphens.
pub static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

/// User role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    #[default]
    Publisher,
    Reviewer,
}

/// Article lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Published,
}

impl ArticleStatus {
    /// Statuses an author may set without a reviewer.
    pub fn is_author_controlled(self) -> bool {
        matches!(self, ArticleStatus::Draft | ArticleStatus::Submitted)
    }
}

/// Distinguishes an absent field from an explicit `null` in partial updates.
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: missing → `None`, `null` → `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Reads a blank string as absent, for optional fields where `""` means "derive it".
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

/// Length check on the inner value of a nullable update field.
pub(crate) fn check_nullable_length(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &Option<Option<String>>,
    max: u64,
) {
    if let Some(Some(text)) = value {
        if !text.validate_length(None, Some(max), None) {
            errors.add(
                field,
                ValidationError::new("length").with_message(
                    format!("Ensure this field has no more than {} characters.", max).into(),
                ),
            );
        }
    }
}

/// URL check on the inner value of a nullable update field.
pub(crate) fn check_nullable_url(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &Option<Option<String>>,
) {
    if let Some(Some(url)) = value {
        if !url.validate_url() {
            errors.add(
                field,
                ValidationError::new("url").with_message("Enter a valid URL.".into()),
            );
        }
    }
}

/// Apply a partial-update value to a nullable field.
pub fn patch_nullable<T: Clone>(target: &mut Option<T>, value: &Option<Option<T>>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

/// Apply a partial-update value to a required field.
pub fn patch<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        description: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_distinguishes_missing_and_null() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.description, None);

        let cleared: Patch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: Patch = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert_eq!(set.description, Some(Some("x".to_string())));
    }

    #[derive(Debug, Deserialize)]
    struct SlugInput {
        #[serde(default, deserialize_with = "blank_as_none")]
        slug: Option<String>,
    }

    #[test]
    fn test_blank_slug_reads_as_absent() {
        let blank: SlugInput = serde_json::from_str(r#"{"slug": ""}"#).unwrap();
        assert_eq!(blank.slug, None);

        let missing: SlugInput = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.slug, None);

        let set: SlugInput = serde_json::from_str(r#"{"slug": "nature"}"#).unwrap();
        assert_eq!(set.slug.as_deref(), Some("nature"));
    }

    #[test]
    fn test_nullable_checks_inspect_inner_values() {
        let mut errors = ValidationErrors::new();
        check_nullable_length(&mut errors, "title", &Some(Some("x".repeat(256))), 255);
        check_nullable_length(&mut errors, "bio", &Some(None), 255);
        check_nullable_url(&mut errors, "image", &Some(Some("not a url".to_string())));
        check_nullable_url(&mut errors, "avatar", &None);

        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("image"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_enum_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Publisher).unwrap(), "\"PUBLISHER\"");
        assert_eq!(
            serde_json::to_string(&ArticleStatus::UnderReview).unwrap(),
            "\"UNDER_REVIEW\""
        );
        assert_eq!(Role::default(), Role::Publisher);
        assert_eq!(ArticleStatus::default(), ArticleStatus::Draft);
    }

    #[test]
    fn test_slug_regex() {
        assert!(SLUG_REGEX.is_match("study-a-1"));
        assert!(!SLUG_REGEX.is_match("Study A"));
        assert!(!SLUG_REGEX.is_match("double--hyphen"));
        assert!(!SLUG_REGEX.is_match("-leading"));
    }
}
