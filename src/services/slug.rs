//! Slug derivation and uniqueness.
//!
//! Derivation is pure; uniqueness is delegated to an async predicate so the
//! same helpers serve journals and articles against any store.

use std::future::Future;

use slug::slugify;

use crate::config::CollisionPolicy;
use crate::error::{AppError, Result};
use crate::models::SLUG_REGEX;

/// Upper bound on `-N` suffixes tried before giving up.
const MAX_SUFFIX_ATTEMPTS: u32 = 1000;

/// A slug and whether it was derived rather than supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedSlug {
    pub value: String,
    pub generated: bool,
}

/// Normalize `text` into a slug, reporting failures against `field`.
pub fn derive_slug(field: &'static str, text: &str) -> Result<String> {
    let candidate = slugify(text);
    if candidate.is_empty() {
        return Err(AppError::invalid_field(
            field,
            "slug",
            "Cannot derive a slug from this value.",
        ));
    }
    Ok(candidate)
}

/// Reject caller-supplied slugs that are not already normalized.
pub fn check_explicit(slug: &str) -> Result<()> {
    if SLUG_REGEX.is_match(slug) {
        Ok(())
    } else {
        Err(AppError::invalid_field("slug", "regex", "Enter a valid slug."))
    }
}

/// First of `base`, `base-1`, `base-2`, … for which `taken` answers false.
pub async fn unique_with_suffix<F, Fut>(base: &str, mut taken: F) -> Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    if !taken(base.to_string()).await? {
        return Ok(base.to_string());
    }

    for n in 1..=MAX_SUFFIX_ATTEMPTS {
        let candidate = format!("{}-{}", base, n);
        if !taken(candidate.clone()).await? {
            return Ok(candidate);
        }
    }

    Err(AppError::unique(
        "slug",
        format!("No free slug found for '{}'.", base),
    ))
}

/// Pick the slug for a write.
///
/// An explicit slug is validated and kept as is; otherwise one is derived
/// from `text`. Under [`CollisionPolicy::Reject`] a derived slug is returned
/// without consulting `taken`, leaving collisions to the store.
pub async fn assign_slug<F, Fut>(
    source_field: &'static str,
    text: &str,
    explicit: Option<&str>,
    policy: CollisionPolicy,
    taken: F,
) -> Result<AssignedSlug>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    if let Some(slug) = explicit.filter(|s| !s.is_empty()) {
        check_explicit(slug)?;
        return Ok(AssignedSlug {
            value: slug.to_string(),
            generated: false,
        });
    }

    let base = derive_slug(source_field, text)?;
    let value = match policy {
        CollisionPolicy::Reject => base,
        CollisionPolicy::Suffix => unique_with_suffix(&base, taken).await?,
    };

    Ok(AssignedSlug {
        value,
        generated: true,
    })
}

/// Whether a failed write lost a race on the slug constraint.
pub fn is_slug_conflict(err: &AppError) -> bool {
    matches!(err, AppError::UniquenessViolation { field, .. } if field == "slug")
}
