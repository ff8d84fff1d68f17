//! User-related models and types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::{check_nullable_length, check_nullable_url, nullable, Role};

/// Password hash marker for accounts that cannot log in
pub const UNUSABLE_PASSWORD: &str = "!";

/// User model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub institution: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub is_staff: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Verify user password
    pub fn verify_password(&self, password: &str) -> bool {
        if !self.has_usable_password() {
            return false;
        }
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }

    pub fn has_usable_password(&self) -> bool {
        !self.password_hash.starts_with(UNUSABLE_PASSWORD)
    }
}

/// Fully resolved user record handed to the store
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub institution: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub is_staff: bool,
}

/// User creation request (admin list POST)
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub bio: Option<String>,
    #[serde(alias = "Institution")]
    #[validate(length(max = 255))]
    pub institution: Option<String>,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(url(message = "Enter a valid URL."))]
    pub image: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub password: Option<String>,
    pub role: Option<Role>,
}

/// User partial update request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[serde(default, deserialize_with = "nullable")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub bio: Option<Option<String>>,
    #[serde(default, alias = "Institution", deserialize_with = "nullable")]
    pub institution: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub email_verified: Option<Option<DateTime<Utc>>>,
    pub role: Option<Role>,
}

impl UpdateUser {
    /// Same limits as [`CreateUser`], applied to the inner nullable values.
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_default();
        check_nullable_length(&mut errors, "name", &self.name, 255);
        check_nullable_length(&mut errors, "bio", &self.bio, 255);
        check_nullable_length(&mut errors, "institution", &self.institution, 255);
        check_nullable_url(&mut errors, "image", &self.image);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// User profile response (without sensitive data)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_staff: bool,
    pub bio: Option<String>,
    pub institution: Option<String>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            email_verified: user.email_verified,
            image: user.image,
            role: user.role,
            is_active: user.is_active,
            is_staff: user.is_staff,
            bio: user.bio,
            institution: user.institution,
        }
    }
}

/// Signup request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Normalize an email address by lower-casing the domain part
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}
