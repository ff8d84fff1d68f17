//! Account creation and credential checks.

use tracing::{info, warn};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::{
    auth::PasswordUtils,
    user::{
        normalize_email, CreateUser, LoginRequest, NewUser, SignupRequest, UpdateUser, User,
        UNUSABLE_PASSWORD,
    },
    Role,
};
use crate::store::Store;

/// Stores a new user, rejecting emails that are already registered.
///
/// Without a password the account gets an unusable hash and cannot log in.
pub async fn create_user(store: &dyn Store, input: CreateUser, cost: u32) -> Result<User> {
    input.validate()?;

    let email = input.email.as_deref().map(normalize_email);
    if let Some(email) = &email {
        if store.find_user_by_email(email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }
    }

    let password_hash = match &input.password {
        Some(password) => PasswordUtils::hash_password_with_cost(password, cost)?,
        None => UNUSABLE_PASSWORD.to_string(),
    };

    let user = store
        .insert_user(NewUser {
            name: input.name,
            bio: input.bio,
            institution: input.institution,
            email,
            image: input.image,
            password_hash,
            role: input.role.unwrap_or_default(),
            is_staff: false,
        })
        .await
        .map_err(email_conflict)?;

    info!(user_id = %user.id, role = ?user.role, "User created");
    Ok(user)
}

/// Self-service registration; always yields a Publisher.
pub async fn signup(store: &dyn Store, input: SignupRequest, cost: u32) -> Result<User> {
    input.validate()?;

    create_user(
        store,
        CreateUser {
            name: input.name.filter(|n| !n.is_empty()),
            email: Some(input.email),
            password: Some(input.password),
            role: Some(Role::Publisher),
            ..CreateUser::default()
        },
        cost,
    )
    .await
}

/// Resolve credentials to an active user with a usable password.
pub async fn authenticate(store: &dyn Store, input: &LoginRequest) -> Result<User> {
    let email = normalize_email(&input.email);

    let Some(user) = store.find_user_by_email(&email).await? else {
        warn!(email = %email, "Login attempt for unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !user.is_active || !user.verify_password(&input.password) {
        warn!(user_id = %user.id, "Login rejected");
        return Err(AppError::InvalidCredentials);
    }

    store.record_login(user.id).await?;
    info!(user_id = %user.id, "User logged in");
    Ok(user)
}

/// Create the bootstrap admin, or promote the existing account to admin.
pub async fn ensure_admin(
    store: &dyn Store,
    email: &str,
    password: &str,
    name: Option<String>,
    cost: u32,
) -> Result<User> {
    let email = normalize_email(email);

    if let Some(existing) = store.find_user_by_email(&email).await? {
        if existing.role == Role::Admin {
            info!(user_id = %existing.id, "Admin user already present");
            return Ok(existing);
        }
        warn!(user_id = %existing.id, "Bootstrap email belongs to a non-admin user; promoting");
        let update = UpdateUser {
            role: Some(Role::Admin),
            ..UpdateUser::default()
        };
        return store.update_user(existing.id, update).await;
    }

    let user = store
        .insert_user(NewUser {
            name,
            bio: None,
            institution: None,
            email: Some(email),
            image: None,
            password_hash: PasswordUtils::hash_password_with_cost(password, cost)?,
            role: Role::Admin,
            is_staff: true,
        })
        .await?;

    info!(user_id = %user.id, "Admin user created");
    Ok(user)
}

/// A racing insert surfaces as a store uniqueness error on `email`.
fn email_conflict(err: AppError) -> AppError {
    match err {
        AppError::UniquenessViolation { ref field, .. } if field == "email" => {
            AppError::DuplicateEmail
        }
        other => other,
    }
}
