//! Authentication models and utilities

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::User;
use crate::models::Role;

/// Kind of JWT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: Option<String>,
    pub role: Role,
    pub token_type: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub jti: String,
}

impl Claims {
    /// Create new claims for a user
    pub fn new(user: &User, kind: TokenKind, expiration: i64, issuer: String) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            token_type: kind,
            iat: now.timestamp(),
            exp: now.timestamp() + expiration,
            iss: issuer,
            jti: PasswordUtils::generate_token_id(),
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Authentication("Invalid user ID in token".to_string()))
    }
}

/// Access/refresh token pair
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// User summary embedded in token responses
#[derive(Debug, Clone, Serialize)]
pub struct TokenUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Role,
    pub name: Option<String>,
}

impl From<&User> for TokenUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            name: user.name.clone(),
        }
    }
}

/// Signup/login response body
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
    pub user: TokenUser,
}

impl TokenResponse {
    pub fn new(pair: TokenPair, user: &User) -> Self {
        Self {
            access: pair.access,
            refresh: pair.refresh,
            user: TokenUser::from(user),
        }
    }
}

/// Refresh token request
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Issues and verifies tokens for validated users
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> Result<TokenPair, AppError>;
    fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AppError>;
}

/// JWT token service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_expiration: i64,
    refresh_expiration: i64,
}

impl JwtService {
    /// Create new JWT service
    pub fn new(
        secret: &str,
        issuer: String,
        access_expiration: i64,
        refresh_expiration: i64,
    ) -> Result<Self, AppError> {
        if secret.len() < 32 {
            return Err(AppError::Config(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.set_issuer(&[&issuer]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
            issuer,
            access_expiration,
            refresh_expiration,
        })
    }

    fn encode_token(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to encode token: {}", e)))
    }
}

impl TokenIssuer for JwtService {
    fn issue(&self, user: &User) -> Result<TokenPair, AppError> {
        let access = Claims::new(user, TokenKind::Access, self.access_expiration, self.issuer.clone());
        let refresh = Claims::new(user, TokenKind::Refresh, self.refresh_expiration, self.issuer.clone());

        Ok(TokenPair {
            access: self.encode_token(&access)?,
            refresh: self.encode_token(&refresh)?,
        })
    }

    fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))?
            .claims;

        if claims.token_type != expected {
            return Err(AppError::Authentication("Wrong token type".to_string()));
        }

        Ok(claims)
    }
}

/// Password utilities
pub struct PasswordUtils;

impl PasswordUtils {
    /// Hash password with bcrypt
    pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, AppError> {
        Ok(bcrypt::hash(password, cost)?)
    }

    /// Random identifier for a token
    pub fn generate_token_id() -> String {
        use rand::distributions::Alphanumeric;
        use rand::{thread_rng, Rng};

        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    }
}

/// Authentication context for requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Role,
    pub token_expires_at: DateTime<Utc>,
}

impl TryFrom<Claims> for AuthContext {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: claims.user_id()?,
            email: claims.email,
            role: claims.role,
            token_expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now),
        })
    }
}

impl AuthContext {
    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.token_expires_at
    }
}
