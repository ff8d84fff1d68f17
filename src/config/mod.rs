//! Configuration management for the journal backend

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::{info, warn};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub slug: SlugConfig,
    pub admin: AdminConfig,
    pub features: FeaturesConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig::load()?,
            database: DatabaseConfig::load()?,
            jwt: JwtConfig::load()?,
            storage: StorageConfig::load()?,
            slug: SlugConfig::load()?,
            admin: AdminConfig::load(),
            features: FeaturesConfig::load()?,
            logging: LoggingConfig::load(),
        };

        info!("Configuration loaded successfully");
        Ok(config)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()?,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|value| {
                    value
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: Vec::new(),
        }
    }
}

/// Which store implementation backs the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
}

impl DatabaseConfig {
    fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(DatabaseConfig {
            backend: env::var("STORE_BACKEND")
                .unwrap_or_else(|_| "postgres".to_string())
                .parse()?,
            url: env::var("DATABASE_URL").ok(),
            host: env::var("DATABASE_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("DATABASE_PORT")
                .unwrap_or_else(|_| "5432".to_string())
                .parse()?,
            database: env::var("DATABASE_NAME").unwrap_or_else(|_| "journals".to_string()),
            username: env::var("DATABASE_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: env::var("DATABASE_PASSWORD").unwrap_or_default(),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,
            min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()?,
            connect_timeout: env::var("DATABASE_CONNECT_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
        })
    }

    /// Connection URL; `DATABASE_URL` wins over the individual parts.
    pub fn connection_url(&self) -> Result<String, url::ParseError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let url = url::Url::parse(&format!(
            "postgres://{}:{}@{}:{}/{}",
            percent_encoding::utf8_percent_encode(&self.username, percent_encoding::NON_ALPHANUMERIC),
            percent_encoding::utf8_percent_encode(&self.password, percent_encoding::NON_ALPHANUMERIC),
            self.host,
            self.port,
            self.database
        ))?;

        Ok(url.into())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            database: "journals".to_string(),
            username: "postgres".to_string(),
            password: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: 30,
        }
    }
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration: u64,
    pub refresh_expiration: u64,
    pub issuer: String,
    /// bcrypt work factor for stored passwords
    pub bcrypt_cost: u32,
}

impl JwtConfig {
    fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let secret = env::var("JWT_SECRET")?;

        if secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters long".into());
        }

        Ok(JwtConfig {
            secret,
            expiration: env::var("JWT_EXPIRATION")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?, // 5 minutes
            refresh_expiration: env::var("JWT_REFRESH_EXPIRATION")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()?, // 1 day
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "journal-backend".to_string()),
            bcrypt_cost: env::var("BCRYPT_COST")
                .map(|v| v.parse())
                .unwrap_or(Ok(bcrypt::DEFAULT_COST))?,
        })
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "development-secret-that-is-at-least-32-chars".to_string(),
            expiration: 300,
            refresh_expiration: 86400,
            issuer: "journal-backend".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Uploaded file storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub local_path: String,
    pub media_url: String,
    pub max_upload_bytes: usize,
}

impl StorageConfig {
    fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(StorageConfig {
            local_path: env::var("FILE_STORAGE_LOCAL_PATH")
                .unwrap_or_else(|_| "./media".to_string()),
            media_url: env::var("MEDIA_URL").unwrap_or_else(|_| "/media".to_string()),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| "26214400".to_string())
                .parse()?, // 25 MB
        })
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_path: "./media".to_string(),
            media_url: "/media".to_string(),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

/// What to do when a derived journal slug is already taken
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    #[default]
    Reject,
    Suffix,
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(CollisionPolicy::Reject),
            "suffix" => Ok(CollisionPolicy::Suffix),
            other => Err(format!("unknown slug collision policy '{}'", other)),
        }
    }
}

/// Slug assignment settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlugConfig {
    pub on_journal_slug_collision: CollisionPolicy,
}

impl SlugConfig {
    fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(SlugConfig {
            on_journal_slug_collision: env::var("JOURNAL_SLUG_COLLISION")
                .unwrap_or_else(|_| "reject".to_string())
                .parse()?,
        })
    }
}

/// Bootstrap admin account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub name: Option<String>,
}

impl AdminConfig {
    fn load() -> Self {
        let config = AdminConfig {
            email: env::var("ADMIN_EMAIL").ok(),
            password: env::var("ADMIN_PASSWORD").ok(),
            name: env::var("ADMIN_NAME").ok(),
        };

        if config.email.is_some() != config.password.is_some() {
            warn!("ADMIN_EMAIL and ADMIN_PASSWORD must both be set; admin bootstrap disabled");
            return AdminConfig::default();
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        self.email.is_some() && self.password.is_some()
    }
}

/// Feature flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    pub rate_limiting: bool,
    pub enforce_policies: bool,
    pub serve_media: bool,
}

impl FeaturesConfig {
    fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(FeaturesConfig {
            rate_limiting: env::var("FEATURE_RATE_LIMITING")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            enforce_policies: env::var("FEATURE_ENFORCE_POLICIES")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            serve_media: env::var("FEATURE_SERVE_MEDIA")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
        })
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            rate_limiting: false,
            enforce_policies: false,
            serve_media: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "compact"
    pub file: Option<String>,
}

impl LoggingConfig {
    fn load() -> Self {
        LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
            file: env::var("LOG_FILE").ok(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            file: None,
        }
    }
}
