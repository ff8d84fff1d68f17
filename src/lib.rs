//! Journal Backend - content management API for an academic journal platform
//!
//! This crate provides:
//! - RESTful API with Axum
//! - PostgreSQL or in-memory storage behind the `Store` traits
//! - JWT authentication and role policies
//! - Nested journal / volume / issue / article read models
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use journal_backend::{config::Config, server, store::memory::MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = server::AppState::new(Config::default(), Arc::new(MemoryStore::new()))?;
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!
//!     axum::serve(listener, server::create_router(state)).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod admin_init;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod migrate;
pub mod models;
pub mod policy;
pub mod server;
pub mod services;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use store::Store;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
