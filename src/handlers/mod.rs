//! API request handlers

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

pub mod article;
pub mod auth;
pub mod issue;
pub mod journal;
pub mod user;
pub mod volume;

/// JSON body whose rejections use the API error shape
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters whose rejections use the API error shape
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string whose rejections use the API error shape
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
