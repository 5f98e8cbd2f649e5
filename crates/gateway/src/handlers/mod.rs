//! API handlers module

pub mod health;
pub mod query;
pub mod widget;

use axum::http::Uri;
use ragchat_common::errors::AppError;

/// Structured 404 for unknown routes
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound {
        path: uri.path().to_string(),
    }
}
