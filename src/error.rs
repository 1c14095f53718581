//! Error types for the cloudnotes application
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized for transport to a frontend.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Sign in to continue")]
    AuthRequired,

    #[error("Permission denied: {0}. Check that you own this document and try again")]
    PermissionDenied(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("PDF export failed: {0}")]
    Export(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_serialize_as_display_strings() {
        let json = serde_json::to_value(AppError::NotFound("note n1".to_string())).unwrap();
        assert_eq!(json, serde_json::json!("Not found: note n1"));

        let json = serde_json::to_value(AppError::AuthRequired).unwrap();
        assert_eq!(json, serde_json::json!("Sign in to continue"));
    }
}
