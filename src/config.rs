//! Application configuration
//!
//! Runtime settings come from the environment with sensible defaults;
//! fixed limits and formats live here as constants.

use std::path::PathBuf;

/// Alphabet used for opaque share identifiers (url-safe, nanoid-compatible)
pub const SHARE_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Length of generated share identifiers.
/// At 64^10 combinations, collisions are treated as negligible residual
/// risk; there is no detect-and-retry path.
pub const SHARE_ID_LENGTH: usize = 10;

// ===== PDF export defaults =====

/// Default page margin in millimetres
pub const PDF_DEFAULT_MARGIN_MM: f32 = 10.0;
/// Default JPEG quality for embedded images (0.0–1.0)
pub const PDF_DEFAULT_IMAGE_QUALITY: f32 = 0.98;

/// Runtime configuration for the server binary
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Path of the SQLite database holding the user mirror
    pub database_path: PathBuf,
    /// Origin used when building shareable URLs, e.g. "https://notes.example.com"
    pub public_origin: String,
}

impl AppConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("CLOUDNOTES_BIND").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
        let database_path = std::env::var("CLOUDNOTES_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("cloudnotes.db"));
        let public_origin = std::env::var("CLOUDNOTES_ORIGIN")
            .unwrap_or_else(|_| format!("http://{}", bind_addr));

        Self {
            bind_addr,
            database_path,
            public_origin,
        }
    }
}
