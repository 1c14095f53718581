//! Database models
//!
//! Rust structs for the relational user mirror. Serialized field names
//! match the identity provider's profile shape.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Mirrored user profile, keyed by the identity provider's uid
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub uid: String,
}

/// Fields for creating a mirrored user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub uid: String,
}
