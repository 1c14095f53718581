//! Repository layer for the user mirror

use super::models::{NewUser, UserRecord};
use crate::error::Result;
use sqlx::SqlitePool;

/// Repository for mirrored user records
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up a mirrored user by identity-provider uid
    pub async fn get_user_by_uid(&self, uid: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT * FROM users WHERE uid = ?
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Insert a new mirrored user
    pub async fn create_user(&self, new: NewUser) -> Result<UserRecord> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (email, display_name, photo_url, uid)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&new.email)
        .bind(&new.display_name)
        .bind(&new.photo_url)
        .bind(&new.uid)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Mirrored user: {} ({})", user.uid, user.id);
        Ok(user)
    }
}
