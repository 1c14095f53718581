//! Share token service
//!
//! Shares are denormalized snapshots: the record written at share time
//! carries its own copy of title, content, and tags, so later edits to the
//! source note do not propagate. One note may carry several concurrent
//! shares.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::json;

use crate::config::{SHARE_ID_ALPHABET, SHARE_ID_LENGTH};
use crate::error::{AppError, Result};
use crate::models::{Note, Share, ShareAccess, SharedNote, ShareInfo, ShareOptions};
use crate::store::{Collection, DocumentStore};

/// Service for creating and resolving note shares
#[derive(Clone)]
pub struct SharesService {
    store: Arc<dyn DocumentStore>,
    /// Origin used for shareable URLs, e.g. "https://notes.example.com"
    origin: String,
}

/// Generate an opaque share identifier.
///
/// 10 characters over a 64-symbol url-safe alphabet; collisions are
/// negligible at this length and are not detected or retried.
fn generate_share_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SHARE_ID_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..SHARE_ID_ALPHABET.len());
            SHARE_ID_ALPHABET[idx] as char
        })
        .collect()
}

impl SharesService {
    pub fn new(store: Arc<dyn DocumentStore>, origin: &str) -> Self {
        Self {
            store,
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    /// Create a share for a note.
    ///
    /// Writes the share record first, then appends the identifier to the
    /// note's share-id set and stamps lastSharedAt. The two writes are
    /// intentionally separate, matching the store's write model.
    pub async fn share_note(
        &self,
        note: &Note,
        owner_id: &str,
        options: ShareOptions,
    ) -> Result<ShareInfo> {
        let share_id = generate_share_id();
        let now = Utc::now();

        let expires_at = options
            .expires_after_ms
            .map(|ms| now + Duration::milliseconds(ms));
        let is_public = options.is_public.unwrap_or(true);
        let allow_edit = options.allow_edit.unwrap_or(false);

        let share = Share {
            share_id: share_id.clone(),
            note_id: note.id.clone(),
            user_id: owner_id.to_string(),
            title: note.title.clone(),
            content: note.content.clone(),
            tags: note.tags.clone(),
            created_at: now,
            expires_at,
            is_public,
            allow_edit,
            view_count: 0,
            last_viewed_at: None,
            notebook_id: note.notebook_id.clone(),
            deleted: false,
            deleted_at: None,
        };

        self.store
            .set(Collection::Shares, &share_id, serde_json::to_value(&share)?)
            .await?;

        // Separate write: record the share on the source note
        let note_doc = self
            .store
            .get(Collection::Notes, &note.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("note {}", note.id)))?;
        let stored: Note = serde_json::from_value(note_doc)?;

        let mut share_ids = stored.share_ids;
        if !share_ids.contains(&share_id) {
            share_ids.push(share_id.clone());
        }
        self.store
            .update(
                Collection::Notes,
                &note.id,
                json!({ "shareIds": share_ids, "lastSharedAt": now }),
            )
            .await?;

        tracing::info!("Shared note {} as {}", note.id, share_id);

        Ok(ShareInfo {
            share_url: format!("{}/shared/{}", self.origin, share_id),
            share_id,
            created_at: now,
            expires_at,
            is_public,
            allow_edit,
            created_by: owner_id.to_string(),
        })
    }

    /// Resolve a share identifier to its note snapshot.
    ///
    /// Returns None for unknown identifiers and for expired shares alike:
    /// a reader cannot tell whether an expired share ever existed. The
    /// expiry boundary is inclusive (expiresAt == now is already expired).
    /// Each successful read increments the view counter.
    pub async fn get_shared_note(&self, share_id: &str) -> Result<Option<SharedNote>> {
        let doc = match self.store.get(Collection::Shares, share_id).await? {
            Some(doc) => doc,
            None => return Ok(None),
        };
        let share: Share = serde_json::from_value(doc)?;

        if let Some(expires_at) = share.expires_at {
            if expires_at <= Utc::now() {
                tracing::debug!("Share {} expired at {}", share_id, expires_at);
                return Ok(None);
            }
        }

        let view_count = share.view_count + 1;
        self.store
            .update(
                Collection::Shares,
                share_id,
                json!({ "viewCount": view_count, "lastViewedAt": Utc::now() }),
            )
            .await?;

        let note = Note {
            id: share.note_id,
            title: share.title,
            content: share.content,
            created_at: share.created_at,
            // The snapshot was written once; its creation time doubles as
            // the last-update time
            updated_at: share.created_at,
            tags: share.tags,
            is_favorite: false,
            is_archived: false,
            notebook_id: share.notebook_id,
            share_ids: Vec::new(),
            last_shared_at: None,
            user_id: share.user_id.clone(),
        };

        Ok(Some(SharedNote {
            note,
            share_info: ShareAccess {
                share_id: share_id.to_string(),
                is_public: share.is_public,
                allow_edit: share.allow_edit,
                created_by: share.user_id,
                view_count,
            },
        }))
    }

    /// Soft-invalidate a share.
    ///
    /// The record is retained with a deleted marker; the identifier is
    /// removed from the source note's share-id set so the share is no
    /// longer discoverable from the note. If the note itself is gone, that
    /// second step is skipped silently.
    pub async fn delete_share(
        &self,
        share_id: &str,
        note_id: &str,
        requester_id: &str,
    ) -> Result<()> {
        let doc = self
            .store
            .get(Collection::Shares, share_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("share {}", share_id)))?;
        let share: Share = serde_json::from_value(doc)?;

        if share.user_id != requester_id {
            return Err(AppError::Unauthorized(
                "only the share owner can delete it".to_string(),
            ));
        }

        self.store
            .update(
                Collection::Shares,
                share_id,
                json!({ "deleted": true, "deletedAt": Utc::now() }),
            )
            .await?;

        if let Some(note_doc) = self.store.get(Collection::Notes, note_id).await? {
            let note: Note = serde_json::from_value(note_doc)?;
            let share_ids: Vec<String> = note
                .share_ids
                .into_iter()
                .filter(|id| id != share_id)
                .collect();
            self.store
                .update(Collection::Notes, note_id, json!({ "shareIds": share_ids }))
                .await?;
        }

        tracing::info!("Share {} invalidated", share_id);
        Ok(())
    }
}
