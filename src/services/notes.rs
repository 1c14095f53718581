//! Notes service
//!
//! Note repository facade: all note and tag writes go through here. Writes
//! never mutate local view state; the authoritative update arrives through
//! the push subscription afterwards.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::auth::AuthSession;
use crate::error::{AppError, Result};
use crate::models::{NewNote, Note, NoteUpdate, TagColor};
use crate::store::{Collection, DocumentStore};

/// Service for note lifecycle operations
#[derive(Clone)]
pub struct NotesService {
    store: Arc<dyn DocumentStore>,
    auth: AuthSession,
}

impl NotesService {
    pub fn new(store: Arc<dyn DocumentStore>, auth: AuthSession) -> Self {
        Self { store, auth }
    }

    /// Create a new note; returns the new note id
    pub async fn create_note(&self, new: NewNote) -> Result<String> {
        let principal = self.auth.require_principal()?;

        if new.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".to_string()));
        }

        tracing::info!("Creating new note: {}", new.title);

        let now = Utc::now();
        let note = Note {
            id: String::new(),
            title: new.title,
            content: new.content,
            created_at: now,
            updated_at: now,
            tags: new.tags,
            is_favorite: false,
            is_archived: false,
            notebook_id: new.notebook_id,
            share_ids: Vec::new(),
            last_shared_at: None,
            user_id: principal.id,
        };

        let doc = serde_json::to_value(&note)?;
        let id = self
            .store
            .create(Collection::Notes, doc)
            .await
            .map_err(|err| self.surface("create note", err))?;

        tracing::info!("Note created successfully: {}", id);
        Ok(id)
    }

    /// Partial update of a note; bumps the update timestamp
    pub async fn update_note(&self, id: &str, update: NoteUpdate) -> Result<()> {
        self.auth.require_principal()?;
        tracing::debug!("Updating note: {}", id);

        let mut patch = serde_json::Map::new();
        patch.insert("updatedAt".to_string(), json!(Utc::now()));

        if let Some(title) = update.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("title is required".to_string()));
            }
            patch.insert("title".to_string(), json!(title));
        }
        if let Some(content) = update.content {
            patch.insert("content".to_string(), json!(content));
        }
        if let Some(tags) = update.tags {
            patch.insert("tags".to_string(), serde_json::to_value(tags)?);
        }
        if let Some(is_favorite) = update.is_favorite {
            patch.insert("isFavorite".to_string(), json!(is_favorite));
        }
        if let Some(notebook_id) = update.notebook_id {
            patch.insert("notebookId".to_string(), json!(notebook_id));
        }

        self.store
            .update(Collection::Notes, id, patch.into())
            .await
            .map_err(|err| self.surface("update note", err))?;

        tracing::debug!("Note updated successfully: {}", id);
        Ok(())
    }

    /// Move a note to trash (soft delete)
    pub async fn delete_note(&self, id: &str) -> Result<()> {
        self.auth.require_principal()?;
        tracing::info!("Archiving note: {}", id);

        self.store
            .update(
                Collection::Notes,
                id,
                json!({ "isArchived": true, "updatedAt": Utc::now() }),
            )
            .await
            .map_err(|err| self.surface("archive note", err))
    }

    /// Bring a trashed note back; its favorite flag is untouched
    pub async fn restore_note(&self, id: &str) -> Result<()> {
        self.auth.require_principal()?;
        tracing::info!("Restoring note: {}", id);

        self.store
            .update(
                Collection::Notes,
                id,
                json!({ "isArchived": false, "updatedAt": Utc::now() }),
            )
            .await
            .map_err(|err| self.surface("restore note", err))
    }

    /// Irreversibly remove a note. Only reachable from the trash view.
    pub async fn permanently_delete_note(&self, id: &str) -> Result<()> {
        self.auth.require_principal()?;
        tracing::info!("Permanently deleting note: {}", id);

        self.store
            .delete(Collection::Notes, id)
            .await
            .map_err(|err| self.surface("permanently delete note", err))
    }

    /// Flip the favorite flag; returns the new value
    pub async fn toggle_favorite(&self, id: &str) -> Result<bool> {
        self.auth.require_principal()?;

        let doc = self
            .store
            .get(Collection::Notes, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("note {}", id)))?;
        let note: Note = serde_json::from_value(doc)?;

        let next = !note.is_favorite;
        self.store
            .update(
                Collection::Notes,
                id,
                json!({ "isFavorite": next, "updatedAt": Utc::now() }),
            )
            .await
            .map_err(|err| self.surface("toggle favorite", err))?;

        tracing::debug!("Note {} favorite -> {}", id, next);
        Ok(next)
    }

    /// Create a tag; returns the new tag id. Tags are never deleted
    /// automatically, even when no note references them.
    pub async fn create_tag(&self, name: &str, color: TagColor) -> Result<String> {
        let principal = self.auth.require_principal()?;

        if name.trim().is_empty() {
            return Err(AppError::Validation("tag name is required".to_string()));
        }

        let doc = json!({
            "name": name,
            "color": color,
            "userId": principal.id,
        });

        let id = self
            .store
            .create(Collection::Tags, doc)
            .await
            .map_err(|err| self.surface("create tag", err))?;

        tracing::info!("Tag created: {} ({})", name, id);
        Ok(id)
    }

    /// Write failures are surfaced here (the UI shows them as transient
    /// notifications) and returned so callers keep their editing state.
    fn surface(&self, operation: &str, err: AppError) -> AppError {
        tracing::error!("Failed to {}: {}", operation, err);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{IdentityProvider, LocalIdentityProvider};
    use crate::store::MemoryStore;

    async fn signed_in_service() -> (NotesService, Arc<MemoryStore>) {
        let provider = LocalIdentityProvider::new();
        provider
            .register_with_password("Tester", "t@example.com", "pw")
            .await
            .unwrap();

        let store = Arc::new(MemoryStore::new());
        let service = NotesService::new(store.clone() as Arc<dyn DocumentStore>, provider.session());
        (service, store)
    }

    fn new_note(title: &str) -> NewNote {
        NewNote {
            title: title.to_string(),
            content: "<p>hello</p>".to_string(),
            tags: Vec::new(),
            notebook_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_requires_principal() {
        let provider = LocalIdentityProvider::new();
        let store = Arc::new(MemoryStore::new());
        let service = NotesService::new(store as Arc<dyn DocumentStore>, provider.session());

        let result = service.create_note(new_note("Test")).await;
        assert!(matches!(result, Err(AppError::AuthRequired)));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let (service, _store) = signed_in_service().await;
        let result = service.create_note(new_note("   ")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_and_fetch_note() {
        let (service, store) = signed_in_service().await;

        let id = service.create_note(new_note("Test")).await.unwrap();

        let doc = store.get(Collection::Notes, &id).await.unwrap().unwrap();
        let note: Note = serde_json::from_value(doc).unwrap();
        assert_eq!(note.title, "Test");
        assert!(!note.is_favorite);
        assert!(!note.is_archived);
    }

    #[tokio::test]
    async fn test_toggle_favorite_twice_is_idempotent() {
        let (service, store) = signed_in_service().await;
        let id = service.create_note(new_note("Test")).await.unwrap();

        assert!(service.toggle_favorite(&id).await.unwrap());
        assert!(!service.toggle_favorite(&id).await.unwrap());

        let doc = store.get(Collection::Notes, &id).await.unwrap().unwrap();
        let note: Note = serde_json::from_value(doc).unwrap();
        assert!(!note.is_favorite);
    }

    #[tokio::test]
    async fn test_archive_restore_preserves_favorite() {
        let (service, store) = signed_in_service().await;
        let id = service.create_note(new_note("Test")).await.unwrap();
        service.toggle_favorite(&id).await.unwrap();

        service.delete_note(&id).await.unwrap();
        let doc = store.get(Collection::Notes, &id).await.unwrap().unwrap();
        let note: Note = serde_json::from_value(doc).unwrap();
        assert!(note.is_archived);
        assert!(note.is_favorite);

        service.restore_note(&id).await.unwrap();
        let doc = store.get(Collection::Notes, &id).await.unwrap().unwrap();
        let note: Note = serde_json::from_value(doc).unwrap();
        assert!(!note.is_archived);
        assert!(note.is_favorite);
    }

    #[tokio::test]
    async fn test_permanent_delete_removes_document() {
        let (service, store) = signed_in_service().await;
        let id = service.create_note(new_note("Test")).await.unwrap();

        service.permanently_delete_note(&id).await.unwrap();
        assert!(store.get(Collection::Notes, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_note_is_not_found() {
        let (service, _store) = signed_in_service().await;
        let result = service
            .update_note("missing", NoteUpdate::default())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
