//! Notebooks service
//!
//! Notebook lifecycle. Notebooks never own notes: deleting one rewrites its
//! non-archived member notes to clear the back-reference (one atomic batch)
//! before the notebook record itself is removed.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::auth::AuthSession;
use crate::error::{AppError, Result};
use crate::models::{NewNotebook, NotebookUpdate};
use crate::state::NoteViewStore;
use crate::store::{BatchWrite, Collection, DocumentStore};

/// Service for notebook lifecycle operations
#[derive(Clone)]
pub struct NotebooksService {
    store: Arc<dyn DocumentStore>,
    auth: AuthSession,
    view: Arc<NoteViewStore>,
}

impl NotebooksService {
    pub fn new(store: Arc<dyn DocumentStore>, auth: AuthSession, view: Arc<NoteViewStore>) -> Self {
        Self { store, auth, view }
    }

    /// Create a notebook owned by the current principal; returns its id
    pub async fn create_notebook(&self, new: NewNotebook) -> Result<String> {
        let principal = self.auth.require_principal()?;

        if new.name.trim().is_empty() {
            return Err(AppError::Validation("notebook name is required".to_string()));
        }

        let now = Utc::now();
        let doc = json!({
            "name": new.name,
            "description": new.description,
            "color": new.color,
            "icon": new.icon,
            "createdAt": now,
            "updatedAt": now,
            "userId": principal.id,
        });

        let id = self
            .store
            .create(Collection::Notebooks, doc)
            .await
            .map_err(|err| surface("create notebook", err))?;

        tracing::info!("Notebook created: {}", id);
        Ok(id)
    }

    /// Partial update; bumps the notebook's update timestamp
    pub async fn update_notebook(&self, id: &str, update: NotebookUpdate) -> Result<()> {
        self.auth.require_principal()?;

        let mut patch = serde_json::Map::new();
        patch.insert("updatedAt".to_string(), json!(Utc::now()));

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("notebook name is required".to_string()));
            }
            patch.insert("name".to_string(), json!(name));
        }
        if let Some(description) = update.description {
            patch.insert("description".to_string(), json!(description));
        }
        if let Some(color) = update.color {
            patch.insert("color".to_string(), json!(color));
        }
        if let Some(icon) = update.icon {
            patch.insert("icon".to_string(), json!(icon));
        }

        self.store
            .update(Collection::Notebooks, id, patch.into())
            .await
            .map_err(|err| surface("update notebook", err))?;

        tracing::debug!("Notebook updated: {}", id);
        Ok(())
    }

    /// Delete a notebook.
    ///
    /// Cascade first: every non-archived loaded note referencing the
    /// notebook has its reference cleared in one atomic batch. Trashed
    /// notes keep their stale reference. The notebook record is deleted
    /// only after the batch commits; a failed batch aborts the whole
    /// operation.
    pub async fn delete_notebook(&self, id: &str) -> Result<()> {
        self.auth.require_principal()?;
        tracing::info!("Deleting notebook: {}", id);

        let members: Vec<String> = self
            .view
            .snapshot()
            .notes
            .iter()
            .filter(|note| note.notebook_id.as_deref() == Some(id) && !note.is_archived)
            .map(|note| note.id.clone())
            .collect();

        if !members.is_empty() {
            tracing::debug!(
                "Clearing notebook reference on {} member notes",
                members.len()
            );

            let now = Utc::now();
            let writes = members
                .into_iter()
                .map(|note_id| BatchWrite::Update {
                    collection: Collection::Notes,
                    id: note_id,
                    patch: json!({ "notebookId": null, "updatedAt": now }),
                })
                .collect();

            self.store
                .commit_batch(writes)
                .await
                .map_err(|err| surface("orphan notebook members", err))?;
        }

        self.store
            .delete(Collection::Notebooks, id)
            .await
            .map_err(|err| surface("delete notebook", err))?;

        tracing::info!("Notebook deleted: {}", id);
        Ok(())
    }

    /// Reassign a note to another notebook, or to none
    pub async fn move_note_to_notebook(
        &self,
        note_id: &str,
        notebook_id: Option<&str>,
    ) -> Result<()> {
        self.auth.require_principal()?;

        self.store
            .update(
                Collection::Notes,
                note_id,
                json!({ "notebookId": notebook_id, "updatedAt": Utc::now() }),
            )
            .await
            .map_err(|err| surface("move note", err))?;

        tracing::debug!("Note {} moved to notebook {:?}", note_id, notebook_id);
        Ok(())
    }
}

/// Log the failure (surfaced to the user as a notification) and pass it
/// back to the caller. PermissionDenied gets its own message so the user
/// sees the remediation hint rather than a generic failure.
fn surface(operation: &str, err: AppError) -> AppError {
    match &err {
        AppError::PermissionDenied(detail) => {
            tracing::error!("Permission denied while trying to {}: {}", operation, detail);
        }
        other => {
            tracing::error!("Failed to {}: {}", operation, other);
        }
    }
    err
}
