//! Domain models
//!
//! Entities mirrored from the document store. Wire names are camelCase to
//! match the store's document schema, so every struct round-trips through
//! serde_json unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag colors supported by the UI. Unknown colors coming off the wire are
/// mapped to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TagColor {
    Blue,
    Purple,
    #[default]
    #[serde(other)]
    Green,
}

/// A label attached to notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: TagColor,
    /// Number of loaded notes referencing this tag. Recomputed client-side
    /// from the current note set; never persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// A note with rich-text markup content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub is_favorite: bool,
    /// Archived means "in trash". Independent of is_favorite: a trashed note
    /// keeps its favorite flag so restore brings it back intact.
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notebook_id: Option<String>,
    /// Identifiers of active shares for this note
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub share_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_shared_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: String,
}

/// Fields for creating a note
#[derive(Debug, Clone, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub tags: Vec<Tag>,
    pub notebook_id: Option<String>,
}

/// Partial update of a note. `notebook_id` is double-optional: the outer
/// None leaves the reference untouched, Some(None) clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<Tag>>,
    pub is_favorite: Option<bool>,
    pub notebook_id: Option<Option<String>>,
}

/// A notebook groups notes without owning them: notes hold a weak
/// back-reference, so deleting a notebook never deletes its notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: String,
}

/// Fields for creating a notebook
#[derive(Debug, Clone, Deserialize)]
pub struct NewNotebook {
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub icon: String,
}

/// Partial update of a notebook
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotebookUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Persisted share record: a denormalized snapshot of the note at share
/// time. Edits to the source note do not propagate here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub share_id: String,
    pub note_id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_public: bool,
    pub allow_edit: bool,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_viewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notebook_id: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Options for creating a share
#[derive(Debug, Clone, Default)]
pub struct ShareOptions {
    /// Milliseconds until the share expires; None means it never expires
    pub expires_after_ms: Option<i64>,
    /// Whether anyone with the link can read the note (default true)
    pub is_public: Option<bool>,
    /// Whether the shared note can be edited (default false)
    pub allow_edit: Option<bool>,
}

/// Metadata returned to the sharer after creating a share
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareInfo {
    pub share_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_public: bool,
    pub allow_edit: bool,
    pub created_by: String,
    pub share_url: String,
}

/// Share metadata attached to a resolved shared note
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareAccess {
    pub share_id: String,
    pub is_public: bool,
    pub allow_edit: bool,
    pub created_by: String,
    pub view_count: u64,
}

/// Read-only projection of a shared note, built from the share-time
/// snapshot rather than the live note.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedNote {
    #[serde(flatten)]
    pub note: Note,
    pub share_info: ShareAccess,
}

/// Category filter applied to the note list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NoteFilter {
    #[default]
    All,
    Favorites,
    Trash,
    Tag(String),
}

impl NoteFilter {
    /// Parse the UI filter string ("all", "favorites", "trash", "tag:<id>").
    /// Unrecognized input falls back to All.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "favorites" => NoteFilter::Favorites,
            "trash" => NoteFilter::Trash,
            other => match other.strip_prefix("tag:") {
                Some(id) if !id.is_empty() => NoteFilter::Tag(id.to_string()),
                _ => NoteFilter::All,
            },
        }
    }
}

impl std::fmt::Display for NoteFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoteFilter::All => write!(f, "all"),
            NoteFilter::Favorites => write!(f, "favorites"),
            NoteFilter::Trash => write!(f, "trash"),
            NoteFilter::Tag(id) => write!(f, "tag:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parse() {
        assert_eq!(NoteFilter::parse("all"), NoteFilter::All);
        assert_eq!(NoteFilter::parse("favorites"), NoteFilter::Favorites);
        assert_eq!(NoteFilter::parse("trash"), NoteFilter::Trash);
        assert_eq!(
            NoteFilter::parse("tag:t1"),
            NoteFilter::Tag("t1".to_string())
        );
        assert_eq!(NoteFilter::parse("tag:"), NoteFilter::All);
        assert_eq!(NoteFilter::parse("bogus"), NoteFilter::All);
    }

    #[test]
    fn test_filter_roundtrip_display() {
        for raw in ["all", "favorites", "trash", "tag:abc"] {
            assert_eq!(NoteFilter::parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_tag_color_unknown_maps_to_default() {
        let tag: Tag =
            serde_json::from_str(r#"{"id":"t1","name":"work","color":"chartreuse"}"#).unwrap();
        assert_eq!(tag.color, TagColor::Green);

        let tag: Tag = serde_json::from_str(r#"{"id":"t2","name":"home","color":"purple"}"#).unwrap();
        assert_eq!(tag.color, TagColor::Purple);
    }

    #[test]
    fn test_note_wire_names_are_camel_case() {
        let now = Utc::now();
        let note = Note {
            id: "n1".to_string(),
            title: "Trip Plan".to_string(),
            content: "<p>pack</p>".to_string(),
            created_at: now,
            updated_at: now,
            tags: vec![],
            is_favorite: true,
            is_archived: false,
            notebook_id: Some("nb1".to_string()),
            share_ids: vec![],
            last_shared_at: None,
            user_id: "u1".to_string(),
        };

        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["isFavorite"], true);
        assert_eq!(value["notebookId"], "nb1");
        assert!(value.get("is_favorite").is_none());
    }
}
