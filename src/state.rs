//! Live view-state store
//!
//! Holds the locally mirrored note/tag/notebook sets (kept current by the
//! document store's push subscriptions), the user-selected view parameters,
//! and the derived filtered projection the UI renders.
//!
//! Single-writer model: snapshot callbacks and view-parameter setters both
//! funnel through [`NoteViewStore::mutate`], and every change publishes a
//! complete [`ViewState`] clone on a watch channel so multiple consumers
//! (note list, sidebar counts) observe consistent snapshots.

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::Principal;
use crate::models::{Note, Notebook, NoteFilter, Tag};
use crate::store::{Collection, DocumentStore, OrderBy, QueryDescriptor, Snapshot};

/// A consistent snapshot of everything the note UI renders from
#[derive(Debug, Clone)]
pub struct ViewState {
    pub notes: Vec<Note>,
    pub tags: Vec<Tag>,
    pub notebooks: Vec<Notebook>,
    pub loading: bool,
    pub active_filter: NoteFilter,
    pub active_notebook: Option<String>,
    pub search_term: String,
    /// Set when the corresponding subscription failed; distinguishes
    /// "no data" from "couldn't load"
    pub notes_notice: Option<String>,
    pub tags_notice: Option<String>,
    pub notebooks_notice: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            notes: Vec::new(),
            tags: Vec::new(),
            notebooks: Vec::new(),
            loading: true,
            active_filter: NoteFilter::All,
            active_notebook: None,
            search_term: String::new(),
            notes_notice: None,
            tags_notice: None,
            notebooks_notice: None,
        }
    }
}

impl ViewState {
    /// Derive the filtered note projection.
    ///
    /// Three stages, applied in order per note:
    /// 1. category — all/favorites/trash/tag membership;
    /// 2. notebook — narrows to the active notebook, except in the trash
    ///    view, which shows trashed notes regardless of notebook;
    /// 3. search — case-insensitive substring over title or raw content,
    ///    gated by the prior stages (a note failing them is excluded even
    ///    when the search term matches).
    ///
    /// Ordering is inherited from the upstream subscription (last updated
    /// first) and not re-sorted here.
    pub fn filtered_notes(&self) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|note| {
                let mut passes = match &self.active_filter {
                    NoteFilter::All => !note.is_archived,
                    NoteFilter::Favorites => note.is_favorite && !note.is_archived,
                    NoteFilter::Trash => note.is_archived,
                    NoteFilter::Tag(tag_id) => {
                        !note.is_archived && note.tags.iter().any(|tag| &tag.id == tag_id)
                    }
                };

                if passes
                    && self.active_notebook.is_some()
                    && self.active_filter != NoteFilter::Trash
                {
                    passes = note.notebook_id == self.active_notebook;
                }

                if passes && !self.search_term.is_empty() {
                    let needle = self.search_term.to_lowercase();
                    return note.title.to_lowercase().contains(&needle)
                        || note.content.to_lowercase().contains(&needle);
                }

                passes
            })
            .collect()
    }

    /// Recompute per-tag note counts from the currently loaded note set.
    ///
    /// An approximation, not a global aggregate: it reflects only loaded
    /// notes, and the count does not filter by archived state, so trashed
    /// notes still contribute.
    fn recompute_tag_counts(&mut self) {
        for tag in &mut self.tags {
            let count = self
                .notes
                .iter()
                .filter(|note| note.tags.iter().any(|t| t.id == tag.id))
                .count();
            tag.count = Some(count);
        }
    }
}

/// Owned, single-writer state container with change notification
pub struct NoteViewStore {
    state: Mutex<ViewState>,
    tx: watch::Sender<ViewState>,
}

impl NoteViewStore {
    pub fn new() -> Arc<Self> {
        let initial = ViewState::default();
        let (tx, _) = watch::channel(initial.clone());
        Arc::new(Self {
            state: Mutex::new(initial),
            tx,
        })
    }

    /// Watch channel delivering a full state snapshot on every change
    pub fn watch(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.lock().expect("view state poisoned").clone()
    }

    fn mutate(&self, f: impl FnOnce(&mut ViewState)) {
        let snapshot = {
            let mut state = self.state.lock().expect("view state poisoned");
            f(&mut state);
            state.clone()
        };
        self.tx.send_replace(snapshot);
    }

    // ----- view parameters -----

    pub fn set_filter(&self, filter: NoteFilter) {
        self.mutate(|state| state.active_filter = filter);
    }

    pub fn set_active_notebook(&self, notebook_id: Option<String>) {
        self.mutate(|state| state.active_notebook = notebook_id);
    }

    pub fn set_search_term(&self, term: &str) {
        self.mutate(|state| state.search_term = term.to_string());
    }

    // ----- subscription feeds -----

    fn apply_notes(&self, notes: Vec<Note>) {
        self.mutate(|state| {
            state.notes = notes;
            state.loading = false;
            state.notes_notice = None;
            state.recompute_tag_counts();
        });
    }

    fn apply_tags(&self, tags: Vec<Tag>) {
        self.mutate(|state| {
            state.tags = tags;
            state.tags_notice = None;
            state.recompute_tag_counts();
        });
    }

    fn apply_notebooks(&self, notebooks: Vec<Notebook>) {
        self.mutate(|state| {
            state.notebooks = notebooks;
            state.notebooks_notice = None;
        });
    }

    /// A failed subscription clears its set and the loading flag so the UI
    /// never hangs on a spinner, and records a user-visible notice.
    fn fail_collection(&self, collection: Collection, message: String) {
        tracing::error!("Subscription failed for {}: {}", collection.name(), message);
        self.mutate(|state| {
            match collection {
                Collection::Notes => {
                    state.notes.clear();
                    state.notes_notice = Some(message);
                    state.recompute_tag_counts();
                }
                Collection::Tags => {
                    state.tags.clear();
                    state.tags_notice = Some(message);
                }
                Collection::Notebooks => {
                    state.notebooks.clear();
                    state.notebooks_notice = Some(message);
                }
                Collection::Shares => {}
            }
            state.loading = false;
        });
    }

    /// Principal lost: drop all mirrored data and stop loading
    fn reset(&self) {
        self.mutate(|state| {
            state.notes.clear();
            state.tags.clear();
            state.notebooks.clear();
            state.loading = false;
            state.notes_notice = None;
            state.tags_notice = None;
            state.notebooks_notice = None;
        });
    }

    fn open_subscriptions(
        view: &Arc<Self>,
        store: &Arc<dyn DocumentStore>,
        principal: &Principal,
    ) -> Vec<crate::store::SubscriptionHandle> {
        tracing::info!("Opening live subscriptions for {}", principal.id);
        view.mutate(|state| state.loading = true);

        let notes_query = QueryDescriptor::owned_by(Collection::Notes, &principal.id)
            .order_by(OrderBy::desc("updatedAt"));
        let tags_query = QueryDescriptor::owned_by(Collection::Tags, &principal.id);
        let notebooks_query = QueryDescriptor::owned_by(Collection::Notebooks, &principal.id);

        vec![
            Self::subscribe_typed(view, store, notes_query, NoteViewStore::apply_notes),
            Self::subscribe_typed(view, store, tags_query, NoteViewStore::apply_tags),
            Self::subscribe_typed(view, store, notebooks_query, NoteViewStore::apply_notebooks),
        ]
    }

    fn subscribe_typed<T: DeserializeOwned + 'static>(
        view: &Arc<Self>,
        store: &Arc<dyn DocumentStore>,
        query: QueryDescriptor,
        apply: fn(&NoteViewStore, Vec<T>),
    ) -> crate::store::SubscriptionHandle {
        let collection = query.collection;

        let on_snapshot = {
            let view = Arc::clone(view);
            Arc::new(move |snapshot: Snapshot| {
                let mut items = Vec::with_capacity(snapshot.docs.len());
                for doc in snapshot.docs {
                    match serde_json::from_value::<T>(doc) {
                        Ok(item) => items.push(item),
                        Err(err) => {
                            // Skip malformed documents rather than dropping
                            // the whole snapshot
                            tracing::warn!(
                                "Skipping malformed {} document: {}",
                                collection.name(),
                                err
                            );
                        }
                    }
                }
                apply(&view, items);
            }) as crate::store::SnapshotHandler
        };

        let on_error = {
            let view = Arc::clone(view);
            Arc::new(move |err: crate::error::AppError| {
                view.fail_collection(collection, err.to_string());
            }) as crate::store::ErrorHandler
        };

        store.subscribe(query, on_snapshot, on_error)
    }

    /// Drive the subscription lifecycle from the auth principal channel:
    /// open the three owner-scoped subscriptions when a principal appears,
    /// tear them down and clear local state when it goes away.
    ///
    /// Returns the driver task; dropping the store side of the auth channel
    /// ends it.
    pub fn attach(
        self: Arc<Self>,
        store: Arc<dyn DocumentStore>,
        mut principal_rx: watch::Receiver<Option<Principal>>,
    ) -> JoinHandle<()> {
        let view = self;

        tokio::spawn(async move {
            let mut subscriptions = Vec::new();

            loop {
                let principal = principal_rx.borrow_and_update().clone();

                subscriptions.clear();
                match principal {
                    Some(principal) => {
                        subscriptions = Self::open_subscriptions(&view, &store, &principal);
                    }
                    None => view.reset(),
                }

                if principal_rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
