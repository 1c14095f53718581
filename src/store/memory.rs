//! In-memory document store
//!
//! Implements the full [`DocumentStore`] contract including live push:
//! every committed write re-evaluates open subscriptions and delivers a
//! fresh snapshot. Used by the test suite and local wiring; semantics match
//! the managed store (owner-scoped queries, merge updates, atomic batches).

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    BatchWrite, Collection, Direction, Document, DocumentStore, ErrorHandler, QueryDescriptor,
    Snapshot, SnapshotHandler, SubscriptionHandle,
};
use crate::error::{AppError, Result};

struct Subscriber {
    id: u64,
    query: QueryDescriptor,
    on_snapshot: SnapshotHandler,
    on_error: ErrorHandler,
    failed: bool,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<Collection, BTreeMap<String, Document>>,
    subscribers: Vec<Subscriber>,
    next_subscriber_id: u64,
}

pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Fault injection for tests: mark every open subscription on the
    /// collection as failed and invoke its error handler.
    pub fn fail_subscriptions(&self, collection: Collection, message: &str) {
        let mut handlers = Vec::new();
        {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            for sub in inner
                .subscribers
                .iter_mut()
                .filter(|s| s.query.collection == collection && !s.failed)
            {
                sub.failed = true;
                handlers.push(Arc::clone(&sub.on_error));
            }
        }
        for handler in handlers {
            handler(AppError::Store(message.to_string()));
        }
    }

    fn require_object(doc: &Document) -> Result<()> {
        if doc.is_object() {
            Ok(())
        } else {
            Err(AppError::Store("document must be a JSON object".to_string()))
        }
    }

    fn evaluate(inner: &Inner, query: &QueryDescriptor) -> Snapshot {
        let mut docs: Vec<Document> = inner
            .collections
            .get(&query.collection)
            .map(|coll| {
                coll.values()
                    .filter(|doc| {
                        doc.get("userId").and_then(|v| v.as_str())
                            == Some(query.owner_id.as_str())
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            docs.sort_by(|a, b| {
                let ordering = compare_fields(a.get(&order.field), b.get(&order.field));
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        Snapshot { docs }
    }

    /// Deliver fresh snapshots to every live subscriber of the collection.
    /// Handlers run outside the lock so they may call back into the store.
    fn notify(inner: &Arc<Mutex<Inner>>, collection: Collection) {
        let deliveries: Vec<(SnapshotHandler, Snapshot)> = {
            let guard = inner.lock().expect("store lock poisoned");
            guard
                .subscribers
                .iter()
                .filter(|s| s.query.collection == collection && !s.failed)
                .map(|s| (Arc::clone(&s.on_snapshot), Self::evaluate(&guard, &s.query)))
                .collect()
        };
        for (handler, snapshot) in deliveries {
            handler(snapshot);
        }
    }

    fn apply(inner: &mut Inner, write: &BatchWrite) {
        match write {
            BatchWrite::Set { collection, id, doc } => {
                let mut doc = doc.clone();
                doc["id"] = serde_json::Value::String(id.clone());
                inner
                    .collections
                    .entry(*collection)
                    .or_default()
                    .insert(id.clone(), doc);
            }
            BatchWrite::Update {
                collection,
                id,
                patch,
            } => {
                // Targets were validated before apply
                if let Some(existing) = inner
                    .collections
                    .entry(*collection)
                    .or_default()
                    .get_mut(id)
                {
                    if let (Some(target), Some(fields)) =
                        (existing.as_object_mut(), patch.as_object())
                    {
                        for (key, value) in fields {
                            target.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            BatchWrite::Delete { collection, id } => {
                if let Some(coll) = inner.collections.get_mut(collection) {
                    coll.remove(id);
                }
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare two document field values for ordering. Timestamp strings are
/// compared chronologically; everything else falls back to string or
/// numeric comparison.
fn compare_fields(a: Option<&Document>, b: Option<&Document>) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let (a, b) = match (a, b) {
        (Some(a), Some(b)) => (a, b),
        (Some(_), None) => return Ordering::Greater,
        (None, Some(_)) => return Ordering::Less,
        (None, None) => return Ordering::Equal,
    };

    if let (Some(ta), Some(tb)) = (parse_timestamp(a), parse_timestamp(b)) {
        return ta.cmp(&tb);
    }

    match (a, b) {
        (Document::String(a), Document::String(b)) => a.cmp(b),
        (Document::Number(a), Document::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

fn parse_timestamp(value: &Document) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn subscribe(
        &self,
        query: QueryDescriptor,
        on_snapshot: SnapshotHandler,
        on_error: ErrorHandler,
    ) -> SubscriptionHandle {
        let (subscriber_id, initial) = {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            let subscriber_id = inner.next_subscriber_id;
            inner.next_subscriber_id += 1;

            let initial = Self::evaluate(&inner, &query);
            inner.subscribers.push(Subscriber {
                id: subscriber_id,
                query,
                on_snapshot: Arc::clone(&on_snapshot),
                on_error,
                failed: false,
            });
            (subscriber_id, initial)
        };

        // Initial delivery of current contents
        on_snapshot(initial);

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        SubscriptionHandle::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut inner = inner.lock().expect("store lock poisoned");
                inner.subscribers.retain(|s| s.id != subscriber_id);
            }
        })
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .collections
            .get(&collection)
            .and_then(|coll| coll.get(id))
            .cloned())
    }

    async fn create(&self, collection: Collection, doc: Document) -> Result<String> {
        Self::require_object(&doc)?;
        let id = Uuid::new_v4().to_string();

        {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            Self::apply(
                &mut inner,
                &BatchWrite::Set {
                    collection,
                    id: id.clone(),
                    doc,
                },
            );
        }

        Self::notify(&self.inner, collection);
        tracing::debug!("Created {}/{}", collection.name(), id);
        Ok(id)
    }

    async fn set(&self, collection: Collection, id: &str, doc: Document) -> Result<()> {
        Self::require_object(&doc)?;

        {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            Self::apply(
                &mut inner,
                &BatchWrite::Set {
                    collection,
                    id: id.to_string(),
                    doc,
                },
            );
        }

        Self::notify(&self.inner, collection);
        Ok(())
    }

    async fn update(&self, collection: Collection, id: &str, patch: Document) -> Result<()> {
        Self::require_object(&patch)?;

        {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            let exists = inner
                .collections
                .get(&collection)
                .map_or(false, |coll| coll.contains_key(id));
            if !exists {
                return Err(AppError::NotFound(format!(
                    "{}/{}",
                    collection.name(),
                    id
                )));
            }
            Self::apply(
                &mut inner,
                &BatchWrite::Update {
                    collection,
                    id: id.to_string(),
                    patch,
                },
            );
        }

        Self::notify(&self.inner, collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            Self::apply(
                &mut inner,
                &BatchWrite::Delete {
                    collection,
                    id: id.to_string(),
                },
            );
        }

        Self::notify(&self.inner, collection);
        tracing::debug!("Deleted {}/{}", collection.name(), id);
        Ok(())
    }

    async fn commit_batch(&self, writes: Vec<BatchWrite>) -> Result<()> {
        let mut touched: Vec<Collection> = Vec::new();

        {
            let mut inner = self.inner.lock().expect("store lock poisoned");

            // Validate every write before touching anything so the batch
            // is all-or-nothing.
            for write in &writes {
                match write {
                    BatchWrite::Set { doc, .. } => Self::require_object(doc)?,
                    BatchWrite::Update { patch, .. } => Self::require_object(patch)?,
                    BatchWrite::Delete { .. } => {}
                }
                if let BatchWrite::Update { collection, id, .. } = write {
                    let exists = inner
                        .collections
                        .get(collection)
                        .map_or(false, |coll| coll.contains_key(id));
                    if !exists {
                        return Err(AppError::NotFound(format!(
                            "{}/{}",
                            collection.name(),
                            id
                        )));
                    }
                }
            }

            for write in &writes {
                let collection = match write {
                    BatchWrite::Set { collection, .. }
                    | BatchWrite::Update { collection, .. }
                    | BatchWrite::Delete { collection, .. } => *collection,
                };
                if !touched.contains(&collection) {
                    touched.push(collection);
                }
                Self::apply(&mut inner, write);
            }
        }

        for collection in touched {
            Self::notify(&self.inner, collection);
        }

        tracing::debug!("Committed batch of {} writes", writes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::store::OrderBy;

    fn doc(owner: &str, title: &str, updated_at: &str) -> Document {
        serde_json::json!({
            "userId": owner,
            "title": title,
            "updatedAt": updated_at,
        })
    }

    #[tokio::test]
    async fn test_create_and_get_injects_id() {
        let store = MemoryStore::new();

        let id = store
            .create(Collection::Notes, doc("u1", "A", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();

        let fetched = store.get(Collection::Notes, &id).await.unwrap().unwrap();
        assert_eq!(fetched["id"], id.as_str());
        assert_eq!(fetched["title"], "A");
    }

    #[tokio::test]
    async fn test_subscription_pushes_on_every_write() {
        let store = MemoryStore::new();
        let deliveries = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&deliveries);
        let _sub = store.subscribe(
            QueryDescriptor::owned_by(Collection::Notes, "u1"),
            Arc::new(move |_snapshot| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            Arc::new(|_err| {}),
        );

        // Initial snapshot delivered on subscribe
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);

        store
            .create(Collection::Notes, doc("u1", "A", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(deliveries.load(Ordering::SeqCst), 2);

        // Writes by other owners still trigger re-evaluation of the
        // collection, but never leak into the snapshot contents
        store
            .create(Collection::Notes, doc("u2", "B", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscription_scoped_to_owner() {
        let store = MemoryStore::new();
        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));

        store
            .create(Collection::Notes, doc("u1", "Mine", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        store
            .create(
                Collection::Notes,
                doc("u2", "Theirs", "2026-01-01T00:00:00Z"),
            )
            .await
            .unwrap();

        let sink = Arc::clone(&seen);
        let _sub = store.subscribe(
            QueryDescriptor::owned_by(Collection::Notes, "u1"),
            Arc::new(move |snapshot| {
                sink.lock().unwrap().push(snapshot.docs.len());
            }),
            Arc::new(|_err| {}),
        );

        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_ordered_snapshot_newest_first() {
        let store = MemoryStore::new();

        store
            .create(Collection::Notes, doc("u1", "old", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        store
            .create(Collection::Notes, doc("u1", "new", "2026-06-01T00:00:00Z"))
            .await
            .unwrap();

        let titles: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&titles);
        let _sub = store.subscribe(
            QueryDescriptor::owned_by(Collection::Notes, "u1")
                .order_by(OrderBy::desc("updatedAt")),
            Arc::new(move |snapshot| {
                let mut sink = sink.lock().unwrap();
                sink.clear();
                sink.extend(
                    snapshot
                        .docs
                        .iter()
                        .map(|d| d["title"].as_str().unwrap().to_string()),
                );
            }),
            Arc::new(|_err| {}),
        );

        assert_eq!(*titles.lock().unwrap(), vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        let id = store
            .create(Collection::Notes, doc("u1", "A", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();

        store
            .update(
                Collection::Notes,
                &id,
                serde_json::json!({ "title": "B", "isFavorite": true }),
            )
            .await
            .unwrap();

        let fetched = store.get(Collection::Notes, &id).await.unwrap().unwrap();
        assert_eq!(fetched["title"], "B");
        assert_eq!(fetched["isFavorite"], true);
        // Untouched fields survive the merge
        assert_eq!(fetched["userId"], "u1");
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = MemoryStore::new();
        let result = store
            .update(Collection::Notes, "nope", serde_json::json!({ "title": "B" }))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = MemoryStore::new();
        let id = store
            .create(Collection::Notes, doc("u1", "A", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();

        let result = store
            .commit_batch(vec![
                BatchWrite::Update {
                    collection: Collection::Notes,
                    id: id.clone(),
                    patch: serde_json::json!({ "title": "changed" }),
                },
                BatchWrite::Update {
                    collection: Collection::Notes,
                    id: "missing".to_string(),
                    patch: serde_json::json!({ "title": "x" }),
                },
            ])
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));

        // First write must not have been applied
        let fetched = store.get(Collection::Notes, &id).await.unwrap().unwrap();
        assert_eq!(fetched["title"], "A");
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_deliveries() {
        let store = MemoryStore::new();
        let deliveries = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&deliveries);
        let sub = store.subscribe(
            QueryDescriptor::owned_by(Collection::Notes, "u1"),
            Arc::new(move |_snapshot| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            Arc::new(|_err| {}),
        );

        sub.unsubscribe();

        store
            .create(Collection::Notes, doc("u1", "A", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fail_subscriptions_invokes_error_handler() {
        let store = MemoryStore::new();
        let errored = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&errored);
        let _sub = store.subscribe(
            QueryDescriptor::owned_by(Collection::Tags, "u1"),
            Arc::new(|_snapshot| {}),
            Arc::new(move |_err| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        store.fail_subscriptions(Collection::Tags, "listen channel closed");
        assert_eq!(errored.load(Ordering::SeqCst), 1);

        // A failed subscription receives no further snapshots
        store
            .create(Collection::Tags, serde_json::json!({ "userId": "u1", "name": "t" }))
            .await
            .unwrap();
    }
}
