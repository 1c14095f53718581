//! Document store boundary
//!
//! Persistence and realtime sync are delegated to an external document
//! database. This module defines the capability the rest of the application
//! programs against: owner-scoped live query subscriptions plus point writes
//! and one atomic multi-document batch primitive.
//!
//! [`memory::MemoryStore`] is a complete in-memory implementation with the
//! same push semantics, used by tests and local wiring.

pub mod memory;

pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AppError, Result};

/// Document collections known to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Notes,
    Tags,
    Notebooks,
    Shares,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Notes => "notes",
            Collection::Tags => "tags",
            Collection::Notebooks => "notebooks",
            Collection::Shares => "shares",
        }
    }
}

/// A stored document. Always a JSON object; the store injects the document
/// id under the "id" key on every read and push delivery.
pub type Document = serde_json::Value;

/// Sort direction for an ordered subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering applied by the store before delivering a snapshot
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Descending,
        }
    }
}

/// An owner-scoped live query over one collection
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    pub collection: Collection,
    pub owner_id: String,
    pub order: Option<OrderBy>,
}

impl QueryDescriptor {
    pub fn owned_by(collection: Collection, owner_id: &str) -> Self {
        Self {
            collection,
            owner_id: owner_id.to_string(),
            order: None,
        }
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }
}

/// A point-in-time delivery of a subscribed query's current contents
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub docs: Vec<Document>,
}

pub type SnapshotHandler = Arc<dyn Fn(Snapshot) + Send + Sync>;
pub type ErrorHandler = Arc<dyn Fn(AppError) + Send + Sync>;

/// Detaches the associated subscription when unsubscribed or dropped
pub struct SubscriptionHandle {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

/// One write inside an atomic batch
#[derive(Debug, Clone)]
pub enum BatchWrite {
    /// Merge the given top-level fields into an existing document
    Update {
        collection: Collection,
        id: String,
        patch: Document,
    },
    /// Create or replace a document at a caller-chosen id
    Set {
        collection: Collection,
        id: String,
        doc: Document,
    },
    Delete {
        collection: Collection,
        id: String,
    },
}

/// External document database capability.
///
/// Writes never update local state directly: the authoritative update
/// arrives later through the push subscription (write-then-observe).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open a live subscription. The handler receives the current contents
    /// immediately and again after every committed write that affects the
    /// query. `on_error` marks the subscription as terminally failed.
    fn subscribe(
        &self,
        query: QueryDescriptor,
        on_snapshot: SnapshotHandler,
        on_error: ErrorHandler,
    ) -> SubscriptionHandle;

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>>;

    /// Insert a document under a store-assigned id; returns the new id
    async fn create(&self, collection: Collection, doc: Document) -> Result<String>;

    /// Create or replace a document at a caller-chosen id
    async fn set(&self, collection: Collection, id: &str, doc: Document) -> Result<()>;

    /// Merge top-level fields into an existing document
    async fn update(&self, collection: Collection, id: &str, patch: Document) -> Result<()>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;

    /// Apply every write atomically: either all commit or none do
    async fn commit_batch(&self, writes: Vec<BatchWrite>) -> Result<()>;
}
