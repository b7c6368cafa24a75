//! Document store contract
//!
//! The engine needs three primitives from durable storage: an atomic
//! read-modify-write on one document, an atomic batch over several documents,
//! and a change feed. Appends to `timeline` and `payments` are expressed as a
//! read-modify-write, so two concurrent appends are serialized by the store
//! and neither is lost.

use crate::core::error::WorkflowError;
use crate::core::events::OrderChange;
use crate::core::order::Order;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// A document together with the store revision of its last write
#[derive(Debug, Clone, PartialEq)]
pub struct StoredOrder {
    pub order: Order,
    pub revision: u64,
}

/// Pure function from the current document to its replacement
///
/// Runs while the store holds the document, so it must not block. Returning
/// an error aborts the write.
pub type Mutation = Box<dyn FnOnce(&Order) -> Result<Order, WorkflowError> + Send>;

/// Mutation applied to each document of a batch; `None` leaves it unchanged
pub type BatchMutation = Arc<dyn Fn(&Order) -> Result<Option<Order>, WorkflowError> + Send + Sync>;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new document
    async fn insert(&self, order: Order) -> Result<StoredOrder, WorkflowError>;

    async fn get(&self, id: &Uuid) -> Result<Option<StoredOrder>, WorkflowError>;

    /// Every document, in no particular order
    async fn list(&self) -> Result<Vec<StoredOrder>, WorkflowError>;

    /// Atomically replace one document with `mutation(current)`
    ///
    /// No other write to the same document can interleave. On error nothing
    /// is written and no change is published.
    async fn update(&self, id: &Uuid, mutation: Mutation) -> Result<StoredOrder, WorkflowError>;

    /// Apply `mutation` to several documents as one unit
    ///
    /// Either every produced replacement is committed or none is. Returns the
    /// documents that changed.
    async fn update_many(
        &self,
        ids: &[Uuid],
        mutation: BatchMutation,
    ) -> Result<Vec<StoredOrder>, WorkflowError>;

    /// Changes committed after this call, in commit order per document
    fn changes(&self) -> broadcast::Receiver<OrderChange>;
}
