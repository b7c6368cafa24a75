//! Change feed of the order store
//!
//! Every committed write produces one [`OrderChange`] carrying the full new
//! document and the store revision it was committed at. The [`EventBus`] wraps
//! `tokio::sync::broadcast` so the store never waits on subscribers.
//!
//! ```text
//! OrderService ──▶ OrderStore::update() ──▶ EventBus::publish() ──▶ ProjectionFeed dispatch loop
//!                                                               ──▶ any other listener
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let bus = EventBus::new(1024);
//! let mut rx = bus.subscribe();
//!
//! bus.publish(OrderChange::new(order, 7, ChangeKind::Updated));
//!
//! if let Ok(change) = rx.recv().await {
//!     println!("{} is now {}", change.order.id, change.order.status);
//! }
//! ```

use crate::core::order::Order;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Whether the write created the document or replaced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
}

/// One committed write
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderChange {
    /// Unique event ID
    pub id: Uuid,
    /// Store-wide revision of the write; strictly increasing in commit order
    pub revision: u64,
    pub kind: ChangeKind,
    pub order: Order,
    /// When the change was published
    pub timestamp: DateTime<Utc>,
}

impl OrderChange {
    pub fn new(order: Order, revision: u64, kind: ChangeKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            revision,
            kind,
            order,
            timestamp: Utc::now(),
        }
    }

    pub fn order_id(&self) -> Uuid {
        self.order.id
    }
}

/// Broadcast-based change bus
///
/// Cheap to clone and shareable across tasks.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<OrderChange>,
}

impl EventBus {
    /// Create a bus buffering `capacity` changes before receivers lag
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a change to all subscribers
    ///
    /// Never blocks and never fails. Returns the number of receivers.
    pub fn publish(&self, change: OrderChange) -> usize {
        // send() only errors when nobody listens
        self.sender.send(change).unwrap_or(0)
    }

    /// Receive every change published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<OrderChange> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
