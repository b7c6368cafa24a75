//! Live projection feed
//!
//! The `ProjectionFeed` keeps, for every subscription, the full set of orders
//! matching its predicate and the window (sorted, limited) last pushed to the
//! subscriber. Each change from the store updates those sets and produces one
//! diff per affected subscription.
//!
//! # Architecture
//!
//! ```text
//! OrderStore::changes() ──recv──▶ ProjectionFeed dispatch loop
//!                                        │
//!                                 for each subscription
//!                                        │
//!                            revision newer than last seen?
//!                                        │
//!                              recompute membership + window
//!                                        │
//!                            ──changed──▶ Diff via mpsc channel
//! ```
//!
//! A new subscription is registered before the store is read, and changes that
//! arrive while its snapshot is being built are buffered. Both paths go
//! through the same per-order revision check, so whatever order they land in,
//! the subscriber ends up with the newest version of every document.

use crate::core::auth::{Actor, RoleGate};
use crate::core::error::WorkflowError;
use crate::core::events::OrderChange;
use crate::core::order::Order;
use crate::core::store::{OrderStore, StoredOrder};
use crate::projection::query::ProjectionQuery;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

/// Incremental change of a subscription's window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDiff {
    pub subscription_id: String,
    pub added: Vec<Order>,
    pub updated: Vec<Order>,
    pub removed: Vec<Uuid>,
    /// Unread orders in the full matching set, not just the window
    pub unread_count: usize,
}

impl FeedDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Messages pushed to a subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    /// Full current window; sent first and again after any resync
    #[serde(rename_all = "camelCase")]
    Snapshot {
        subscription_id: String,
        orders: Vec<Order>,
        unread_count: usize,
    },
    Diff(FeedDiff),
}

impl FeedMessage {
    pub fn subscription_id(&self) -> &str {
        match self {
            FeedMessage::Snapshot {
                subscription_id, ..
            } => subscription_id,
            FeedMessage::Diff(diff) => &diff.subscription_id,
        }
    }
}

/// Receiving end of one subscription
pub struct FeedSubscription {
    id: String,
    rx: mpsc::UnboundedReceiver<FeedMessage>,
}

impl FeedSubscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Next message, or `None` once the subscription is gone
    pub async fn recv(&mut self) -> Option<FeedMessage> {
        self.rx.recv().await
    }

    pub fn into_stream(self) -> UnboundedReceiverStream<FeedMessage> {
        UnboundedReceiverStream::new(self.rx)
    }
}

struct SubscriptionState {
    actor: Actor,
    query: ProjectionQuery,
    limit: usize,
    tx: mpsc::UnboundedSender<FeedMessage>,
    /// Highest revision applied per live or matching order
    ///
    /// A finished order that does not match is forgotten. Per-document
    /// changes arrive in commit order, so nothing older can follow it.
    seen: HashMap<Uuid, u64>,
    matching: HashMap<Uuid, StoredOrder>,
    /// Ids and revisions of the window last pushed
    window: Vec<(Uuid, u64)>,
    unread_count: usize,
    /// Changes received before the snapshot was sent
    pending: Option<Vec<OrderChange>>,
}

impl SubscriptionState {
    fn reset(&mut self) {
        self.seen.clear();
        self.matching.clear();
        self.window.clear();
        self.unread_count = 0;
    }

    /// Apply one document version; stale revisions are ignored
    fn apply(&mut self, order: &Order, revision: u64) -> bool {
        if self.seen.get(&order.id).is_some_and(|seen| *seen >= revision) {
            return false;
        }
        self.seen.insert(order.id, revision);

        let visible = self.query.predicate.matches(order) && RoleGate::can_read(self.actor.role, order.status);
        if visible {
            self.matching.insert(
                order.id,
                StoredOrder {
                    order: order.clone(),
                    revision,
                },
            );
            true
        } else {
            if order.status.is_terminal() {
                self.seen.remove(&order.id);
            }
            self.matching.remove(&order.id).is_some()
        }
    }

    fn current_window(&self) -> Vec<&StoredOrder> {
        let mut sorted: Vec<&StoredOrder> = self.matching.values().collect();
        sorted.sort_by(|a, b| self.query.sort.compare(&a.order, &b.order));
        sorted.truncate(self.limit);
        sorted
    }

    fn current_unread(&self) -> usize {
        self.matching.values().filter(|s| !s.order.is_read).count()
    }

    fn snapshot(&mut self, subscription_id: &str) -> FeedMessage {
        let window = self.current_window();
        let orders: Vec<Order> = window.iter().map(|s| s.order.clone()).collect();
        let ids = window.iter().map(|s| (s.order.id, s.revision)).collect();
        self.window = ids;
        self.unread_count = self.current_unread();

        FeedMessage::Snapshot {
            subscription_id: subscription_id.to_string(),
            orders,
            unread_count: self.unread_count,
        }
    }

    /// Diff between the last pushed window and the current one, if any
    fn diff(&mut self, subscription_id: &str) -> Option<FeedDiff> {
        let window = self.current_window();
        let previous: HashMap<Uuid, u64> = self.window.iter().copied().collect();
        let current: HashSet<Uuid> = window.iter().map(|s| s.order.id).collect();

        let mut added = Vec::new();
        let mut updated = Vec::new();
        for stored in &window {
            match previous.get(&stored.order.id) {
                None => added.push(stored.order.clone()),
                Some(revision) if *revision != stored.revision => updated.push(stored.order.clone()),
                Some(_) => {}
            }
        }
        let removed: Vec<Uuid> = self
            .window
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| !current.contains(id))
            .collect();

        let window_ids = window.iter().map(|s| (s.order.id, s.revision)).collect();
        let unread_count = self.current_unread();

        let diff = FeedDiff {
            subscription_id: subscription_id.to_string(),
            added,
            updated,
            removed,
            unread_count,
        };
        if diff.is_empty() && unread_count == self.unread_count {
            return None;
        }

        self.window = window_ids;
        self.unread_count = unread_count;
        Some(diff)
    }
}

/// Manages all live subscriptions over one order store
pub struct ProjectionFeed {
    store: Arc<dyn OrderStore>,
    default_limit: usize,
    subscriptions: RwLock<HashMap<String, SubscriptionState>>,
}

impl ProjectionFeed {
    /// Create the feed and spawn its dispatch loop
    ///
    /// The loop listens to the store from this point on, so no change
    /// committed after `start` returns can be missed by a subscriber.
    pub fn start(store: Arc<dyn OrderStore>, default_limit: usize) -> Arc<Self> {
        let rx = store.changes();
        let feed = Arc::new(Self {
            store,
            default_limit,
            subscriptions: RwLock::new(HashMap::new()),
        });

        let worker = feed.clone();
        tokio::spawn(async move {
            worker.run_dispatch_loop(rx).await;
        });

        feed
    }

    /// Open a subscription; the first message is always a `Snapshot`
    pub async fn subscribe(
        &self,
        actor: &Actor,
        query: ProjectionQuery,
    ) -> Result<FeedSubscription, WorkflowError> {
        RoleGate::authorize_read(actor.role, &query.predicate.statuses)?;

        let id = format!("sub_{}", Uuid::new_v4().simple());
        let (tx, rx) = mpsc::unbounded_channel();
        let limit = query.limit.unwrap_or(self.default_limit);

        self.subscriptions.write().await.insert(
            id.clone(),
            SubscriptionState {
                actor: actor.clone(),
                query,
                limit,
                tx,
                seen: HashMap::new(),
                matching: HashMap::new(),
                window: Vec::new(),
                unread_count: 0,
                pending: Some(Vec::new()),
            },
        );

        let records = match self.store.list().await {
            Ok(records) => records,
            Err(e) => {
                self.subscriptions.write().await.remove(&id);
                return Err(e);
            }
        };

        let mut subscriptions = self.subscriptions.write().await;
        if let Some(state) = subscriptions.get_mut(&id) {
            for record in &records {
                state.apply(&record.order, record.revision);
            }
            for change in state.pending.take().unwrap_or_default() {
                state.apply(&change.order, change.revision);
            }
            let snapshot = state.snapshot(&id);
            // The receiver is still in scope, so this cannot fail
            let _ = state.tx.send(snapshot);
        }
        drop(subscriptions);

        tracing::debug!(
            subscription_id = %id,
            user_id = %actor.user_id,
            role = %actor.role,
            "Projection subscription opened"
        );

        Ok(FeedSubscription { id, rx })
    }

    /// Stop pushing to a subscription and forget it
    ///
    /// Returns `true` if the subscription existed.
    pub async fn unsubscribe(&self, subscription_id: &str) -> bool {
        let removed = self
            .subscriptions
            .write()
            .await
            .remove(subscription_id)
            .is_some();
        if removed {
            tracing::debug!(subscription_id = %subscription_id, "Projection subscription closed");
        }
        removed
    }

    /// Get the number of active subscriptions (for monitoring)
    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    async fn dispatch_change(&self, change: &OrderChange) {
        let mut subscriptions = self.subscriptions.write().await;
        let mut dead = Vec::new();

        for (id, state) in subscriptions.iter_mut() {
            if state.tx.is_closed() {
                dead.push(id.clone());
                continue;
            }
            if let Some(pending) = state.pending.as_mut() {
                pending.push(change.clone());
                continue;
            }
            if !state.apply(&change.order, change.revision) {
                continue;
            }
            if let Some(diff) = state.diff(id)
                && state.tx.send(FeedMessage::Diff(diff)).is_err()
            {
                dead.push(id.clone());
            }
        }

        for id in dead {
            subscriptions.remove(&id);
            tracing::debug!(subscription_id = %id, "Dropped subscription with closed receiver");
        }
    }

    /// Rebuild every ready subscription from the store and send fresh snapshots
    async fn resync(&self) {
        let records = match self.store.list().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Projection resync failed, keeping current state");
                return;
            }
        };

        let mut subscriptions = self.subscriptions.write().await;
        for (id, state) in subscriptions.iter_mut() {
            if state.pending.is_some() {
                continue;
            }
            state.reset();
            for record in &records {
                state.apply(&record.order, record.revision);
            }
            let snapshot = state.snapshot(id);
            let _ = state.tx.send(snapshot);
        }
    }

    /// Receive store changes until the bus closes
    async fn run_dispatch_loop(&self, mut rx: broadcast::Receiver<OrderChange>) {
        tracing::debug!("Projection dispatch loop started");

        loop {
            match rx.recv().await {
                Ok(change) => {
                    self.dispatch_change(&change).await;
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    tracing::warn!(
                        count = count,
                        "Projection dispatch loop lagged, resyncing subscriptions"
                    );
                    self.resync().await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Order change bus closed, stopping projection dispatch loop");
                    break;
                }
            }
        }
    }
}
