//! In-memory implementation of OrderStore for testing and development

use crate::core::error::WorkflowError;
use crate::core::events::{ChangeKind, EventBus, OrderChange};
use crate::core::order::Order;
use crate::core::store::{BatchMutation, Mutation, OrderStore, StoredOrder};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

type Slot = Arc<Mutex<StoredOrder>>;

/// In-memory order store
///
/// The map itself is only locked to find or insert a slot; each document has
/// its own async mutex, so writers on different orders never wait on each
/// other. Changes are published while the document is still held, which keeps
/// per-document change order equal to commit order.
#[derive(Clone)]
pub struct InMemoryOrderStore {
    docs: Arc<RwLock<HashMap<Uuid, Slot>>>,
    revision: Arc<AtomicU64>,
    offline: Arc<AtomicBool>,
    bus: EventBus,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::with_event_bus(EventBus::default())
    }

    pub fn with_event_bus(bus: EventBus) -> Self {
        Self {
            docs: Arc::new(RwLock::new(HashMap::new())),
            revision: Arc::new(AtomicU64::new(0)),
            offline: Arc::new(AtomicBool::new(false)),
            bus,
        }
    }

    /// Simulate an outage: every call fails with `StoreUnavailable` until reset
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Highest revision committed so far
    pub fn current_revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), WorkflowError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(WorkflowError::store("in-memory store is offline"))
        } else {
            Ok(())
        }
    }

    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn slot(&self, id: &Uuid) -> Result<Option<Slot>, WorkflowError> {
        let docs = self
            .docs
            .read()
            .map_err(|e| WorkflowError::store(format!("Failed to acquire read lock: {}", e)))?;
        Ok(docs.get(id).cloned())
    }

    fn commit(&self, stored: &mut StoredOrder, order: Order) {
        stored.order = order;
        stored.revision = self.next_revision();
        self.bus.publish(OrderChange::new(
            stored.order.clone(),
            stored.revision,
            ChangeKind::Updated,
        ));
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<StoredOrder, WorkflowError> {
        self.check_online()?;

        let slot: Slot = Arc::new(Mutex::new(StoredOrder {
            order: order.clone(),
            revision: 0,
        }));
        // Not yet shared with anyone, so this cannot contend
        let mut guard = slot.clone().try_lock_owned().map_err(WorkflowError::store)?;
        {
            let mut docs = self
                .docs
                .write()
                .map_err(|e| WorkflowError::store(format!("Failed to acquire write lock: {}", e)))?;
            if docs.contains_key(&order.id) {
                return Err(WorkflowError::store(format!(
                    "order '{}' already exists",
                    order.id
                )));
            }
            docs.insert(order.id, slot);
        }

        guard.revision = self.next_revision();
        let stored = guard.clone();
        self.bus.publish(OrderChange::new(
            stored.order.clone(),
            stored.revision,
            ChangeKind::Created,
        ));
        Ok(stored)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<StoredOrder>, WorkflowError> {
        self.check_online()?;
        match self.slot(id)? {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<StoredOrder>, WorkflowError> {
        self.check_online()?;
        let slots: Vec<Slot> = {
            let docs = self
                .docs
                .read()
                .map_err(|e| WorkflowError::store(format!("Failed to acquire read lock: {}", e)))?;
            docs.values().cloned().collect()
        };

        let mut orders = Vec::with_capacity(slots.len());
        for slot in slots {
            orders.push(slot.lock().await.clone());
        }
        Ok(orders)
    }

    async fn update(&self, id: &Uuid, mutation: Mutation) -> Result<StoredOrder, WorkflowError> {
        self.check_online()?;
        let slot = self.slot(id)?.ok_or(WorkflowError::NotFound { id: *id })?;

        let mut stored = slot.lock().await;
        let next = mutation(&stored.order)?;
        self.commit(&mut stored, next);
        Ok(stored.clone())
    }

    async fn update_many(
        &self,
        ids: &[Uuid],
        mutation: BatchMutation,
    ) -> Result<Vec<StoredOrder>, WorkflowError> {
        self.check_online()?;

        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut slots = Vec::with_capacity(ids.len());
        for id in &ids {
            slots.push(self.slot(id)?.ok_or(WorkflowError::NotFound { id: *id })?);
        }

        // Sorted acquisition order rules out deadlocks between batches
        let mut guards = Vec::with_capacity(slots.len());
        for slot in &slots {
            guards.push(slot.lock().await);
        }

        let mut replacements = Vec::with_capacity(guards.len());
        for guard in &guards {
            replacements.push(mutation(&guard.order)?);
        }

        let mut changed = Vec::new();
        for (guard, replacement) in guards.iter_mut().zip(replacements) {
            if let Some(order) = replacement {
                self.commit(guard, order);
                changed.push(guard.clone());
            }
        }
        Ok(changed)
    }

    fn changes(&self) -> broadcast::Receiver<OrderChange> {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::{Actor, Role};
    use crate::core::order::fixtures::shirt_order;
    use crate::core::state_machine::create_order;
    use chrono::Utc;

    fn order() -> Order {
        create_order(shirt_order(), &Actor::new("t", Role::Tailor), &[], Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryOrderStore::new();
        let order = order();
        let stored = store.insert(order.clone()).await.unwrap();
        assert_eq!(stored.revision, 1);

        let fetched = store.get(&order.id).await.unwrap().unwrap();
        assert_eq!(fetched.order, order);
        assert!(store.get(&Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = InMemoryOrderStore::new();
        let order = order();
        store.insert(order.clone()).await.unwrap();
        assert!(store.insert(order).await.is_err());
    }

    #[tokio::test]
    async fn test_update_bumps_revision_and_publishes() {
        let store = InMemoryOrderStore::new();
        let mut rx = store.changes();
        let order = order();
        let id = order.id;
        store.insert(order).await.unwrap();

        let stored = store
            .update(
                &id,
                Box::new(|current: &Order| {
                    let mut next = current.clone();
                    next.is_read = true;
                    Ok(next)
                }),
            )
            .await
            .unwrap();
        assert_eq!(stored.revision, 2);
        assert!(stored.order.is_read);

        let created = rx.recv().await.unwrap();
        assert_eq!(created.kind, ChangeKind::Created);
        let updated = rx.recv().await.unwrap();
        assert_eq!(updated.kind, ChangeKind::Updated);
        assert_eq!(updated.revision, 2);
    }

    #[tokio::test]
    async fn test_failed_mutation_writes_nothing() {
        let store = InMemoryOrderStore::new();
        let order = order();
        let id = order.id;
        store.insert(order.clone()).await.unwrap();

        let result = store
            .update(&id, Box::new(|_: &Order| Err(WorkflowError::store("boom"))))
            .await;
        assert!(result.is_err());

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.order, order);
        assert_eq!(stored.revision, 1);
    }

    #[tokio::test]
    async fn test_update_missing_order() {
        let store = InMemoryOrderStore::new();
        let id = Uuid::new_v4();
        let err = store
            .update(&id, Box::new(|o: &Order| Ok(o.clone())))
            .await
            .unwrap_err();
        assert_eq!(err, WorkflowError::NotFound { id });
    }

    #[tokio::test]
    async fn test_update_many_is_all_or_nothing() {
        let store = InMemoryOrderStore::new();
        let first = order();
        let second = order();
        store.insert(first.clone()).await.unwrap();
        store.insert(second.clone()).await.unwrap();

        let poison = second.id;
        let failing: BatchMutation = Arc::new(move |order: &Order| {
            if order.id == poison {
                Err(WorkflowError::store("refused"))
            } else {
                let mut next = order.clone();
                next.is_read = true;
                Ok(Some(next))
            }
        });
        assert!(store.update_many(&[first.id, second.id], failing).await.is_err());
        assert!(!store.get(&first.id).await.unwrap().unwrap().order.is_read);

        let mark: BatchMutation = Arc::new(|order: &Order| {
            let mut next = order.clone();
            next.is_read = true;
            Ok(Some(next))
        });
        let changed = store
            .update_many(&[second.id, first.id, first.id], mark)
            .await
            .unwrap();
        assert_eq!(changed.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_serialized() {
        let store = InMemoryOrderStore::new();
        let order = order();
        let id = order.id;
        store.insert(order).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(
                        &id,
                        Box::new(|current: &Order| {
                            let mut next = current.clone();
                            next.specs.notes.push('x');
                            Ok(next)
                        }),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.order.specs.notes.matches('x').count(), 50);
        assert_eq!(stored.revision, 51);
    }

    #[tokio::test]
    async fn test_offline_store_is_retryable() {
        let store = InMemoryOrderStore::new();
        store.set_offline(true);
        let err = store.list().await.unwrap_err();
        assert!(err.is_retryable());

        store.set_offline(false);
        assert!(store.list().await.unwrap().is_empty());
    }
}
