//! Mutation API over the order store
//!
//! `OrderService` is the only writer. Each call runs the state machine inside
//! the store's atomic read-modify-write, so the transition is validated
//! against the document exactly as it is committed.

use crate::config::ShopConfig;
use crate::core::auth::{Actor, RoleGate};
use crate::core::error::{ValidationError, WorkflowError};
use crate::core::order::{Customer, NewOrder, Order};
use crate::core::state_machine::{
    self, Approval, Command, OrderEvent, PaymentRequest, TransitionContext,
};
use crate::core::store::{BatchMutation, OrderStore};
use crate::projection::query::ProjectionQuery;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    config: Arc<ShopConfig>,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, config: ShopConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    /// `CreateOrder`: validate and persist a new `Pending` order
    pub async fn create_order(&self, actor: &Actor, input: NewOrder) -> Result<Order, WorkflowError> {
        let required = self.config.required_measurements(input.product.dress_type);
        let order = state_machine::create_order(input, actor, required, Utc::now())
            .inspect_err(|e| log_rejection(actor, None, OrderEvent::Create, e))?;

        let stored = self.store.insert(order).await?;
        tracing::info!(
            order_id = %stored.order.id,
            user_id = %actor.user_id,
            dress_type = %stored.order.product.dress_type,
            "Order created"
        );
        Ok(stored.order)
    }

    /// Fetch one order, subject to the actor's read scope
    pub async fn get_order(&self, actor: &Actor, id: Uuid) -> Result<Order, WorkflowError> {
        let stored = self
            .store
            .get(&id)
            .await?
            .ok_or(WorkflowError::NotFound { id })?;

        if !RoleGate::can_read(actor.role, stored.order.status) {
            return Err(WorkflowError::unauthorized(
                actor.role,
                format!("read orders in status {}", stored.order.status),
            ));
        }
        Ok(stored.order)
    }

    pub async fn submit_for_approval(
        &self,
        actor: &Actor,
        id: Uuid,
        note: Option<String>,
    ) -> Result<Order, WorkflowError> {
        self.apply(actor, id, Command::SubmitForApproval { note }).await
    }

    pub async fn update_customer(
        &self,
        actor: &Actor,
        id: Uuid,
        customer: Customer,
        note: Option<String>,
    ) -> Result<Order, WorkflowError> {
        self.apply(actor, id, Command::UpdateCustomer { customer, note })
            .await
    }

    /// `ApproveOrder`: price the order and hand it to the cashier
    pub async fn approve_order(
        &self,
        actor: &Actor,
        id: Uuid,
        approval: Approval,
    ) -> Result<Order, WorkflowError> {
        self.apply(actor, id, Command::Approve(approval)).await
    }

    /// `CollectPayment`: append one payment record
    pub async fn collect_payment(
        &self,
        actor: &Actor,
        id: Uuid,
        payment: PaymentRequest,
    ) -> Result<Order, WorkflowError> {
        self.apply(actor, id, Command::CollectPayment(payment)).await
    }

    /// `AdvanceStage`: move a paid order through production and delivery
    ///
    /// Accepts `StartProduction`, `Complete`, `PassQualityCheck` and `Deliver`.
    /// `assigned_to` names the worker for `StartProduction` and the next
    /// holder of the order after `Complete`; other stages ignore it.
    pub async fn advance_stage(
        &self,
        actor: &Actor,
        id: Uuid,
        event: OrderEvent,
        assigned_to: Option<String>,
        note: Option<String>,
    ) -> Result<Order, WorkflowError> {
        let command = match event {
            OrderEvent::StartProduction => Command::StartProduction { assigned_to },
            OrderEvent::Complete => Command::Complete { note, assigned_to },
            OrderEvent::PassQualityCheck => Command::PassQualityCheck { note },
            OrderEvent::Deliver => Command::Deliver { note },
            other => {
                return Err(ValidationError::field(
                    "event",
                    format!("'{}' is not a production stage", other),
                )
                .into());
            }
        };
        self.apply(actor, id, command).await
    }

    /// `RequestAlteration`: send the garment back for rework
    ///
    /// The order goes to `assigned_to` when given, otherwise back to whoever
    /// holds it.
    pub async fn request_alteration(
        &self,
        actor: &Actor,
        id: Uuid,
        note: impl Into<String>,
        assigned_to: Option<String>,
    ) -> Result<Order, WorkflowError> {
        let command = Command::RequestAlteration {
            note: note.into(),
            assigned_to,
        };
        self.apply(actor, id, command).await
    }

    pub async fn cancel_order(
        &self,
        actor: &Actor,
        id: Uuid,
        reason: impl Into<String>,
    ) -> Result<Order, WorkflowError> {
        self.apply(actor, id, Command::Cancel {
            reason: reason.into(),
        })
        .await
    }

    /// Run one command through the state machine inside the store's
    /// read-modify-write
    pub async fn apply(
        &self,
        actor: &Actor,
        id: Uuid,
        command: Command,
    ) -> Result<Order, WorkflowError> {
        let event = command.event();
        let config = self.config.clone();
        let who = actor.clone();

        let result = self
            .store
            .update(
                &id,
                Box::new(move |current: &Order| {
                    let ctx = TransitionContext {
                        rate_card: &config.rate_card,
                        advance_ratio: config.advance_ratio,
                        now: Utc::now(),
                    };
                    state_machine::transition(current, command, &who, &ctx)
                }),
            )
            .await;

        match result {
            Ok(stored) => {
                tracing::info!(
                    order_id = %id,
                    event = %event,
                    status = %stored.order.status,
                    revision = stored.revision,
                    user_id = %actor.user_id,
                    "Transition accepted"
                );
                Ok(stored.order)
            }
            Err(e) => {
                log_rejection(actor, Some(id), event, &e);
                Err(e)
            }
        }
    }

    /// `MarkRead`: set `isRead` without touching the timeline
    pub async fn mark_read(&self, actor: &Actor, id: Uuid) -> Result<Order, WorkflowError> {
        let role = actor.role;
        let stored = self
            .store
            .update(
                &id,
                Box::new(move |current: &Order| {
                    if !RoleGate::can_read(role, current.status) {
                        return Err(WorkflowError::unauthorized(
                            role,
                            format!("mark orders in status {} as read", current.status),
                        ));
                    }
                    let mut next = current.clone();
                    next.is_read = true;
                    next.updated_at = Utc::now().max(current.updated_at);
                    Ok(next)
                }),
            )
            .await?;

        tracing::debug!(order_id = %id, user_id = %actor.user_id, "Order marked read");
        Ok(stored.order)
    }

    /// `MarkAllRead`: mark the window visible right now as read
    ///
    /// The set is fixed when the call starts; orders that start matching later
    /// stay unread. Returns the ids that were flipped.
    pub async fn mark_all_read(
        &self,
        actor: &Actor,
        query: &ProjectionQuery,
    ) -> Result<Vec<Uuid>, WorkflowError> {
        RoleGate::authorize_read(actor.role, &query.predicate.statuses)?;

        let records = self.store.list().await?;
        let ids: Vec<Uuid> = query
            .evaluate(
                records
                    .iter()
                    .map(|r| &r.order)
                    .filter(|o| RoleGate::can_read(actor.role, o.status)),
                self.config.feed.default_limit,
            )
            .into_iter()
            .filter(|o| !o.is_read)
            .map(|o| o.id)
            .collect();

        if ids.is_empty() {
            return Ok(ids);
        }

        let mutation: BatchMutation = Arc::new(|current: &Order| {
            if current.is_read {
                return Ok(None);
            }
            let mut next = current.clone();
            next.is_read = true;
            next.updated_at = Utc::now().max(current.updated_at);
            Ok(Some(next))
        });
        let changed = self.store.update_many(&ids, mutation).await?;

        tracing::debug!(
            user_id = %actor.user_id,
            count = changed.len(),
            "Orders marked read"
        );
        Ok(changed.into_iter().map(|s| s.order.id).collect())
    }
}

fn log_rejection(actor: &Actor, id: Option<Uuid>, event: OrderEvent, error: &WorkflowError) {
    tracing::debug!(
        order_id = ?id,
        event = %event,
        user_id = %actor.user_id,
        role = %actor.role,
        code = error.error_code(),
        "Mutation rejected: {}",
        error
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::Role;
    use crate::core::order::fixtures::shirt_order;
    use crate::core::order::{OrderStatus, PaymentMode};
    use crate::storage::InMemoryOrderStore;
    use rust_decimal::Decimal;

    fn service() -> OrderService {
        OrderService::new(Arc::new(InMemoryOrderStore::new()), ShopConfig::default_config())
    }

    fn tailor() -> Actor {
        Actor::new("tailor-1", Role::Tailor)
    }

    fn manager() -> Actor {
        Actor::new("manager-1", Role::Manager)
    }

    #[tokio::test]
    async fn test_create_validates_template() {
        let service = service();
        let mut input = shirt_order();
        input.specs.measurements.shift_remove("Chest");

        let err = service.create_order(&tailor(), input).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(service.store().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_transition_leaves_order_unchanged() {
        let service = service();
        let order = service.create_order(&tailor(), shirt_order()).await.unwrap();

        let err = service
            .collect_payment(
                &Actor::new("cashier-1", Role::Cashier),
                order.id,
                PaymentRequest {
                    amount: Decimal::from(100),
                    mode: PaymentMode::Cash,
                    collected_by: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

        let stored = service.store().get(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.order, order);
        assert_eq!(stored.revision, 1);
    }

    #[tokio::test]
    async fn test_advance_stage_rejects_non_stage_event() {
        let service = service();
        let order = service.create_order(&tailor(), shirt_order()).await.unwrap();
        let err = service
            .advance_stage(&manager(), order.id, OrderEvent::Approve, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_mark_read_adds_no_timeline_entry() {
        let service = service();
        let order = service.create_order(&tailor(), shirt_order()).await.unwrap();
        let read = service.mark_read(&manager(), order.id).await.unwrap();
        assert!(read.is_read);
        assert_eq!(read.timeline.len(), order.timeline.len());
        assert_eq!(read.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_mark_read_respects_read_scope() {
        let service = service();
        let order = service.create_order(&tailor(), shirt_order()).await.unwrap();
        let err = service
            .mark_read(&Actor::new("cashier-1", Role::Cashier), order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_get_order_not_found() {
        let service = service();
        let id = Uuid::new_v4();
        assert_eq!(
            service.get_order(&manager(), id).await.unwrap_err(),
            WorkflowError::NotFound { id }
        );
    }

    #[tokio::test]
    async fn test_mark_all_read_only_touches_visible_window() {
        let service = service();
        for _ in 0..3 {
            service.create_order(&tailor(), shirt_order()).await.unwrap();
        }

        let query = ProjectionQuery::manager_inbox().with_limit(2);
        let flipped = service.mark_all_read(&manager(), &query).await.unwrap();
        assert_eq!(flipped.len(), 2);

        let unread = service
            .store()
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|s| !s.order.is_read)
            .count();
        assert_eq!(unread, 1);
    }
}
