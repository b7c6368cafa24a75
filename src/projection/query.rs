//! Predicates, sort keys and canned dashboard queries

use crate::core::auth::Actor;
use crate::core::order::{Order, OrderStatus};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Filter over orders; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predicate {
    /// Allowed statuses; empty means any status
    #[serde(default)]
    pub statuses: Vec<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

impl Predicate {
    pub fn statuses(statuses: impl IntoIterator<Item = OrderStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn unread(mut self) -> Self {
        self.is_read = Some(false);
        self
    }

    pub fn assigned_to(mut self, user_id: impl Into<String>) -> Self {
        self.assigned_to = Some(user_id.into());
        self
    }

    /// Check if an order satisfies every condition
    pub fn matches(&self, order: &Order) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&order.status) {
            return false;
        }

        if let Some(is_read) = self.is_read
            && order.is_read != is_read
        {
            return false;
        }

        match &self.assigned_to {
            Some(user) => order.assigned_to.as_deref() == Some(user.as_str()),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    DeliveryDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Sort order of a projection, newest first by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortKey {
    #[serde(default)]
    pub field: SortField,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Total order over orders; ties fall back to the id so windows are stable
    pub fn compare(&self, a: &Order, b: &Order) -> Ordering {
        let ordering = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::DeliveryDate => a.workflow.delivery_date.cmp(&b.workflow.delivery_date),
        };
        let ordering = match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    }
}

/// A live query: predicate, sort key and window size
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionQuery {
    #[serde(default)]
    pub predicate: Predicate,
    #[serde(default)]
    pub sort: SortKey,
    /// Window size; the feed's default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl ProjectionQuery {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            ..Default::default()
        }
    }

    pub fn sorted_by(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort = SortKey::new(field, direction);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Matching orders, sorted and cut to the window
    pub fn evaluate<'a>(
        &self,
        orders: impl IntoIterator<Item = &'a Order>,
        default_limit: usize,
    ) -> Vec<&'a Order> {
        let mut matching: Vec<&Order> = orders
            .into_iter()
            .filter(|order| self.predicate.matches(order))
            .collect();
        matching.sort_by(|a, b| self.sort.compare(a, b));
        matching.truncate(self.limit.unwrap_or(default_limit));
        matching
    }

    /// Unread orders awaiting a manager's decision
    pub fn manager_inbox() -> Self {
        Self::new(Predicate::statuses([OrderStatus::Pending, OrderStatus::PendingApproval]).unread())
            .with_limit(20)
    }

    /// Approved orders waiting for the advance
    pub fn cashier_pending_payments() -> Self {
        Self::new(Predicate::statuses([OrderStatus::PaymentPending])).with_limit(20)
    }

    /// Orders whose advance has been collected
    pub fn cashier_receipts() -> Self {
        Self::new(Predicate::statuses([OrderStatus::AdvancePaid]))
            .sorted_by(SortField::UpdatedAt, SortDirection::Desc)
    }

    /// Paid orders waiting to be cut, and cuts in progress
    pub fn cutter_queue() -> Self {
        Self::new(Predicate::statuses([
            OrderStatus::AdvancePaid,
            OrderStatus::CuttingReady,
        ]))
        .sorted_by(SortField::DeliveryDate, SortDirection::Asc)
    }

    /// Production work assigned to one staff member
    pub fn work_queue(user_id: impl Into<String>) -> Self {
        Self::new(
            Predicate::statuses([
                OrderStatus::CuttingReady,
                OrderStatus::CuttingCompleted,
                OrderStatus::AlterationNeeded,
                OrderStatus::QualityCheck,
            ])
            .assigned_to(user_id),
        )
        .sorted_by(SortField::DeliveryDate, SortDirection::Asc)
    }

    /// Every open order past creation, soonest delivery first
    pub fn upcoming_deliveries() -> Self {
        Self::new(Predicate::statuses(
            OrderStatus::ALL
                .into_iter()
                .filter(|s| !s.is_terminal() && *s != OrderStatus::Pending),
        ))
        .sorted_by(SortField::DeliveryDate, SortDirection::Asc)
    }
}

/// Named role dashboards a client can subscribe to without spelling out a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardView {
    ManagerInbox,
    CashierPendingPayments,
    CashierReceipts,
    CutterQueue,
    /// Production work assigned to the connected user
    WorkQueue,
    UpcomingDeliveries,
}

impl DashboardView {
    pub fn query_for(self, actor: &Actor) -> ProjectionQuery {
        match self {
            DashboardView::ManagerInbox => ProjectionQuery::manager_inbox(),
            DashboardView::CashierPendingPayments => ProjectionQuery::cashier_pending_payments(),
            DashboardView::CashierReceipts => ProjectionQuery::cashier_receipts(),
            DashboardView::CutterQueue => ProjectionQuery::cutter_queue(),
            DashboardView::WorkQueue => ProjectionQuery::work_queue(actor.user_id.clone()),
            DashboardView::UpcomingDeliveries => ProjectionQuery::upcoming_deliveries(),
        }
    }

    /// Resolve a request that names a query, a view, or neither
    ///
    /// An explicit query wins over a view; neither means every order.
    pub fn resolve(
        query: Option<ProjectionQuery>,
        view: Option<DashboardView>,
        actor: &Actor,
    ) -> ProjectionQuery {
        match (query, view) {
            (Some(query), _) => query,
            (None, Some(view)) => view.query_for(actor),
            (None, None) => ProjectionQuery::default(),
        }
    }
}
