//! Order state machine
//!
//! The graph is a static adjacency list ([`TRANSITIONS`]) of
//! `(status, event) -> (status, stage)` edges. [`transition`] is a pure
//! function of the current order, the command, the acting user and a
//! [`TransitionContext`]; it returns the next version of the order or a typed
//! rejection and never touches the store.
//!
//! ```text
//! Pending ─▶ Pending_Approval ─▶ PAYMENT_PENDING ─▶ ADVANCE_PAID ─▶ CUTTING_READY
//!                                                                        │
//!   Delivered ◀─ Ready_To_Deliver ◀─ Quality_Check ◀─ CUTTING_COMPLETED ◀┘
//!                     │                   │  ▲              ▲
//!                     ▼                   └──┘ alteration   │
//!              Alteration_Needed ───────────────────────────┘
//! ```
//!
//! `Cancelled` is reachable from every non-terminal status.

use crate::config::RateCard;
use crate::core::auth::{Actor, Role, RoleGate};
use crate::core::error::{ValidationError, WorkflowError};
use crate::core::financial::default_advance;
use crate::core::order::{
    Customer, Financial, NewOrder, Order, OrderStatus, Payment, PaymentMode, PaymentType,
};
use crate::core::timeline::{Stage, Timeline};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Events an actor can trigger on an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderEvent {
    Create,
    SubmitForApproval,
    UpdateCustomer,
    Approve,
    CollectPayment,
    StartProduction,
    Complete,
    PassQualityCheck,
    RequestAlteration,
    Deliver,
    Cancel,
}

impl OrderEvent {
    pub const ALL: [OrderEvent; 11] = [
        OrderEvent::Create,
        OrderEvent::SubmitForApproval,
        OrderEvent::UpdateCustomer,
        OrderEvent::Approve,
        OrderEvent::CollectPayment,
        OrderEvent::StartProduction,
        OrderEvent::Complete,
        OrderEvent::PassQualityCheck,
        OrderEvent::RequestAlteration,
        OrderEvent::Deliver,
        OrderEvent::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEvent::Create => "Create",
            OrderEvent::SubmitForApproval => "SubmitForApproval",
            OrderEvent::UpdateCustomer => "UpdateCustomer",
            OrderEvent::Approve => "Approve",
            OrderEvent::CollectPayment => "CollectPayment",
            OrderEvent::StartProduction => "StartProduction",
            OrderEvent::Complete => "Complete",
            OrderEvent::PassQualityCheck => "PassQualityCheck",
            OrderEvent::RequestAlteration => "RequestAlteration",
            OrderEvent::Deliver => "Deliver",
            OrderEvent::Cancel => "Cancel",
        }
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One edge of the transition graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub event: OrderEvent,
    pub to: OrderStatus,
    pub stage: Stage,
}

const fn edge(from: OrderStatus, event: OrderEvent, to: OrderStatus, stage: Stage) -> Transition {
    Transition {
        from,
        event,
        to,
        stage,
    }
}

use OrderEvent as E;
use OrderStatus as S;

/// Every allowed edge. `(from, stage)` pairs are unique, which is what lets a
/// timeline be replayed from its stage names.
pub const TRANSITIONS: &[Transition] = &[
    edge(S::Pending, E::SubmitForApproval, S::PendingApproval, Stage::SubmittedForApproval),
    edge(S::Pending, E::UpdateCustomer, S::Pending, Stage::DetailsUpdated),
    edge(S::PendingApproval, E::UpdateCustomer, S::PendingApproval, Stage::DetailsUpdated),
    edge(S::Pending, E::Approve, S::PaymentPending, Stage::ManagerApproved),
    edge(S::PendingApproval, E::Approve, S::PaymentPending, Stage::ManagerApproved),
    edge(S::PaymentPending, E::Approve, S::PaymentPending, Stage::ManagerApproved),
    edge(S::PaymentPending, E::CollectPayment, S::PaymentPending, Stage::PartialAdvanceCollected),
    edge(S::PaymentPending, E::CollectPayment, S::AdvancePaid, Stage::AdvanceCollected),
    edge(S::ReadyToDeliver, E::CollectPayment, S::ReadyToDeliver, Stage::BalanceCollected),
    edge(S::AdvancePaid, E::StartProduction, S::CuttingReady, Stage::ProductionStarted),
    edge(S::CuttingReady, E::Complete, S::CuttingCompleted, Stage::CuttingCompleted),
    edge(S::CuttingCompleted, E::Complete, S::QualityCheck, Stage::SentToQualityCheck),
    edge(S::AlterationNeeded, E::Complete, S::CuttingCompleted, Stage::AlterationCompleted),
    edge(S::QualityCheck, E::RequestAlteration, S::CuttingCompleted, Stage::AlterationRequested),
    edge(S::ReadyToDeliver, E::RequestAlteration, S::AlterationNeeded, Stage::TrialAlterationRequested),
    edge(S::QualityCheck, E::PassQualityCheck, S::ReadyToDeliver, Stage::QualityApproved),
    edge(S::ReadyToDeliver, E::Deliver, S::Delivered, Stage::Delivered),
    edge(S::Pending, E::Cancel, S::Cancelled, Stage::Cancelled),
    edge(S::PendingApproval, E::Cancel, S::Cancelled, Stage::Cancelled),
    edge(S::PaymentPending, E::Cancel, S::Cancelled, Stage::Cancelled),
    edge(S::AdvancePaid, E::Cancel, S::Cancelled, Stage::Cancelled),
    edge(S::CuttingReady, E::Cancel, S::Cancelled, Stage::Cancelled),
    edge(S::CuttingCompleted, E::Cancel, S::Cancelled, Stage::Cancelled),
    edge(S::QualityCheck, E::Cancel, S::Cancelled, Stage::Cancelled),
    edge(S::AlterationNeeded, E::Cancel, S::Cancelled, Stage::Cancelled),
    edge(S::ReadyToDeliver, E::Cancel, S::Cancelled, Stage::Cancelled),
];

/// Edges leaving `from` for `event`
pub fn edges(from: OrderStatus, event: OrderEvent) -> impl Iterator<Item = &'static Transition> {
    TRANSITIONS
        .iter()
        .filter(move |t| t.from == from && t.event == event)
}

/// Whether `event` is a valid edge out of `from`
pub fn can_apply(from: OrderStatus, event: OrderEvent) -> bool {
    edges(from, event).next().is_some()
}

/// Events that have at least one edge out of `from`
pub fn available_events(from: OrderStatus) -> Vec<OrderEvent> {
    OrderEvent::ALL
        .into_iter()
        .filter(|event| can_apply(from, *event))
        .collect()
}

/// The status a stage leads to when recorded in `from`
pub fn target_for_stage(from: OrderStatus, stage: Stage) -> Option<OrderStatus> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.stage == stage)
        .map(|t| t.to)
}

/// Input of `ApproveOrder`; every field falls back to a default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    #[serde(default)]
    pub total_price: Option<Decimal>,
    #[serde(default)]
    pub advance_amount: Option<Decimal>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Input of `CollectPayment`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub mode: PaymentMode,
    /// Defaults to the acting user
    #[serde(default)]
    pub collected_by: Option<String>,
}

/// A mutation request together with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SubmitForApproval { note: Option<String> },
    UpdateCustomer { customer: Customer, note: Option<String> },
    Approve(Approval),
    CollectPayment(PaymentRequest),
    StartProduction { assigned_to: Option<String> },
    /// `assigned_to` hands the order to the next staff member after the step
    Complete {
        note: Option<String>,
        assigned_to: Option<String>,
    },
    PassQualityCheck { note: Option<String> },
    /// Without `assigned_to` the order returns to its recorded assignee
    RequestAlteration {
        note: String,
        assigned_to: Option<String>,
    },
    Deliver { note: Option<String> },
    Cancel { reason: String },
}

impl Command {
    pub fn event(&self) -> OrderEvent {
        match self {
            Command::SubmitForApproval { .. } => OrderEvent::SubmitForApproval,
            Command::UpdateCustomer { .. } => OrderEvent::UpdateCustomer,
            Command::Approve(_) => OrderEvent::Approve,
            Command::CollectPayment(_) => OrderEvent::CollectPayment,
            Command::StartProduction { .. } => OrderEvent::StartProduction,
            Command::Complete { .. } => OrderEvent::Complete,
            Command::PassQualityCheck { .. } => OrderEvent::PassQualityCheck,
            Command::RequestAlteration { .. } => OrderEvent::RequestAlteration,
            Command::Deliver { .. } => OrderEvent::Deliver,
            Command::Cancel { .. } => OrderEvent::Cancel,
        }
    }
}

/// Inputs a transition needs besides the order itself
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
    pub rate_card: &'a RateCard,
    pub advance_ratio: Decimal,
    pub now: DateTime<Utc>,
}

/// Build a new `Pending` order with its creation entry
pub fn create_order(
    input: NewOrder,
    actor: &Actor,
    required_measurements: &[String],
    now: DateTime<Utc>,
) -> Result<Order, WorkflowError> {
    RoleGate::authorize(actor.role, OrderEvent::Create)?;
    input.validate(required_measurements)?;

    let mut timeline = Timeline::new();
    timeline.append(
        Stage::OrderCreated,
        format!("Order created by {}", actor.user_id),
        now,
    );

    Ok(Order {
        id: Uuid::new_v4(),
        status: OrderStatus::Pending,
        customer: input.customer,
        product: input.product,
        specs: input.specs,
        workflow: input.workflow,
        financial: Financial::default(),
        timeline,
        assigned_to: None,
        is_read: false,
        created_at: now,
        updated_at: now,
    })
}

/// Apply one command to an order
///
/// Checks run in a fixed order: role, edge, assignee, payload. The returned
/// order carries exactly one new timeline entry; on error the input is
/// untouched.
pub fn transition(
    order: &Order,
    command: Command,
    actor: &Actor,
    ctx: &TransitionContext<'_>,
) -> Result<Order, WorkflowError> {
    let event = command.event();
    RoleGate::authorize(actor.role, event)?;

    let from = order.status;
    let invalid = || WorkflowError::InvalidTransition { from, event };
    if !can_apply(from, event) {
        return Err(invalid());
    }

    if matches!(event, OrderEvent::Complete | OrderEvent::RequestAlteration)
        && matches!(actor.role, Role::Cutter | Role::Tailor)
        && let Some(assignee) = &order.assigned_to
        && assignee != &actor.user_id
    {
        return Err(WorkflowError::unauthorized(
            actor.role,
            format!("{} an order assigned to {}", event, assignee),
        ));
    }

    let mut next = order.clone();
    let (stage, note) = match command {
        Command::SubmitForApproval { note } => (
            Stage::SubmittedForApproval,
            note.unwrap_or_else(|| "Sent to manager for approval.".to_string()),
        ),

        Command::UpdateCustomer { customer, note } => {
            let mut errors = Vec::new();
            if customer.name.trim().is_empty() {
                errors.push("customer.name is required".to_string());
            }
            if customer.phone.trim().is_empty() {
                errors.push("customer.phone is required".to_string());
            }
            if !errors.is_empty() {
                return Err(ValidationError::FieldErrors(errors).into());
            }
            next.customer = customer;
            (
                Stage::DetailsUpdated,
                note.unwrap_or_else(|| "Customer details updated.".to_string()),
            )
        }

        Command::Approve(approval) => {
            if !order.financial.payments.is_empty() {
                return Err(invalid());
            }
            approve(&mut next, approval, ctx)?
        }

        Command::CollectPayment(request) => {
            let collected_by = request
                .collected_by
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| actor.user_id.clone());
            let kind = match from {
                OrderStatus::PaymentPending
                    if next.financial.advance_collected() < next.financial.advance_amount =>
                {
                    PaymentType::Advance
                }
                _ => PaymentType::Balance,
            };

            next.financial.record_payment(Payment {
                amount: request.amount,
                mode: request.mode,
                kind,
                collected_by: collected_by.clone(),
                timestamp: ctx.now,
            })?;

            let stage = match from {
                OrderStatus::ReadyToDeliver => Stage::BalanceCollected,
                _ if next.financial.is_paid => Stage::AdvanceCollected,
                _ => Stage::PartialAdvanceCollected,
            };
            let label = match kind {
                PaymentType::Advance => "advance",
                PaymentType::Balance => "balance",
            };
            (
                stage,
                format!(
                    "₹{} {} collected via {} by {}",
                    request.amount, label, request.mode, collected_by
                ),
            )
        }

        Command::StartProduction { assigned_to } => {
            let assignee = assigned_to
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| actor.user_id.clone());
            let note = format!("Production started, assigned to {}", assignee);
            next.assigned_to = Some(assignee);
            (Stage::ProductionStarted, note)
        }

        Command::Complete { note, assigned_to } => {
            let (stage, default_note) = match from {
                OrderStatus::CuttingReady => (Stage::CuttingCompleted, "Fabric cut and prepared."),
                OrderStatus::CuttingCompleted => {
                    (Stage::SentToQualityCheck, "Stitching finished, sent to quality check.")
                }
                _ => (Stage::AlterationCompleted, "Alteration completed."),
            };
            let note = note.unwrap_or_else(|| default_note.to_string());
            (stage, hand_off(&mut next, assigned_to, note))
        }

        Command::PassQualityCheck { note } => (
            Stage::QualityApproved,
            note.unwrap_or_else(|| "Passed quality check.".to_string()),
        ),

        Command::RequestAlteration { note, assigned_to } => {
            if note.trim().is_empty() {
                return Err(ValidationError::field("note", "alteration note is required").into());
            }
            let stage = match from {
                OrderStatus::ReadyToDeliver => Stage::TrialAlterationRequested,
                _ => Stage::AlterationRequested,
            };
            (stage, hand_off(&mut next, assigned_to, note))
        }

        Command::Deliver { note } => {
            let outstanding = order.financial.outstanding();
            if outstanding > Decimal::ZERO {
                return Err(ValidationError::OutstandingBalance {
                    outstanding: outstanding.to_string(),
                }
                .into());
            }
            (
                Stage::Delivered,
                note.unwrap_or_else(|| "Handed over to the customer.".to_string()),
            )
        }

        Command::Cancel { reason } => {
            if reason.trim().is_empty() {
                return Err(ValidationError::field("reason", "cancellation reason is required").into());
            }
            (Stage::Cancelled, reason)
        }
    };

    next.status = target_for_stage(from, stage).ok_or_else(invalid)?;
    next.timeline.append(stage, note, ctx.now);
    next.updated_at = ctx.now.max(order.updated_at);
    Ok(next)
}

/// Reassign the order when a new assignee is named, recording it in the note
fn hand_off(next: &mut Order, assigned_to: Option<String>, note: String) -> String {
    match assigned_to.filter(|name| !name.trim().is_empty()) {
        Some(assignee) if next.assigned_to.as_ref() != Some(&assignee) => {
            let note = format!("{} Assigned to {}.", note, assignee);
            next.assigned_to = Some(assignee);
            note
        }
        _ => note,
    }
}

fn approve(
    next: &mut Order,
    approval: Approval,
    ctx: &TransitionContext<'_>,
) -> Result<(Stage, String), WorkflowError> {
    let priced = next.is_priced();
    let current = next.financial.clone();

    let total = match approval.total_price {
        Some(total) => total,
        None if priced => current.total_price,
        None => ctx
            .rate_card
            .get(&next.product.dress_type)
            .copied()
            .ok_or_else(|| ValidationError::MissingPrice {
                dress_type: next.product.dress_type.to_string(),
            })?,
    };

    let advance = match approval.advance_amount {
        Some(advance) => advance,
        None if priced && total == current.total_price => current.advance_amount,
        None => default_advance(total, ctx.advance_ratio),
    };

    next.financial.set_price(total, advance)?;
    if let Some(date) = approval.delivery_date {
        next.workflow.delivery_date = date;
    }

    let note = approval
        .note
        .filter(|note| !note.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "Manager approved at ₹{} (advance ₹{}). Sent to Cashier.",
                total, advance
            )
        });
    Ok((Stage::ManagerApproved, note))
}
