//! Role gate and actor identity
//!
//! Identity and sessions live outside the engine: an [`AuthProvider`] turns
//! whatever the transport carries into an [`Actor`], and that pairing is
//! trusted as-is. Every write and every subscription then passes the actor
//! explicitly to [`RoleGate`], a static lookup with no side effects.

use crate::core::error::{ValidationError, WorkflowError};
use crate::core::order::OrderStatus;
use crate::core::state_machine::OrderEvent;
use async_trait::async_trait;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Staff roles of the shop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Manager,
    Cashier,
    Cutter,
    Tailor,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Manager,
        Role::Cashier,
        Role::Cutter,
        Role::Tailor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Cashier => "Cashier",
            Role::Cutter => "Cutter",
            Role::Tailor => "Tailor",
        }
    }

    /// Manager and Admin share one column of the table
    pub fn is_supervisor(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// The user performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

/// Static authorization table for writes and reads
pub struct RoleGate;

const CASHIER_STATUSES: &[OrderStatus] = &[
    OrderStatus::PaymentPending,
    OrderStatus::AdvancePaid,
    OrderStatus::ReadyToDeliver,
    OrderStatus::Delivered,
];

/// Production staff also see finished garments, where trial fittings happen
const PRODUCTION_STATUSES: &[OrderStatus] = &[
    OrderStatus::AdvancePaid,
    OrderStatus::CuttingReady,
    OrderStatus::CuttingCompleted,
    OrderStatus::AlterationNeeded,
    OrderStatus::QualityCheck,
    OrderStatus::ReadyToDeliver,
];

impl RoleGate {
    /// Roles allowed to trigger an event
    pub fn roles_for(event: OrderEvent) -> &'static [Role] {
        use Role::*;
        match event {
            OrderEvent::Create => &[Tailor, Manager, Admin],
            OrderEvent::SubmitForApproval => &[Tailor],
            OrderEvent::UpdateCustomer => &[Tailor, Manager, Admin],
            OrderEvent::Approve | OrderEvent::Cancel | OrderEvent::PassQualityCheck => {
                &[Manager, Admin]
            }
            OrderEvent::CollectPayment => &[Cashier],
            OrderEvent::StartProduction | OrderEvent::Complete => &[Cutter, Tailor],
            OrderEvent::RequestAlteration => &[Cutter, Tailor, Manager, Admin],
            OrderEvent::Deliver => &[Manager, Admin, Cashier],
        }
    }

    pub fn can_trigger(role: Role, event: OrderEvent) -> bool {
        Self::roles_for(event).contains(&role)
    }

    /// Fail with `Unauthorized` unless `role` may trigger `event`
    pub fn authorize(role: Role, event: OrderEvent) -> Result<(), WorkflowError> {
        if Self::can_trigger(role, event) {
            Ok(())
        } else {
            Err(WorkflowError::unauthorized(role, event.as_str()))
        }
    }

    /// Whether `role` may see orders in `status`
    pub fn can_read(role: Role, status: OrderStatus) -> bool {
        match role {
            Role::Admin | Role::Manager => true,
            Role::Cashier => CASHIER_STATUSES.contains(&status),
            Role::Cutter => PRODUCTION_STATUSES.contains(&status),
            Role::Tailor => status.awaits_approval() || PRODUCTION_STATUSES.contains(&status),
        }
    }

    /// Fail with `Unauthorized` unless every named status is readable
    ///
    /// An empty list means "all statuses" and is reserved to supervisors.
    pub fn authorize_read(role: Role, statuses: &[OrderStatus]) -> Result<(), WorkflowError> {
        if statuses.is_empty() {
            return if role.is_supervisor() {
                Ok(())
            } else {
                Err(WorkflowError::unauthorized(role, "subscribe to all statuses"))
            };
        }

        match statuses.iter().find(|s| !Self::can_read(role, **s)) {
            Some(status) => Err(WorkflowError::unauthorized(
                role,
                format!("read orders in status {}", status),
            )),
            None => Ok(()),
        }
    }
}

/// Trait for identity providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Extract the acting user from request headers
    async fn extract_actor(&self, headers: &HeaderMap) -> Result<Actor, WorkflowError>;
}

/// Reads the identity pairing from `x-user-id` and `x-user-role`
///
/// Meant to sit behind a gateway that has already authenticated the caller.
#[derive(Debug, Clone, Default)]
pub struct HeaderAuthProvider;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[async_trait]
impl AuthProvider for HeaderAuthProvider {
    async fn extract_actor(&self, headers: &HeaderMap) -> Result<Actor, WorkflowError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let user_id = header(USER_ID_HEADER).ok_or_else(|| {
            ValidationError::field(USER_ID_HEADER, "header is required")
        })?;
        let role = header(USER_ROLE_HEADER)
            .ok_or_else(|| "header is required".to_string())
            .and_then(|raw| raw.parse::<Role>())
            .map_err(|message| {
                ValidationError::field(USER_ROLE_HEADER, message)
            })?;

        Ok(Actor { user_id, role })
    }
}

/// Provider that treats every caller as the same actor (tests, demos)
#[derive(Debug, Clone)]
pub struct FixedAuthProvider(pub Actor);

#[async_trait]
impl AuthProvider for FixedAuthProvider {
    async fn extract_actor(&self, _headers: &HeaderMap) -> Result<Actor, WorkflowError> {
        Ok(self.0.clone())
    }
}
