//! Typed error handling for the order workflow
//!
//! Every rejected mutation surfaces one of the variants of [`WorkflowError`].
//! Rejections happen before any store write, so a failed call always leaves
//! the order exactly as it was.
//!
//! # Error Categories
//!
//! - [`WorkflowError::Validation`]: malformed input (see [`ValidationError`])
//! - [`WorkflowError::Unauthorized`]: the actor's role may not perform the action
//! - [`WorkflowError::InvalidTransition`]: the event is not an edge from the current status
//! - [`WorkflowError::NotFound`]: the referenced order does not exist
//! - [`WorkflowError::StoreUnavailable`]: the document store or a feed channel failed
//!
//! # Example
//!
//! ```rust,ignore
//! match service.collect_payment(&cashier, id, payment).await {
//!     Ok(order) => println!("paid: {}", order.financial.is_paid),
//!     Err(WorkflowError::InvalidTransition { from, .. }) => {
//!         println!("order is still {}", from);
//!     }
//!     Err(e) if e.is_retryable() => schedule_retry(),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

use crate::core::auth::Role;
use crate::core::order::OrderStatus;
use crate::core::state_machine::OrderEvent;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

/// The main error type returned by every workflow operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkflowError {
    /// Malformed input, rejected before any store write
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The actor's role does not permit the requested action
    #[error("Role '{role}' is not allowed to {action}")]
    Unauthorized { role: Role, action: String },

    /// The event is not a valid edge from the order's current status
    #[error("Cannot apply '{event}' to an order in status '{from}'")]
    InvalidTransition { from: OrderStatus, event: OrderEvent },

    /// The referenced order does not exist
    #[error("Order with id '{id}' not found")]
    NotFound { id: Uuid },

    /// The document store or the subscription channel failed
    #[error("Order store unavailable: {message}")]
    StoreUnavailable { message: String },
}

/// Input validation failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A single field failed validation
    #[error("Validation failed for field '{field}': {message}")]
    FieldError { field: String, message: String },

    /// Multiple fields failed validation
    #[error("Validation failed: {}", .0.join(", "))]
    FieldErrors(Vec<String>),

    /// A monetary amount was negative
    #[error("'{field}' must not be negative (got {value})")]
    NegativeAmount { field: String, value: String },

    /// The advance exceeds the total price
    #[error("Advance {advance} exceeds total price {total}")]
    AdvanceExceedsTotal { advance: String, total: String },

    /// A payment of zero or less was submitted
    #[error("Payment amount must be positive (got {amount})")]
    NonPositivePayment { amount: String },

    /// No price was supplied and the rate card has no entry for the garment
    #[error("No price supplied and no rate-card entry for '{dress_type}'")]
    MissingPrice { dress_type: String },

    /// Delivery attempted while part of the bill is unpaid
    #[error("Outstanding balance of {outstanding} must be collected before delivery")]
    OutstandingBalance { outstanding: String },
}

impl ValidationError {
    /// Shorthand for a single-field failure
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl WorkflowError {
    /// Shorthand for store failures
    pub fn store(message: impl std::fmt::Display) -> Self {
        WorkflowError::StoreUnavailable {
            message: message.to_string(),
        }
    }

    /// Shorthand for role rejections
    pub fn unauthorized(role: Role, action: impl Into<String>) -> Self {
        WorkflowError::Unauthorized {
            role,
            action: action.into(),
        }
    }

    /// Whether the caller may reasonably retry the same request
    ///
    /// The engine never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::StoreUnavailable { .. })
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
            WorkflowError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            WorkflowError::InvalidTransition { .. } => StatusCode::CONFLICT,
            WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "VALIDATION_ERROR",
            WorkflowError::Unauthorized { .. } => "UNAUTHORIZED",
            WorkflowError::InvalidTransition { .. } => "INVALID_TRANSITION",
            WorkflowError::NotFound { .. } => "ORDER_NOT_FOUND",
            WorkflowError::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            WorkflowError::NotFound { id } => Some(serde_json::json!({ "id": id.to_string() })),
            WorkflowError::InvalidTransition { from, event } => Some(serde_json::json!({
                "from": from,
                "event": event,
            })),
            WorkflowError::Unauthorized { role, action } => Some(serde_json::json!({
                "role": role,
                "action": action,
            })),
            WorkflowError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::Validation(ValidationError::field("body", err.to_string()))
    }
}
