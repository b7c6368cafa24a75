//! REST API exposure for the order workflow
//!
//! The REST exposure consumes a `ShopHost` and produces an Axum `Router`.
//! Identity comes from the host's `AuthProvider`; every failure is rendered
//! as a `WorkflowError` envelope.
//!
//! | Method | Path | Operation |
//! |---|---|---|
//! | POST | `/orders` | CreateOrder |
//! | GET | `/orders/{id}` | read one order |
//! | POST | `/orders/{id}/submit` | SubmitForApproval |
//! | POST | `/orders/{id}/customer` | UpdateCustomer |
//! | POST | `/orders/{id}/approve` | ApproveOrder |
//! | POST | `/orders/{id}/payments` | CollectPayment |
//! | POST | `/orders/{id}/advance` | AdvanceStage |
//! | POST | `/orders/{id}/alteration` | RequestAlteration |
//! | POST | `/orders/{id}/cancel` | CancelOrder |
//! | POST | `/orders/{id}/read` | MarkRead |
//! | POST | `/orders/read-all` | MarkAllRead |

pub mod extractors;
pub mod handlers;

use super::super::host::ShopHost;
use anyhow::Result;
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router from a host
    pub fn build_router(host: Arc<ShopHost>) -> Result<Router> {
        Ok(Self::health_routes().merge(Self::order_routes(host)))
    }

    fn order_routes(host: Arc<ShopHost>) -> Router {
        Router::new()
            .route("/orders", post(handlers::create_order))
            .route("/orders/read-all", post(handlers::mark_all_read))
            .route("/orders/{id}", get(handlers::get_order))
            .route("/orders/{id}/submit", post(handlers::submit_for_approval))
            .route("/orders/{id}/customer", post(handlers::update_customer))
            .route("/orders/{id}/approve", post(handlers::approve_order))
            .route("/orders/{id}/payments", post(handlers::collect_payment))
            .route("/orders/{id}/advance", post(handlers::advance_stage))
            .route("/orders/{id}/alteration", post(handlers::request_alteration))
            .route("/orders/{id}/cancel", post(handlers::cancel_order))
            .route("/orders/{id}/read", post(handlers::mark_read))
            .with_state(host)
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "stitchflow"
        }))
    }
}
