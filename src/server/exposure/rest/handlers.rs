//! HTTP handlers for order operations
//!
//! Handlers only translate between HTTP and [`OrderService`]; every rule lives
//! in the service and the state machine behind it.
//!
//! [`OrderService`]: crate::core::service::OrderService

use super::extractors::{CurrentActor, JsonBody, OrderId};
use crate::core::error::WorkflowError;
use crate::core::order::{Customer, NewOrder, Order};
use crate::core::state_machine::{Approval, OrderEvent, PaymentRequest};
use crate::projection::{DashboardView, ProjectionQuery};
use crate::server::host::ShopHost;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

type HandlerResult<T> = Result<Json<T>, WorkflowError>;

#[derive(Debug, Default, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerRequest {
    pub customer: Customer,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceStageRequest {
    pub event: OrderEvent,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Missing text reads as empty and is rejected by the workflow
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlterationRequest {
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: String,
}

/// Body of `POST /orders/read-all`: an explicit query or a named view
#[derive(Debug, Default, Deserialize)]
pub struct MarkAllReadRequest {
    #[serde(default)]
    pub query: Option<ProjectionQuery>,
    #[serde(default)]
    pub view: Option<DashboardView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAllReadResponse {
    pub order_ids: Vec<Uuid>,
}

/// POST /orders
pub async fn create_order(
    State(host): State<Arc<ShopHost>>,
    CurrentActor(actor): CurrentActor,
    JsonBody(input): JsonBody<NewOrder>,
) -> Result<(StatusCode, Json<Order>), WorkflowError> {
    let order = host.service.create_order(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/{id}
pub async fn get_order(
    State(host): State<Arc<ShopHost>>,
    CurrentActor(actor): CurrentActor,
    OrderId(id): OrderId,
) -> HandlerResult<Order> {
    Ok(Json(host.service.get_order(&actor, id).await?))
}

/// POST /orders/{id}/submit
pub async fn submit_for_approval(
    State(host): State<Arc<ShopHost>>,
    CurrentActor(actor): CurrentActor,
    OrderId(id): OrderId,
    JsonBody(body): JsonBody<NoteRequest>,
) -> HandlerResult<Order> {
    Ok(Json(
        host.service.submit_for_approval(&actor, id, body.note).await?,
    ))
}

/// POST /orders/{id}/customer
pub async fn update_customer(
    State(host): State<Arc<ShopHost>>,
    CurrentActor(actor): CurrentActor,
    OrderId(id): OrderId,
    JsonBody(body): JsonBody<UpdateCustomerRequest>,
) -> HandlerResult<Order> {
    let order = host
        .service
        .update_customer(&actor, id, body.customer, body.note)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/approve
pub async fn approve_order(
    State(host): State<Arc<ShopHost>>,
    CurrentActor(actor): CurrentActor,
    OrderId(id): OrderId,
    JsonBody(approval): JsonBody<Approval>,
) -> HandlerResult<Order> {
    Ok(Json(host.service.approve_order(&actor, id, approval).await?))
}

/// POST /orders/{id}/payments
pub async fn collect_payment(
    State(host): State<Arc<ShopHost>>,
    CurrentActor(actor): CurrentActor,
    OrderId(id): OrderId,
    JsonBody(payment): JsonBody<PaymentRequest>,
) -> HandlerResult<Order> {
    Ok(Json(host.service.collect_payment(&actor, id, payment).await?))
}

/// POST /orders/{id}/advance
///
/// Body: `{"event": "StartProduction", "assignedTo": "cutter-1"}`
pub async fn advance_stage(
    State(host): State<Arc<ShopHost>>,
    CurrentActor(actor): CurrentActor,
    OrderId(id): OrderId,
    JsonBody(body): JsonBody<AdvanceStageRequest>,
) -> HandlerResult<Order> {
    let order = host
        .service
        .advance_stage(&actor, id, body.event, body.assigned_to, body.note)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/alteration
pub async fn request_alteration(
    State(host): State<Arc<ShopHost>>,
    CurrentActor(actor): CurrentActor,
    OrderId(id): OrderId,
    JsonBody(body): JsonBody<AlterationRequest>,
) -> HandlerResult<Order> {
    let order = host
        .service
        .request_alteration(&actor, id, body.note, body.assigned_to)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/cancel
pub async fn cancel_order(
    State(host): State<Arc<ShopHost>>,
    CurrentActor(actor): CurrentActor,
    OrderId(id): OrderId,
    JsonBody(body): JsonBody<CancelRequest>,
) -> HandlerResult<Order> {
    Ok(Json(host.service.cancel_order(&actor, id, body.reason).await?))
}

/// POST /orders/{id}/read
pub async fn mark_read(
    State(host): State<Arc<ShopHost>>,
    CurrentActor(actor): CurrentActor,
    OrderId(id): OrderId,
) -> HandlerResult<Order> {
    Ok(Json(host.service.mark_read(&actor, id).await?))
}

/// POST /orders/read-all
pub async fn mark_all_read(
    State(host): State<Arc<ShopHost>>,
    CurrentActor(actor): CurrentActor,
    JsonBody(body): JsonBody<MarkAllReadRequest>,
) -> HandlerResult<MarkAllReadResponse> {
    let query = DashboardView::resolve(body.query, body.view, &actor);
    let order_ids = host.service.mark_all_read(&actor, &query).await?;
    Ok(Json(MarkAllReadResponse { order_ids }))
}
