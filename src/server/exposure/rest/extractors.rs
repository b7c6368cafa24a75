//! Axum extractors for the order API
//!
//! Every rejection is a [`WorkflowError`], so malformed ids, bodies and
//! missing identity all answer with the same `{code, message}` envelope as
//! the workflow itself.

use crate::core::auth::Actor;
use crate::core::error::{ValidationError, WorkflowError};
use crate::server::host::ShopHost;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use uuid::Uuid;

/// The caller, as resolved by the host's identity provider
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl FromRequestParts<Arc<ShopHost>> for CurrentActor {
    type Rejection = WorkflowError;

    async fn from_request_parts(
        parts: &mut Parts,
        host: &Arc<ShopHost>,
    ) -> Result<Self, Self::Rejection> {
        host.auth.extract_actor(&parts.headers).await.map(CurrentActor)
    }
}

/// Order id taken from the `{id}` path segment
#[derive(Debug, Clone, Copy)]
pub struct OrderId(pub Uuid);

impl<S> FromRequestParts<S> for OrderId
where
    S: Send + Sync,
{
    type Rejection = WorkflowError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ValidationError::field("id", e.body_text()))?;

        Uuid::parse_str(&raw)
            .map(OrderId)
            .map_err(|_| ValidationError::field("id", format!("'{}' is not a valid order id", raw)).into())
    }
}

/// JSON request body; an empty body reads as `{}`
///
/// Unlike `axum::Json` this does not insist on a `content-type` header, so
/// body-less commands such as `POST /orders/{id}/submit` work with no payload.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = WorkflowError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ValidationError::field("body", e.body_text()))?;

        let payload: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };
        Ok(JsonBody(serde_json::from_slice(payload)?))
    }
}
