//! WebSocket exposure of the live projection feed
//!
//! # Architecture
//!
//! ```text
//! Client ──ws──▶ /ws ──▶ ws_handler() ──▶ ProjectionFeed::subscribe(actor, query)
//!                                                   │
//!                                       snapshot, then diffs
//!                                                   │
//!                          forwarder task ──▶ outbound channel ──▶ Client
//! ```
//!
//! # Protocol
//!
//! Client → Server (JSON):
//! - `{"type": "subscribe", "query": {...}}` or `{"type": "subscribe", "view": "cutter_queue"}`
//! - `{"type": "unsubscribe", "subscriptionId": "..."}`
//! - `{"type": "ping"}`
//!
//! Server → Client (JSON):
//! - `{"type": "welcome", "connectionId": "..."}`
//! - `{"type": "subscribed", "subscriptionId": "..."}`
//! - `{"type": "snapshot", ...}` then `{"type": "diff", ...}`
//! - `{"type": "unsubscribed", "subscriptionId": "..."}`
//! - `{"type": "pong"}`
//! - `{"type": "error", "code": "...", "message": "..."}`

mod handler;
pub mod protocol;

use crate::server::host::ShopHost;
use anyhow::Result;
use axum::{Router, routing::get};
use std::sync::Arc;

/// WebSocket API exposure implementation
///
/// The projection feed's dispatch loop is already running inside the host, so
/// building the router only wires the `/ws` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// let host = Arc::new(ShopServerBuilder::new().build_host()?);
/// let app = RestExposure::build_router(host.clone())?
///     .merge(WebSocketExposure::build_router(host)?);
/// ```
pub struct WebSocketExposure;

impl WebSocketExposure {
    pub fn build_router(host: Arc<ShopHost>) -> Result<Router> {
        let router = Router::new()
            .route("/ws", get(handler::ws_handler))
            .with_state(host);

        Ok(router)
    }
}
