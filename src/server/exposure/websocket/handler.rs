//! WebSocket upgrade handler and message loop
//!
//! The actor is resolved from the upgrade request's headers, before the
//! protocol switch, so an unauthenticated client gets a plain HTTP error.
//! Each connection then gets:
//!
//! 1. A welcome message with its unique connection ID
//! 2. A write loop draining one outbound channel into the socket
//! 3. One forwarder task per projection subscription feeding that channel
//! 4. A read loop that processes client messages (subscribe, unsubscribe, ping)

use super::protocol::{ClientMessage, Outbound, ServerMessage};
use crate::core::auth::Actor;
use crate::projection::{DashboardView, ProjectionQuery};
use crate::server::host::ShopHost;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::SinkExt;
use futures::stream::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// WebSocket upgrade handler for GET /ws
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(host): State<Arc<ShopHost>>,
    headers: HeaderMap,
) -> Response {
    let actor = match host.auth.extract_actor(&headers).await {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    ws.on_upgrade(move |socket| handle_socket(socket, host, actor))
}

/// Per-connection state owned by the read loop
struct Connection {
    id: String,
    actor: Actor,
    host: Arc<ShopHost>,
    tx: mpsc::UnboundedSender<Outbound>,
    forwarders: HashMap<String, JoinHandle<()>>,
}

impl Connection {
    fn send(&self, msg: impl Into<Outbound>) {
        // Only fails once the write loop is gone, and then the read loop ends too
        let _ = self.tx.send(msg.into());
    }

    async fn handle_text(&mut self, text: &str) {
        let msg: ClientMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                self.send(ServerMessage::error(
                    "VALIDATION_ERROR",
                    format!("Invalid message: {}", e),
                ));
                return;
            }
        };

        match msg {
            ClientMessage::Subscribe { query, view } => {
                let query = DashboardView::resolve(query, view, &self.actor);
                self.subscribe(query).await;
            }
            ClientMessage::Unsubscribe { subscription_id } => {
                self.unsubscribe(subscription_id).await;
            }
            ClientMessage::Ping => self.send(ServerMessage::Pong),
        }
    }

    async fn subscribe(&mut self, query: ProjectionQuery) {
        let subscription = match self.host.feed.subscribe(&self.actor, query).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.send(ServerMessage::error(e.error_code(), e.to_string()));
                return;
            }
        };

        let subscription_id = subscription.id().to_string();
        // Queued ahead of the snapshot, which only the forwarder can emit
        self.send(ServerMessage::Subscribed {
            subscription_id: subscription_id.clone(),
        });

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let mut stream = subscription.into_stream();
            while let Some(msg) = stream.next().await {
                if tx.send(msg.into()).is_err() {
                    break;
                }
            }
        });

        tracing::debug!(
            connection_id = %self.id,
            subscription_id = %subscription_id,
            "WebSocket subscription opened"
        );
        self.forwarders.insert(subscription_id, handle);
    }

    async fn unsubscribe(&mut self, subscription_id: String) {
        match self.forwarders.remove(&subscription_id) {
            Some(handle) => {
                self.host.feed.unsubscribe(&subscription_id).await;
                handle.abort();
                self.send(ServerMessage::Unsubscribed { subscription_id });
            }
            None => self.send(ServerMessage::error(
                "VALIDATION_ERROR",
                format!("Subscription {} not found", subscription_id),
            )),
        }
    }

    async fn close(mut self) {
        for (subscription_id, handle) in self.forwarders.drain() {
            self.host.feed.unsubscribe(&subscription_id).await;
            handle.abort();
        }
        tracing::debug!(connection_id = %self.id, "WebSocket connection closed");
    }
}

async fn handle_socket(socket: WebSocket, host: Arc<ShopHost>, actor: Actor) {
    let connection_id = format!("conn_{}", Uuid::new_v4().simple());
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    let (mut ws_write, mut ws_read) = socket.split();

    tracing::debug!(
        connection_id = %connection_id,
        user_id = %actor.user_id,
        role = %actor.role,
        "WebSocket connection opened"
    );

    let conn_id_write = connection_id.clone();
    let write_handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_write.send(Message::Text(json.into())).await.is_err() {
                        tracing::debug!(
                            connection_id = %conn_id_write,
                            "WebSocket write failed, closing"
                        );
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        connection_id = %conn_id_write,
                        error = %e,
                        "Failed to serialize outbound message"
                    );
                }
            }
        }
    });

    let mut connection = Connection {
        id: connection_id.clone(),
        actor,
        host,
        tx,
        forwarders: HashMap::new(),
    };
    connection.send(ServerMessage::Welcome { connection_id });

    while let Some(result) = ws_read.next().await {
        match result {
            Ok(Message::Text(text)) => {
                connection.handle_text(&text).await;
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(connection_id = %connection.id, "Client sent close frame");
                break;
            }
            Ok(_) => {
                // Pings are answered by axum; binary frames are ignored
            }
            Err(e) => {
                tracing::debug!(
                    connection_id = %connection.id,
                    error = %e,
                    "WebSocket read error"
                );
                break;
            }
        }
    }

    connection.close().await;
    write_handle.abort();
}
