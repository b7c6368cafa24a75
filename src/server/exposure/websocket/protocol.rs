//! WebSocket message protocol definitions
//!
//! Defines the JSON messages exchanged between WebSocket clients and the server.
//! Message types are snake_case; every field is camelCase, like the orders
//! they carry.
//!
//! ## Client → Server Messages
//!
//! ```json
//! // Open a live projection
//! {"type": "subscribe", "query": {"predicate": {"statuses": ["PAYMENT_PENDING"]}, "limit": 20}}
//!
//! // Or one of the role dashboards by name
//! {"type": "subscribe", "view": "manager_inbox"}
//!
//! // Close it
//! {"type": "unsubscribe", "subscriptionId": "sub_abc123"}
//!
//! // Keepalive
//! {"type": "ping"}
//! ```
//!
//! ## Server → Client Messages
//!
//! ```json
//! {"type": "welcome", "connectionId": "conn_..."}
//! {"type": "subscribed", "subscriptionId": "sub_abc123"}
//! {"type": "snapshot", "subscriptionId": "sub_abc123", "orders": [...], "unreadCount": 3}
//! {"type": "diff", "subscriptionId": "sub_abc123", "added": [...], "updated": [...], "removed": [...], "unreadCount": 2}
//! {"type": "unsubscribed", "subscriptionId": "sub_abc123"}
//! {"type": "pong"}
//! {"type": "error", "code": "UNAUTHORIZED", "message": "..."}
//! ```

use crate::projection::{DashboardView, FeedMessage, ProjectionQuery};
use serde::{Deserialize, Serialize};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Open a projection from an explicit query or a named view
    Subscribe {
        #[serde(default)]
        query: Option<ProjectionQuery>,
        #[serde(default)]
        view: Option<DashboardView>,
    },
    Unsubscribe {
        subscription_id: String,
    },
    /// Keepalive ping
    Ping,
}

/// Control messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Welcome {
        connection_id: String,
    },
    /// Sent before the subscription's first snapshot
    Subscribed {
        subscription_id: String,
    },
    Unsubscribed {
        subscription_id: String,
    },
    Pong,
    Error {
        code: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Everything written to the socket: control replies and feed pushes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Outbound {
    Control(ServerMessage),
    Feed(FeedMessage),
}

impl From<ServerMessage> for Outbound {
    fn from(msg: ServerMessage) -> Self {
        Outbound::Control(msg)
    }
}

impl From<FeedMessage> for Outbound {
    fn from(msg: FeedMessage) -> Self {
        Outbound::Feed(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::{Actor, Role};
    use crate::core::order::OrderStatus;
    use serde_json::json;

    #[test]
    fn test_subscribe_with_query() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "subscribe",
            "query": {"predicate": {"statuses": ["PAYMENT_PENDING"]}, "limit": 5}
        }))
        .unwrap();

        match msg {
            ClientMessage::Subscribe { query, view } => {
                let query = query.unwrap();
                assert_eq!(query.predicate.statuses, vec![OrderStatus::PaymentPending]);
                assert_eq!(query.limit, Some(5));
                assert!(view.is_none());
            }
            other => panic!("Expected Subscribe, got {:?}", other),
        }
    }

    #[test]
    fn test_subscribe_with_view_resolves_for_actor() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","view":"work_queue"}"#).unwrap();
        let actor = Actor::new("cutter-7", Role::Cutter);

        let ClientMessage::Subscribe { query, view } = msg else {
            panic!("Expected Subscribe");
        };
        let resolved = DashboardView::resolve(query, view, &actor);
        assert_eq!(resolved.predicate.assigned_to.as_deref(), Some("cutter-7"));
    }

    #[test]
    fn test_ping_and_unsubscribe() {
        let ping: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, ClientMessage::Ping));

        let unsub: ClientMessage =
            serde_json::from_str(r#"{"type":"unsubscribe","subscriptionId":"sub_1"}"#).unwrap();
        assert!(matches!(
            unsub,
            ClientMessage::Unsubscribe { subscription_id } if subscription_id == "sub_1"
        ));
    }

    #[test]
    fn test_unknown_message_type_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"explode"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>("not json").is_err());
    }

    #[test]
    fn test_outbound_serialization_keeps_single_type_tag() {
        let control = serde_json::to_value(Outbound::from(ServerMessage::Pong)).unwrap();
        assert_eq!(control, json!({"type": "pong"}));

        let feed = serde_json::to_value(Outbound::from(FeedMessage::Snapshot {
            subscription_id: "sub_1".into(),
            orders: vec![],
            unread_count: 0,
        }))
        .unwrap();
        assert_eq!(feed["type"], "snapshot");
        assert_eq!(feed["subscriptionId"], "sub_1");
        assert_eq!(feed["unreadCount"], 0);

        let subscribed = serde_json::to_value(Outbound::from(ServerMessage::Subscribed {
            subscription_id: "sub_1".into(),
        }))
        .unwrap();
        assert_eq!(subscribed, json!({"type": "subscribed", "subscriptionId": "sub_1"}));
    }

    #[test]
    fn test_error_message_shape() {
        let value = serde_json::to_value(ServerMessage::error("UNAUTHORIZED", "nope")).unwrap();
        assert_eq!(
            value,
            json!({"type": "error", "code": "UNAUTHORIZED", "message": "nope"})
        );
    }
}
