//! REST surface tests using axum-test
//!
//! Every request carries the identity headers the gateway would set; the
//! tests check status codes, the error envelope and the persisted layout of
//! the returned orders.

mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use common::*;
use serde_json::{Value, json};
use stitchflow::core::auth::{Actor, USER_ID_HEADER, USER_ROLE_HEADER};
use stitchflow::core::store::OrderStore;
use stitchflow::server::ShopServerBuilder;
use stitchflow::storage::InMemoryOrderStore;

fn create_test_server() -> (TestServer, InMemoryOrderStore) {
    let store = InMemoryOrderStore::new();
    let app = ShopServerBuilder::new()
        .with_store(store.clone())
        .build()
        .expect("Failed to build app");
    let server = TestServer::try_new(app).expect("Failed to create test server");
    (server, store)
}

fn as_actor(request: TestRequest, actor: &Actor) -> TestRequest {
    request
        .add_header(
            HeaderName::from_static(USER_ID_HEADER),
            HeaderValue::from_str(&actor.user_id).unwrap(),
        )
        .add_header(
            HeaderName::from_static(USER_ROLE_HEADER),
            HeaderValue::from_static(actor.role.as_str()),
        )
}

async fn create_order(server: &TestServer) -> Value {
    let response = as_actor(server.post("/orders"), &tailor())
        .json(&shirt_order_json())
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

fn order_path(order: &Value, action: &str) -> String {
    let id = order["id"].as_str().unwrap();
    if action.is_empty() {
        format!("/orders/{}", id)
    } else {
        format!("/orders/{}/{}", id, action)
    }
}

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint() {
        let (server, _) = create_test_server();

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "stitchflow");
    }

    #[tokio::test]
    async fn test_healthz_endpoint() {
        let (server, _) = create_test_server();
        server.get("/healthz").await.assert_status_ok();
    }
}

mod mutation_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_order_returns_pending_document() {
        let (server, store) = create_test_server();
        let order = create_order(&server).await;

        assert_eq!(order["status"], "Pending");
        assert_eq!(order["isRead"], false);
        assert_eq!(order["product"]["dressType"], "Shirt");
        assert_eq!(order["timeline"][0]["stage"], "Order Created");
        assert_eq!(order["financial"]["payments"], json!([]));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_approve_then_collect_advance() {
        let (server, _) = create_test_server();
        let order = create_order(&server).await;

        let response = as_actor(server.post(&order_path(&order, "approve")), &manager())
            .json(&json!({"totalPrice": "5000"}))
            .await;
        response.assert_status_ok();
        let approved: Value = response.json();
        assert_eq!(approved["status"], "PAYMENT_PENDING");
        assert_eq!(approved["financial"]["advanceAmount"], "2500");
        assert_eq!(approved["financial"]["balanceAmount"], "2500");

        let response = as_actor(server.post(&order_path(&order, "payments")), &cashier())
            .json(&json!({"amount": "2500", "mode": "UPI"}))
            .await;
        response.assert_status_ok();
        let paid: Value = response.json();
        assert_eq!(paid["status"], "ADVANCE_PAID");
        assert_eq!(paid["financial"]["isPaid"], true);
        assert_eq!(paid["financial"]["payments"][0]["type"], "advance");
        assert_eq!(paid["financial"]["payments"][0]["mode"], "UPI");
        assert_eq!(paid["financial"]["payments"][0]["collectedBy"], "cashier-1");
    }

    #[tokio::test]
    async fn test_submit_accepts_empty_body() {
        let (server, _) = create_test_server();
        let order = create_order(&server).await;

        let response = as_actor(server.post(&order_path(&order, "submit")), &tailor()).await;
        response.assert_status_ok();
        let submitted: Value = response.json();
        assert_eq!(submitted["status"], "Pending_Approval");
        assert_eq!(submitted["timeline"][1]["stage"], "Submitted For Approval");
    }

    #[tokio::test]
    async fn test_update_customer_before_approval() {
        let (server, _) = create_test_server();
        let order = create_order(&server).await;

        let response = as_actor(server.post(&order_path(&order, "customer")), &tailor())
            .json(&json!({
                "customer": {"name": "Ravi K.", "phone": "9000000000"},
                "note": "Phone corrected"
            }))
            .await;
        response.assert_status_ok();
        let updated: Value = response.json();
        assert_eq!(updated["customer"]["phone"], "9000000000");
        assert_eq!(updated["status"], "Pending");
        assert_eq!(updated["timeline"][1]["note"], "Phone corrected");
    }

    #[tokio::test]
    async fn test_production_flow_through_advance_endpoint() {
        let (server, _) = create_test_server();
        let order = create_order(&server).await;

        as_actor(server.post(&order_path(&order, "approve")), &manager())
            .await
            .assert_status_ok();
        as_actor(server.post(&order_path(&order, "payments")), &cashier())
            .json(&json!({"amount": 300, "mode": "Cash"}))
            .await
            .assert_status_ok();

        let response = as_actor(server.post(&order_path(&order, "advance")), &cutter())
            .json(&json!({"event": "StartProduction"}))
            .await;
        response.assert_status_ok();
        let started: Value = response.json();
        assert_eq!(started["status"], "CUTTING_READY");
        assert_eq!(started["assignedTo"], "cutter-1");

        let response = as_actor(server.post(&order_path(&order, "advance")), &cutter())
            .json(&json!({"event": "Complete", "note": "Cut done"}))
            .await;
        response.assert_status_ok();
        let cut: Value = response.json();
        assert_eq!(cut["status"], "CUTTING_COMPLETED");
        assert_eq!(cut["timeline"][4]["note"], "Cut done");
    }

    #[tokio::test]
    async fn test_mark_read_and_read_all() {
        let (server, _) = create_test_server();
        let first = create_order(&server).await;
        create_order(&server).await;

        let response = as_actor(server.post(&order_path(&first, "read")), &manager()).await;
        response.assert_status_ok();
        let read: Value = response.json();
        assert_eq!(read["isRead"], true);
        assert_eq!(read["timeline"].as_array().unwrap().len(), 1);

        let response = as_actor(server.post("/orders/read-all"), &manager())
            .json(&json!({"view": "manager_inbox"}))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["orderIds"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_requires_reason() {
        let (server, _) = create_test_server();
        let order = create_order(&server).await;

        let response = as_actor(server.post(&order_path(&order, "cancel")), &manager()).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = as_actor(server.post(&order_path(&order, "cancel")), &manager())
            .json(&json!({"reason": "Customer withdrew"}))
            .await;
        response.assert_status_ok();
        let cancelled: Value = response.json();
        assert_eq!(cancelled["status"], "Cancelled");
    }
}

mod error_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_identity_is_validation_error() {
        let (server, _) = create_test_server();

        let response = server.post("/orders").json(&shirt_order_json()).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["message"].as_str().unwrap().contains(USER_ID_HEADER));
    }

    #[tokio::test]
    async fn test_wrong_role_is_forbidden() {
        let (server, store) = create_test_server();
        let order = create_order(&server).await;

        let response = as_actor(server.post(&order_path(&order, "approve")), &cashier()).await;
        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["code"], "UNAUTHORIZED");
        assert_eq!(body["details"]["role"], "Cashier");

        let stored = &store.list().await.unwrap()[0];
        assert_eq!(stored.revision, 1);
    }

    #[tokio::test]
    async fn test_invalid_transition_is_conflict() {
        let (server, _) = create_test_server();
        let order = create_order(&server).await;

        let response = as_actor(server.post(&order_path(&order, "payments")), &cashier())
            .json(&json!({"amount": 100, "mode": "Cash"}))
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["code"], "INVALID_TRANSITION");
        assert_eq!(body["details"]["from"], "Pending");
        assert_eq!(body["details"]["event"], "CollectPayment");
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let (server, _) = create_test_server();

        let response = as_actor(
            server.get("/orders/7d9f1c1e-3b1a-4f57-9a43-2f0c6a7e8b90"),
            &manager(),
        )
        .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["code"], "ORDER_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_id_and_body_are_validation_errors() {
        let (server, _) = create_test_server();

        let response = as_actor(server.get("/orders/not-a-uuid"), &manager()).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let response = as_actor(server.post("/orders"), &tailor())
            .json(&json!({"customer": {"name": "No product"}}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_store_outage_is_service_unavailable() {
        let (server, store) = create_test_server();
        let order = create_order(&server).await;
        store.set_offline(true);

        let response = as_actor(server.get(&order_path(&order, "")), &manager()).await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json();
        assert_eq!(body["code"], "STORE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_cashier_cannot_read_pending_order() {
        let (server, _) = create_test_server();
        let order = create_order(&server).await;

        let response = as_actor(server.get(&order_path(&order, "")), &cashier()).await;
        response.assert_status(StatusCode::FORBIDDEN);
    }
}
