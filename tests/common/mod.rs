//! Shared fixtures for integration tests

#![allow(dead_code)]

use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::sync::Arc;
use stitchflow::config::ShopConfig;
use stitchflow::core::auth::{Actor, Role};
use stitchflow::core::order::{NewOrder, PaymentMode};
use stitchflow::core::service::OrderService;
use stitchflow::core::state_machine::PaymentRequest;
use stitchflow::storage::InMemoryOrderStore;

pub fn shirt_order_json() -> Value {
    json!({
        "customer": {"name": "Ravi Kumar", "phone": "9876543210"},
        "product": {
            "dressType": "Shirt",
            "material": "Cotton",
            "fabricColor": "White",
            "fabricSource": "Shop",
            "consumption": "2.5"
        },
        "specs": {
            "measurements": {
                "Collar": 15,
                "Chest": 40,
                "Sleeve Length": 25,
                "Shoulder": 18,
                "Shirt Length": 30
            },
            "notes": "Slim fit"
        },
        "workflow": {
            "trialDate": "2026-11-15",
            "deliveryDate": "2026-11-20",
            "priority": "Normal"
        }
    })
}

pub fn shirt_order() -> NewOrder {
    serde_json::from_value(shirt_order_json()).expect("fixture must deserialize")
}

/// A garment without a measurement template
pub fn kurta_order() -> NewOrder {
    let mut value = shirt_order_json();
    value["product"]["dressType"] = json!("Kurta");
    value["specs"]["measurements"] = json!({"Length": 42});
    serde_json::from_value(value).expect("fixture must deserialize")
}

pub fn tailor() -> Actor {
    Actor::new("tailor-1", Role::Tailor)
}

pub fn manager() -> Actor {
    Actor::new("manager-1", Role::Manager)
}

pub fn admin() -> Actor {
    Actor::new("admin-1", Role::Admin)
}

pub fn cashier() -> Actor {
    Actor::new("cashier-1", Role::Cashier)
}

pub fn cutter() -> Actor {
    Actor::new("cutter-1", Role::Cutter)
}

pub fn service() -> (OrderService, InMemoryOrderStore) {
    let store = InMemoryOrderStore::new();
    let service = OrderService::new(Arc::new(store.clone()), ShopConfig::default_config());
    (service, store)
}

pub fn payment(amount: i64, mode: PaymentMode) -> PaymentRequest {
    PaymentRequest {
        amount: Decimal::from(amount),
        mode,
        collected_by: None,
    }
}

pub fn dec(amount: i64) -> Decimal {
    Decimal::from(amount)
}
