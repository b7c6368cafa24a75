//! # StitchFlow
//!
//! Order workflow engine for a tailoring shop: a role-gated state machine over
//! each garment order, the payment ledger attached to it, an append-only
//! timeline, and live per-role projections pushed to clients as diffs.
//!
//! ## Features
//!
//! - **State machine**: a static transition table; every accepted event appends
//!   exactly one timeline entry in the same atomic write
//! - **Ledger**: exact decimal money, advance/balance payments, derived balance
//! - **Role gate**: write and read permissions per role, checked before any write
//! - **Live projections**: snapshot then diffs, windowed and sorted, with an
//!   unread count over the whole matching set
//! - **Transports**: REST for mutations, WebSocket for the feed
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stitchflow::prelude::*;
//!
//! let store = Arc::new(InMemoryOrderStore::new());
//! let service = OrderService::new(store, ShopConfig::default_config());
//!
//! let tailor = Actor::new("tailor-1", Role::Tailor);
//! let order = service.create_order(&tailor, new_order).await?;
//!
//! let manager = Actor::new("manager-1", Role::Manager);
//! let order = service.approve_order(&manager, order.id, Approval::default()).await?;
//! assert_eq!(order.status, OrderStatus::PaymentPending);
//! ```

pub mod config;
pub mod core;
pub mod projection;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        Actor, Approval, AuthProvider, Command, Customer, DressType, FabricSource, Financial,
        FixedAuthProvider, HeaderAuthProvider, NewOrder, Order, OrderEvent, OrderService,
        OrderStatus, OrderStore, Payment, PaymentMode, PaymentRequest, PaymentType, Priority,
        Product, Role, RoleGate, Specs, Stage, StoredOrder, Timeline, TimelineEntry,
        ValidationError, Workflow, WorkflowError,
    };

    // === Projections ===
    pub use crate::projection::{
        DashboardView, FeedMessage, LocalView, Predicate, ProjectionFeed, ProjectionQuery,
        SortDirection, SortField, SortKey,
    };

    // === Storage ===
    pub use crate::storage::InMemoryOrderStore;

    // === Config ===
    pub use crate::config::{RateCard, ShopConfig};

    // === Server ===
    pub use crate::server::{RestExposure, ShopHost, ShopServerBuilder, WebSocketExposure};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use chrono::{DateTime, NaiveDate, Utc};
    pub use rust_decimal::Decimal;
    pub use std::sync::Arc;
    pub use uuid::Uuid;
}
