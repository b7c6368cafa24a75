//! Core module containing the order model, the state machine and its seams

pub mod auth;
pub mod error;
pub mod events;
pub mod financial;
pub mod order;
pub mod service;
pub mod state_machine;
pub mod store;
pub mod timeline;

pub use auth::{Actor, AuthProvider, FixedAuthProvider, HeaderAuthProvider, Role, RoleGate};
pub use error::{ErrorResponse, ValidationError, WorkflowError};
pub use events::{ChangeKind, EventBus, OrderChange};
pub use order::{
    Customer, DressType, FabricSource, Financial, NewOrder, Order, OrderStatus, Payment,
    PaymentMode, PaymentType, Priority, Product, Specs, Workflow,
};
pub use service::OrderService;
pub use state_machine::{Approval, Command, OrderEvent, PaymentRequest, Transition};
pub use store::{OrderStore, StoredOrder};
pub use timeline::{ReplayError, Stage, Timeline, TimelineEntry};
