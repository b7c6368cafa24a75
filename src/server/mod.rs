//! HTTP and WebSocket server over the order workflow
//!
//! `ShopServerBuilder` wires a store, a configuration and an identity provider
//! into a [`ShopHost`], then merges the REST and WebSocket exposures into one
//! Axum router.

pub mod builder;
pub mod exposure;
pub mod host;

pub use builder::ShopServerBuilder;
pub use exposure::{RestExposure, WebSocketExposure};
pub use host::ShopHost;
