//! API Exposure modules for different protocols
//!
//! Each exposure type consumes a `ShopHost` and produces a Router for that protocol.

pub mod rest;
pub mod websocket;

pub use rest::RestExposure;
pub use websocket::WebSocketExposure;
