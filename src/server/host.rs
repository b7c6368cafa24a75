//! Server host shared by every exposure
//!
//! `ShopHost` bundles the state a transport needs: the mutation service, the
//! live projection feed and the identity provider. It knows nothing about
//! HTTP or WebSockets; each exposure consumes it and produces a router.

use crate::config::ShopConfig;
use crate::core::auth::AuthProvider;
use crate::core::service::OrderService;
use crate::core::store::OrderStore;
use crate::projection::ProjectionFeed;
use std::sync::Arc;

/// Host context containing all engine state
///
/// # Example
///
/// ```rust,ignore
/// let host = Arc::new(ShopHost::new(store, config, Arc::new(HeaderAuthProvider)));
/// let rest_app = RestExposure::build_router(host.clone())?;
/// let ws_app = WebSocketExposure::build_router(host)?;
/// ```
pub struct ShopHost {
    pub service: OrderService,
    pub feed: Arc<ProjectionFeed>,
    pub auth: Arc<dyn AuthProvider>,
}

impl ShopHost {
    /// Wire the service and start the feed's dispatch loop
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(store: Arc<dyn OrderStore>, config: ShopConfig, auth: Arc<dyn AuthProvider>) -> Self {
        let feed = ProjectionFeed::start(store.clone(), config.feed.default_limit);
        Self {
            service: OrderService::new(store, config),
            feed,
            auth,
        }
    }

    pub fn config(&self) -> &ShopConfig {
        self.service.config()
    }
}
