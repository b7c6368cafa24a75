//! ShopServerBuilder for fluent API to build HTTP servers

use super::exposure::{RestExposure, WebSocketExposure};
use super::host::ShopHost;
use crate::config::ShopConfig;
use crate::core::auth::{AuthProvider, HeaderAuthProvider};
use crate::core::events::EventBus;
use crate::core::store::OrderStore;
use crate::storage::InMemoryOrderStore;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Builder for the order workflow server
///
/// # Example
///
/// ```ignore
/// let app = ShopServerBuilder::new()
///     .with_config(ShopConfig::from_yaml_file("shop.yaml")?)
///     .build()?;
/// ```
pub struct ShopServerBuilder {
    config: ShopConfig,
    store: Option<Arc<dyn OrderStore>>,
    auth: Option<Arc<dyn AuthProvider>>,
    custom_routes: Vec<Router>,
}

impl ShopServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ShopConfig::default_config(),
            store: None,
            auth: None,
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: ShopConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a specific store; defaults to an in-memory store sized from the config
    pub fn with_store(mut self, store: impl OrderStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Use a specific identity provider; defaults to [`HeaderAuthProvider`]
    pub fn with_auth_provider(mut self, auth: impl AuthProvider + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    /// Add routes that are not part of the order API
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the transport-agnostic host
    ///
    /// Starts the projection dispatch loop, so it must run inside a Tokio
    /// runtime.
    pub fn build_host(self) -> Result<ShopHost> {
        self.config.validate()?;

        let store = self.store.unwrap_or_else(|| {
            Arc::new(InMemoryOrderStore::with_event_bus(EventBus::new(
                self.config.event_bus_capacity,
            )))
        });
        let auth = self.auth.unwrap_or_else(|| Arc::new(HeaderAuthProvider));

        Ok(ShopHost::new(store, self.config, auth))
    }

    /// Build the REST + WebSocket router with request tracing
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);

        let mut app = RestExposure::build_router(host.clone())?
            .merge(WebSocketExposure::build_router(host)?);
        for routes in custom_routes {
            app = app.merge(routes);
        }

        Ok(app.layer(TraceLayer::new_for_http()))
    }

    /// Serve the application with graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ShopServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
