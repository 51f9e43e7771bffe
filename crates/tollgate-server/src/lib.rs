//! HTTP server assembly: service routes, MCP endpoint and middleware

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod health;
mod metrics;
mod tools;

use std::{net::SocketAddr, sync::Arc};

use axum::{Router, routing::get};
use tollgate_config::Config;
use tollgate_core::{ToolRegistry, ToolService};
use tollgate_telemetry::RequestMetrics;
use tollgate_x402::PaymentGate;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration
    ///
    /// Must run inside a Tokio runtime; the Postgres pool is created here.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let listen_address = config.server.listen_address();
        let services = &config.services;

        let mut registry = ToolRegistry::new();
        let mut app = Router::new();

        if let Some(service_config) = services.wikipedia() {
            let client = tollgate_wikipedia::build_service(service_config)?;
            app = mount(app, &mut registry, client, tollgate_wikipedia::endpoint_router());
        }

        if let Some(service_config) = services.tavily() {
            let client = tollgate_tavily::build_service(service_config)?;
            app = mount(app, &mut registry, client, tollgate_tavily::endpoint_router());
        }

        if let Some(service_config) = services.weather() {
            let client = tollgate_weather::build_service(service_config)?;
            app = mount(app, &mut registry, client, tollgate_weather::endpoint_router());
        }

        if let Some(service_config) = services.tts() {
            let service = tollgate_tts::build_service(service_config)?;
            app = mount(app, &mut registry, service, tollgate_tts::endpoint_router());
        }

        if let Some(service_config) = services.qdrant() {
            let client = tollgate_qdrant::build_service(service_config)?;
            app = mount(app, &mut registry, client, tollgate_qdrant::endpoint_router());
        }

        if let Some(service_config) = services.youtube() {
            let client = tollgate_youtube::build_service(service_config)?;
            app = mount(app, &mut registry, client, tollgate_youtube::endpoint_router());
        }

        if let Some(service_config) = services.postgres() {
            let client = tollgate_postgres::build_service(service_config)?;
            app = mount(app, &mut registry, client, tollgate_postgres::endpoint_router());
        }

        if let Some(service_config) = services.arxiv() {
            let client = tollgate_arxiv::build_service(service_config)?;
            app = mount(app, &mut registry, client, tollgate_arxiv::endpoint_router());
        }

        if registry.is_empty() {
            tracing::warn!("no services enabled, only health and metadata routes are served");
        } else {
            tracing::info!(services = ?registry.service_names(), "services enabled");
        }

        let payment = config.payment.as_ref().and_then(PaymentGate::from_config);

        // Payment gate, only in front of service routes
        if let Some(gate) = payment.clone().filter(|_| !registry.is_empty()) {
            app = app.route_layer(axum::middleware::from_fn(move |req, next| {
                let gate = Arc::clone(&gate);
                async move { tollgate_x402::payment_middleware(gate, req, next).await }
            }));
        }

        // MCP routes, charged per tool
        if config.mcp.enabled {
            app = app.merge(tollgate_mcp::mcp_router(&config.mcp, registry.clone(), payment));
        }

        let metrics = RequestMetrics::new();

        // Metadata routes are never priced
        app = app
            .route("/api/health", get(health::health_handler))
            .route("/api/tools", get(tools::tools_handler).with_state(registry))
            .route("/api/metrics", get(metrics::metrics_handler).with_state(metrics.clone()));

        // Apply middleware layers (innermost first)

        app = app.layer(RequestBodyLimitLayer::new(config.server.max_body_bytes));

        app = app.layer(axum::middleware::from_fn(move |req, next| {
            let metrics = metrics.clone();
            async move { metrics::metrics_middleware(metrics, req, next).await }
        }));

        // Tracing
        app = app.layer(TraceLayer::new_for_http());

        Ok(Self {
            router: app,
            listen_address,
        })
    }

    /// Replace the configured listen address
    #[must_use]
    pub const fn with_listen_address(mut self, listen_address: SocketAddr) -> Self {
        self.listen_address = listen_address;
        self
    }

    /// Get the configured listen address
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}

/// Register a service's tools and merge its REST routes
fn mount<S>(app: Router, registry: &mut ToolRegistry, service: Arc<S>, routes: Router<Arc<S>>) -> Router
where
    S: ToolService + 'static,
{
    registry.register(Arc::clone(&service) as Arc<dyn ToolService>);
    app.merge(routes.with_state(service))
}
