//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: built-in endpoints plus the proxy fallback
//! - Configure HTTP/1.1 and HTTP/2 support
//! - Wire up middleware (request ID, tracing)
//! - Run the health monitor alongside the listener and stop both on shutdown

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ConfigError, ProxyConfig};
use crate::gateway::Gateway;
use crate::http::request::{make_span, MakeRequestUuidV4, X_REQUEST_ID};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
}

/// HTTP front of the gateway.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    gateway: Gateway,
}

impl HttpServer {
    /// Build the gateway from `config` and the router around it.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        let gateway = Gateway::build(&config)?;
        Ok(Self::with_gateway(config, gateway))
    }

    pub fn with_gateway(config: ProxyConfig, gateway: Gateway) -> Self {
        let state = AppState {
            gateway: gateway.clone(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            gateway,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Built-in paths only answer GET; other methods on them are proxied.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new().route(
            &config.gateway.health_path,
            get(health_handler).fallback(proxy_handler),
        );
        if config.gateway.expose_index && config.gateway.health_path != "/" {
            router = router.route("/", get(index_handler).fallback(proxy_handler));
        }

        router
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http().make_span_with(make_span::<Body>))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    /// Serve on `listener` until `shutdown` fires, then drain and stop the monitor.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let monitor = self
            .gateway
            .health_monitor(&self.config)
            .spawn(shutdown.resubscribe());

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        if let Err(e) = monitor.await {
            tracing::error!(error = %e, "Health monitor task failed");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.gateway.handle(request).await
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let report = state.gateway.health_report();
    let status = report.status_code();
    (status, Json(report)).into_response()
}

async fn index_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let services: Vec<&str> = state.gateway.pool().services().map(|s| s.name()).collect();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Welcome to the API Gateway",
            "services": services,
        })),
    )
}
