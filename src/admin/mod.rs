//! Admin listener.
//!
//! Read-only views of the gateway state. There is no authentication, so the
//! listener binds to loopback by default.

pub mod handlers;

use axum::{routing::get, Router};

use self::handlers::*;
use crate::gateway::Gateway;

pub fn setup_admin_router(gateway: Gateway) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/backends", get(get_backends))
        .route("/admin/routes", get(get_routes))
        .with_state(gateway)
}
