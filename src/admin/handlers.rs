use axum::{extract::State, Json};
use serde::Serialize;

use crate::gateway::Gateway;
use crate::health::{GatewayStatus, HealthReport};
use crate::load_balancer::EndpointSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: GatewayStatus,
    pub services: usize,
    pub endpoints: usize,
}

#[derive(Serialize)]
pub struct ServiceBackends {
    pub service: String,
    pub endpoints: Vec<EndpointSnapshot>,
}

#[derive(Serialize)]
pub struct RouteEntry {
    pub prefix: String,
    pub service: String,
}

pub async fn get_status(State(gateway): State<Gateway>) -> Json<SystemStatus> {
    let report = HealthReport::from_pool(gateway.pool());
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: report.gateway_status,
        services: report.per_service.len(),
        endpoints: gateway.pool().all_endpoints().len(),
    })
}

pub async fn get_backends(State(gateway): State<Gateway>) -> Json<Vec<ServiceBackends>> {
    let backends = gateway
        .pool()
        .services()
        .map(|service| ServiceBackends {
            service: service.name().to_string(),
            endpoints: service.endpoints().iter().map(|e| e.snapshot()).collect(),
        })
        .collect();
    Json(backends)
}

/// Routes in match order.
pub async fn get_routes(State(gateway): State<Gateway>) -> Json<Vec<RouteEntry>> {
    let routes = gateway
        .routes()
        .routes()
        .iter()
        .map(|route| RouteEntry {
            prefix: route.prefix().to_string(),
            service: route.service().to_string(),
        })
        .collect();
    Json(routes)
}
