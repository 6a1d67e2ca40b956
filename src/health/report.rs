//! Aggregate gateway health.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use serde::Serialize;

use crate::load_balancer::BackendPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    /// Every service has a healthy endpoint.
    Healthy,
    /// Some service has none.
    Degraded,
    /// No service has one.
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub healthy_count: usize,
    pub total_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub gateway_status: GatewayStatus,
    pub per_service: BTreeMap<String, ServiceHealth>,
}

impl HealthReport {
    pub fn from_pool(pool: &BackendPool) -> Self {
        let per_service: BTreeMap<String, ServiceHealth> = pool
            .services()
            .map(|service| {
                (
                    service.name().to_string(),
                    ServiceHealth {
                        healthy_count: service.healthy_count(),
                        total_count: service.endpoints().len(),
                    },
                )
            })
            .collect();

        let down = per_service.values().filter(|s| s.healthy_count == 0).count();
        let gateway_status = match down {
            0 => GatewayStatus::Healthy,
            n if n == per_service.len() => GatewayStatus::Unhealthy,
            _ => GatewayStatus::Degraded,
        };

        Self {
            gateway_status,
            per_service,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.gateway_status {
            GatewayStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::OK,
        }
    }
}
