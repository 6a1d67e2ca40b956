//! Forwarding engine.
//!
//! # Responsibilities
//! - Dispatch a routed request to an endpoint chosen by the load balancer
//! - Bound each attempt by its deadline and retry what may be retried
//! - Record exactly one result per attempt that reached the upstream client
//! - Relay the upstream response as a stream, aborting it if the body stalls
//!   for longer than the attempt budget
//!
//! # Design Decisions
//! - Admission rejections are not backend failures and record no result
//! - Upstream 502/503/504 are relayed as-is but count as failures
//! - Outbound requests are always HTTP/1.1, whatever the inbound version
//! - A caller that goes away drops this future, and with it the attempt
//!   and its in-flight guard

use std::sync::Arc;

use axum::body::Body;
use axum::http::{request::Parts, Request, Response, StatusCode, Version};

use crate::config::ProxyConfig;
use crate::error::GatewayError;
use crate::forwarding::attempt::{classify, Attempt};
use crate::forwarding::body::ReplayableBody;
use crate::forwarding::client::{build_client, UpstreamClient, UpstreamResponse};
use crate::http::headers::strip_hop_by_hop;
use crate::http::request::request_id;
use crate::http::response::relay;
use crate::load_balancer::{Endpoint, LoadBalancer};
use crate::observability::metrics;
use crate::resilience::{retries, timeouts, AdmissionControl, Backoff};
use crate::routing::ResolvedRoute;

#[derive(Debug, Clone)]
pub struct ForwardingEngine {
    balancer: Arc<LoadBalancer>,
    client: UpstreamClient,
    admission: AdmissionControl,
    backoff: Backoff,
    replay_cap: usize,
}

impl ForwardingEngine {
    pub fn new(
        balancer: Arc<LoadBalancer>,
        client: UpstreamClient,
        admission: AdmissionControl,
        backoff: Backoff,
        replay_cap: usize,
    ) -> Self {
        Self {
            balancer,
            client,
            admission,
            backoff,
            replay_cap,
        }
    }

    pub fn from_config(balancer: Arc<LoadBalancer>, config: &ProxyConfig) -> Self {
        Self::new(
            balancer,
            build_client(&config.timeouts, &config.upstream),
            AdmissionControl::new(&config.admission),
            Backoff::from_config(&config.retries),
            config.retries.max_replay_body_bytes,
        )
    }

    /// Forward `request` to the service named by `route`.
    pub async fn forward(
        &self,
        request: Request<Body>,
        route: &ResolvedRoute,
    ) -> Result<Response<Body>, GatewayError> {
        let service = self
            .balancer
            .pool()
            .service(&route.service)
            .ok_or_else(|| GatewayError::NoEndpointAvailable(route.service.to_string()))?
            .clone();
        let max_retries = service.max_retries();

        let (mut parts, body) = request.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        let request_id = request_id(&parts.headers).to_string();

        let mut body = if max_retries == 0 {
            ReplayableBody::streaming(body)
        } else {
            ReplayableBody::read(body, self.replay_cap).await?
        };
        if max_retries > 0 && body.is_streaming() {
            let info = GatewayError::BodyTooLargeForRetry {
                limit: self.replay_cap,
            };
            tracing::info!(request_id = %request_id, service = service.name(), "{}", info);
        }

        let mut tried: Vec<Arc<Endpoint>> = Vec::new();
        let mut endpoint = self.balancer.select(service.name(), &tried)?;
        let mut retry = 0u32;
        loop {
            let attempt = Attempt::new(endpoint, retry, service.attempt_timeout());
            let err = match self.attempt(&parts, &mut body, &attempt, route, &request_id).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };
            tried.push(attempt.endpoint.clone());

            let retryable = retry < max_retries
                && body.can_replay()
                && retries::is_retryable(&err, &parts.method);
            if !retryable {
                return Err(err);
            }

            retry += 1;
            let delay = self.backoff.delay(retry);
            metrics::record_retry(service.name());
            tracing::info!(
                request_id = %request_id,
                service = service.name(),
                endpoint = attempt.endpoint.address(),
                retry,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying request"
            );
            tokio::time::sleep(delay).await;

            // Nothing left to retry on: the caller sees the last attempt's error.
            endpoint = match self.balancer.select(service.name(), &tried) {
                Ok(next) => next,
                Err(_) => return Err(err),
            };
        }
    }

    async fn attempt(
        &self,
        parts: &Parts,
        body: &mut ReplayableBody,
        attempt: &Attempt,
        route: &ResolvedRoute,
        request_id: &str,
    ) -> Result<Response<Body>, GatewayError> {
        let endpoint = &attempt.endpoint;
        let address = endpoint.address();

        let guard = match self.admission.admit(endpoint).await {
            Ok(guard) => guard,
            Err(err) => {
                metrics::record_attempt(&route.service, address, err.kind());
                tracing::warn!(request_id, endpoint = address, "Endpoint at capacity");
                return Err(err);
            }
        };

        let outbound = build_outbound(parts, endpoint, &route.path_and_query, body.take())?;

        tracing::debug!(
            request_id,
            endpoint = address,
            attempt = attempt.number,
            uri = %outbound.uri(),
            "Dispatching upstream request"
        );

        let result: Result<UpstreamResponse, GatewayError> =
            timeouts::until_deadline(address, attempt.deadline, attempt.budget, async {
                self.client
                    .request(outbound)
                    .await
                    .map_err(|e| classify(address, &e))
            })
            .await;
        let latency = attempt.elapsed();

        match result {
            Ok(response) => {
                let status = response.status();
                let success = !is_gateway_failure(status);
                self.balancer.pool().mark_result(endpoint, success, latency);
                metrics::record_attempt(&route.service, address, if success { "ok" } else { "upstream_5xx" });
                tracing::debug!(
                    request_id,
                    endpoint = address,
                    attempt = attempt.number,
                    status = status.as_u16(),
                    latency_ms = latency.as_millis() as u64,
                    "Upstream responded"
                );
                Ok(relay(response, guard, attempt.budget))
            }
            Err(err) => {
                self.balancer.pool().mark_result(endpoint, false, latency);
                metrics::record_attempt(&route.service, address, err.kind());
                tracing::warn!(
                    request_id,
                    endpoint = address,
                    attempt = attempt.number,
                    latency_ms = latency.as_millis() as u64,
                    error = %err,
                    "Upstream attempt failed"
                );
                Err(err)
            }
        }
    }
}

/// Outbound HTTP/1.1 request for `endpoint`, carrying the already-stripped headers.
fn build_outbound(
    parts: &Parts,
    endpoint: &Endpoint,
    path_and_query: &str,
    body: Option<Body>,
) -> Result<Request<Body>, GatewayError> {
    let uri = endpoint
        .uri_for(path_and_query)
        .map_err(|e| GatewayError::Internal(format!("invalid upstream uri: {e}")))?;
    let mut outbound = Request::builder()
        .method(parts.method.clone())
        .uri(uri)
        .version(Version::HTTP_11)
        .body(body.unwrap_or_else(Body::empty))
        .map_err(|e| GatewayError::Internal(format!("invalid upstream request: {e}")))?;
    *outbound.headers_mut() = parts.headers.clone();
    Ok(outbound)
}

/// Upstream statuses that say the upstream itself could not serve.
fn is_gateway_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}
