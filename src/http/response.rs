//! Response relay.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers from the upstream response
//! - Stream the upstream body back without buffering
//! - Keep the endpoint's in-flight slot until that body is finished
//! - Abort a body that stops producing frames for longer than the idle timeout
//!
//! The in-flight guard rides inside the body: it is released when the body
//! ends, errors, stalls, or is dropped because the caller went away.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::Response;
use axum::BoxError;
use bytes::Bytes;
use http_body::{Frame, SizeHint};
use thiserror::Error;
use tokio::time::{Instant, Sleep};

use crate::http::headers::strip_hop_by_hop;
use crate::load_balancer::InFlightGuard;

/// The upstream sent no body frame within the idle timeout.
#[derive(Debug, Error)]
#[error("upstream {endpoint} body stalled for {idle:?}")]
pub struct BodyStalled {
    pub endpoint: String,
    pub idle: Duration,
}

/// Body wrapper that holds an in-flight guard until the stream is done.
#[derive(Debug)]
pub struct GuardedBody<B> {
    inner: B,
    guard: Option<InFlightGuard>,
    idle: Duration,
    timer: Pin<Box<Sleep>>,
    stalled: bool,
}

impl<B> GuardedBody<B> {
    /// Must be created inside a tokio runtime.
    pub fn new(inner: B, guard: InFlightGuard, idle: Duration) -> Self {
        Self {
            inner,
            guard: Some(guard),
            idle,
            timer: Box::pin(tokio::time::sleep(idle)),
            stalled: false,
        }
    }
}

impl<B> http_body::Body for GuardedBody<B>
where
    B: http_body::Body<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.stalled {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                let next = Instant::now() + this.idle;
                this.timer.as_mut().reset(next);
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.guard.take();
                Poll::Ready(Some(Err(e.into())))
            }
            Poll::Ready(None) => {
                this.guard.take();
                Poll::Ready(None)
            }
            Poll::Pending => {
                if this.timer.as_mut().poll(cx).is_pending() {
                    return Poll::Pending;
                }
                this.stalled = true;
                let endpoint = this
                    .guard
                    .take()
                    .map(|guard| guard.address().to_string())
                    .unwrap_or_default();
                tracing::warn!(
                    endpoint = %endpoint,
                    idle_ms = this.idle.as_millis() as u64,
                    "Upstream body stalled, aborting relay"
                );
                Poll::Ready(Some(Err(Box::new(BodyStalled {
                    endpoint,
                    idle: this.idle,
                }))))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.stalled || self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Turn an upstream response into the caller's response.
///
/// The body is aborted if no frame arrives for `idle`.
pub fn relay<B>(response: Response<B>, guard: InFlightGuard, idle: Duration) -> Response<Body>
where
    B: http_body::Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: Into<BoxError>,
{
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(GuardedBody::new(body, guard, idle)))
}
