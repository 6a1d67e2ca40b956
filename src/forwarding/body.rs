//! Request body replay.
//!
//! A request may be sent more than once only if its body can be produced
//! again. Small bodies are buffered up to a cap; anything larger is streamed
//! through once, with the already-read prefix stitched back in front.

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use futures_util::{stream, StreamExt};
use http_body_util::BodyExt;

use crate::error::GatewayError;

#[derive(Debug)]
pub enum ReplayableBody {
    /// Fully read, may be sent any number of times.
    Buffered(Bytes),
    /// Too large (or retries off): sent once, `None` after that.
    Streaming(Option<Body>),
}

impl ReplayableBody {
    /// Pass the body through untouched.
    pub fn streaming(body: Body) -> Self {
        ReplayableBody::Streaming(Some(body))
    }

    /// Buffer `body` if it fits in `cap` bytes, otherwise fall back to streaming.
    pub async fn read(mut body: Body, cap: usize) -> Result<Self, GatewayError> {
        let mut buf = BytesMut::new();
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| GatewayError::ClientBody(e.to_string()))?;
            // Request trailers are not forwarded.
            let Ok(data) = frame.into_data() else {
                continue;
            };
            buf.extend_from_slice(&data);
            if buf.len() > cap {
                let prefix = buf.freeze();
                let rest = body.into_data_stream();
                let joined = stream::once(async move { Ok::<_, axum::Error>(prefix) }).chain(rest);
                return Ok(ReplayableBody::Streaming(Some(Body::from_stream(joined))));
            }
        }
        Ok(ReplayableBody::Buffered(buf.freeze()))
    }

    /// Body for the next attempt, `None` once a streamed body was used.
    pub fn take(&mut self) -> Option<Body> {
        match self {
            ReplayableBody::Buffered(bytes) => Some(Body::from(bytes.clone())),
            ReplayableBody::Streaming(body) => body.take(),
        }
    }

    /// Whether another attempt can still get the full body.
    pub fn can_replay(&self) -> bool {
        match self {
            ReplayableBody::Buffered(_) => true,
            ReplayableBody::Streaming(body) => body.is_some(),
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, ReplayableBody::Streaming(_))
    }
}
