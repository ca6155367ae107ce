//! Request forwarding.
//!
//! # Responsibilities
//! - Build the outbound request: method, path and query preserved, Host
//!   rewritten to the backend, forwarding headers extended
//! - Stream request and response bodies without buffering
//! - Enforce the response-header timeout
//! - Report connection health back to the pool
//!
//! # Design Decisions
//! - The matched prefix is never stripped; backends see the original path
//! - Hop-by-hop headers are removed on both legs, end-to-end headers are
//!   relayed verbatim
//! - No automatic retries: a request reaches the wire at most once

use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{header, HeaderValue, Request, Response, Uri, Version};
use hyper::body::{Body as HttpBody, Bytes, Frame, Incoming, SizeHint};

use crate::http::response::strip_hop_by_hop;
use crate::routing::table::Route;
use crate::upstream::backend::BackendTarget;
use crate::upstream::error::UpstreamError;
use crate::upstream::pool::{ConnectionManager, Lease};

/// Header recording the chain of client addresses a request passed through.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Forwards requests to backends over pooled connections.
pub struct Forwarder {
    connections: ConnectionManager,
    header_wait: Duration,
}

impl Forwarder {
    pub fn new(connections: ConnectionManager, header_wait: Duration) -> Self {
        Self {
            connections,
            header_wait,
        }
    }

    /// Forward a request to the backend matched by `route`.
    ///
    /// Resolves once the backend's response headers arrive; the returned
    /// response streams the body and settles the connection's health when
    /// the stream ends.
    pub async fn forward(
        &self,
        parts: Parts,
        body: Body,
        client: SocketAddr,
        route: &Route,
    ) -> Result<Response<Body>, UpstreamError> {
        let target = route.backend();
        let mut lease = self.connections.acquire(target).await?;
        tracing::debug!(
            backend = %target.authority,
            reused = lease.reused(),
            "Connection acquired"
        );

        let outbound = build_upstream_request(&parts, body, target, client);

        let outcome = tokio::time::timeout(self.header_wait, lease.send_request(outbound)).await;
        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(source)) => {
                // Returning drops the lease and closes the connection.
                return Err(UpstreamError::Transport {
                    authority: target.authority.clone(),
                    source,
                });
            }
            Err(_) => {
                return Err(UpstreamError::HeaderTimeout {
                    authority: target.authority.clone(),
                    timeout: self.header_wait,
                });
            }
        };

        let (mut head, upstream) = response.into_parts();
        strip_hop_by_hop(&mut head.headers);

        let relay = RelayBody::new(upstream, lease);
        Ok(Response::from_parts(head, Body::new(relay)))
    }
}

/// Build the outbound request for a matched route.
fn build_upstream_request(
    parts: &Parts,
    body: Body,
    target: &BackendTarget,
    client: SocketAddr,
) -> Request<Body> {
    let mut headers = parts.headers.clone();
    strip_hop_by_hop(&mut headers);

    // "changeOrigin": the backend sees itself as the host.
    headers.insert(header::HOST, target.host_header.clone());

    let forwarded = match parts
        .headers
        .get(X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
    {
        Some(existing) => format!("{existing}, {}", client.ip()),
        None => client.ip().to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded) {
        headers.insert(X_FORWARDED_FOR, value);
    }

    let mut outbound = Request::new(body);
    *outbound.method_mut() = parts.method.clone();
    *outbound.uri_mut() = origin_form(&parts.uri);
    *outbound.version_mut() = Version::HTTP_11;
    *outbound.headers_mut() = headers;
    outbound
}

/// Origin-form URI for the outbound request: path and query only.
fn origin_form(uri: &Uri) -> Uri {
    let mut parts = axum::http::uri::Parts::default();
    parts.path_and_query = uri.path_and_query().cloned();
    Uri::from_parts(parts).unwrap_or_else(|_| uri.clone())
}

/// Response body relayed from the backend to the client.
///
/// Holds the connection lease for the duration of the stream. The lease is
/// released back to the pool when the upstream body ends cleanly and
/// discarded if the stream fails or the client goes away first.
struct RelayBody {
    upstream: Incoming,
    lease: Option<Lease>,
}

impl RelayBody {
    fn new(upstream: Incoming, lease: Lease) -> Self {
        Self {
            upstream,
            lease: Some(lease),
        }
    }

    fn settle(&mut self, healthy: bool) {
        if let Some(lease) = self.lease.take() {
            if healthy {
                lease.release();
            }
        }
    }
}

impl HttpBody for RelayBody {
    type Data = Bytes;
    type Error = hyper::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.upstream).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if this.upstream.is_end_stream() {
                    this.settle(true);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(source))) => {
                // Headers are already on the wire; the client connection is
                // torn down abruptly and the error only logged.
                tracing::warn!(error = %source, "Transport error while relaying response body");
                this.settle(false);
                Poll::Ready(Some(Err(source)))
            }
            Poll::Ready(None) => {
                this.settle(true);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.upstream.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.upstream.size_hint()
    }
}

impl Drop for RelayBody {
    fn drop(&mut self) {
        self.settle(false);
    }
}
