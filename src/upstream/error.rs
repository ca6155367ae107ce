//! Upstream error taxonomy.
//!
//! Every failure while talking to a backend is translated into one of these
//! kinds at the forwarder boundary; the router only ever sees
//! [`UpstreamError`], never raw transport errors.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

/// Errors raised while forwarding a request to a backend.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// TCP connect failed or was refused.
    #[error("backend {authority} unreachable: {source}")]
    Unreachable {
        authority: String,
        #[source]
        source: std::io::Error,
    },

    /// TCP connect did not complete within the connect timeout.
    #[error("backend {authority} did not accept a connection within {timeout:?}")]
    ConnectTimeout { authority: String, timeout: Duration },

    /// The HTTP handshake on a fresh connection failed.
    #[error("http handshake with backend {authority} failed: {source}")]
    Handshake {
        authority: String,
        #[source]
        source: hyper::Error,
    },

    /// No pool exists for the backend. Indicates a route pointing at a
    /// backend the connection manager was not built with.
    #[error("no connection pool for backend {authority}")]
    UnknownBackend { authority: String },

    /// The backend did not produce response headers in time. The
    /// connection is discarded since its state is unknown.
    #[error("backend {authority} did not send response headers within {timeout:?}")]
    HeaderTimeout { authority: String, timeout: Duration },

    /// The exchange failed after the connection was established, before
    /// response headers arrived (reset, protocol error).
    #[error("transport error while talking to backend {authority}: {source}")]
    Transport {
        authority: String,
        #[source]
        source: hyper::Error,
    },
}

impl UpstreamError {
    /// Status code surfaced to the original caller.
    pub fn status(&self) -> StatusCode {
        match self {
            UpstreamError::HeaderTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Unreachable { .. } => "unreachable",
            UpstreamError::ConnectTimeout { .. } => "connect_timeout",
            UpstreamError::Handshake { .. } => "handshake",
            UpstreamError::UnknownBackend { .. } => "unknown_backend",
            UpstreamError::HeaderTimeout { .. } => "header_timeout",
            UpstreamError::Transport { .. } => "transport",
        }
    }

    /// Error body text returned to the caller. Internal details stay in
    /// the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            UpstreamError::HeaderTimeout { .. } => "upstream timeout",
            UpstreamError::Transport { .. } => "upstream transport error",
            _ => "backend unreachable",
        }
    }
}
