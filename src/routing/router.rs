//! Request lifecycle and dispatch.
//!
//! # Responsibilities
//! - Resolve the route for each inbound request
//! - Drive the per-request state machine
//! - Translate forwarding errors into well-formed HTTP responses
//!
//! # Design Decisions
//! - Explicit lifecycle states give cancellation and error translation
//!   defined hook points
//! - Raw transport errors never leave the forwarder boundary; callers see
//!   404, 502 or 504 with a JSON body
//! - Route table and forwarder are built once and shared by reference

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;

use crate::config::loader::ConfigError;
use crate::config::schema::GatewayConfig;
use crate::config::validation::validate_config;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::json_error;
use crate::observability::metrics;
use crate::routing::table::RouteTable;
use crate::upstream::forwarder::Forwarder;
use crate::upstream::pool::ConnectionManager;

/// Lifecycle states of a dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    Received,
    Matched,
    Forwarding,
    Completed,
    Failed,
}

/// Top-level dispatcher: route table plus forwarder.
pub struct Gateway {
    table: RouteTable,
    forwarder: Forwarder,
}

impl Gateway {
    /// Build the gateway from configuration. Validation runs first; any
    /// error refuses startup.
    pub fn new(config: &GatewayConfig) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let table = RouteTable::from_config(&config.routes)?;
        let connections = ConnectionManager::new(
            table.backends(),
            Duration::from_secs(config.timeouts.connect_secs),
            Duration::from_secs(config.timeouts.idle_secs),
            config.pool.max_idle_per_backend,
        );
        let forwarder = Forwarder::new(
            connections,
            Duration::from_secs(config.timeouts.response_header_secs),
        );

        Ok(Self { table, forwarder })
    }

    /// Number of configured routes.
    pub fn route_count(&self) -> usize {
        self.table.len()
    }

    /// Dispatch one inbound request and produce the response for the
    /// original caller.
    pub async fn dispatch(&self, request: Request<Body>, client: SocketAddr) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let mut state = RequestState::Received;
        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            state = ?state,
            "Request received"
        );

        let route = match self.table.resolve(&path) {
            Some(route) => route,
            None => {
                state = RequestState::Failed;
                tracing::warn!(request_id = %request_id, path = %path, state = ?state, "No route for path");
                metrics::record_request(method.as_str(), StatusCode::NOT_FOUND.as_u16(), "none", start);
                return json_error(StatusCode::NOT_FOUND, "no route for path");
            }
        };
        let backend = route.backend().authority.clone();

        state = RequestState::Matched;
        tracing::debug!(
            request_id = %request_id,
            prefix = %route.prefix(),
            backend = %backend,
            state = ?state,
            "Route matched"
        );

        state = RequestState::Forwarding;
        tracing::debug!(request_id = %request_id, backend = %backend, state = ?state, "Forwarding");

        let (parts, body) = request.into_parts();
        match self.forwarder.forward(parts, body, client, route).await {
            Ok(response) => {
                state = RequestState::Completed;
                metrics::record_request(method.as_str(), response.status().as_u16(), &backend, start);
                tracing::debug!(
                    request_id = %request_id,
                    status = %response.status(),
                    state = ?state,
                    "Response headers relayed"
                );
                response
            }
            Err(err) => {
                state = RequestState::Failed;
                let status = err.status();
                metrics::record_upstream_error(&backend, err.kind());
                metrics::record_request(method.as_str(), status.as_u16(), &backend, start);
                tracing::error!(
                    request_id = %request_id,
                    backend = %backend,
                    error = %err,
                    state = ?state,
                    "Forwarding failed"
                );
                json_error(status, err.public_message())
            }
        }
    }
}
