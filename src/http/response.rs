//! Response construction and header hygiene.
//!
//! # Responsibilities
//! - Build the gateway's own error responses (JSON bodies)
//! - Strip hop-by-hop headers from relayed requests and responses
//!
//! # Design Decisions
//! - End-to-end headers pass through untouched; only transport artifacts
//!   (Connection, Keep-Alive, Transfer-Encoding, ...) are removed
//! - Error bodies never leak backend internals

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Hop-by-hop headers defined by RFC 7230 §6.1. These describe a single
/// transport link and must not be relayed.
const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named by the Connection
/// header itself.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let connection_named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| name.trim().parse::<HeaderName>().ok())
        .collect();

    for name in connection_named {
        headers.remove(&name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

/// A JSON error response in the gateway's `{"error": ...}` shape.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "error": message }).to_string();
    (
        status,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        body,
    )
        .into_response()
}
