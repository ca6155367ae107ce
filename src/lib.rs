//! # API Gateway
//!
//! A path-prefix routing HTTP gateway built with Tokio and Axum. Inbound
//! requests are matched against an immutable route table
//! (longest-prefix-wins), forwarded to the selected backend over pooled
//! HTTP/1.1 connections, and the backend's response is streamed back to
//! the caller.
//!
//! ## Features
//!
//! - Longest-prefix, segment-aware route matching
//! - Per-backend connection pools with idle eviction
//! - Connect and response-header timeouts with precise error mapping
//!   (404 / 502 / 504)
//! - Streaming bodies in both directions, no full-body buffering
//! - Request IDs, structured logging and Prometheus metrics

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod upstream;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
