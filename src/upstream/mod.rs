//! Upstream subsystem: everything between the router and the backends.
//!
//! # Data Flow
//! ```text
//! Route matched → forwarder.rs
//!     → pool.rs (acquire connection: reuse idle or connect)
//!     → build outbound request (Host rewrite, forwarding headers)
//!     → await response headers (bounded wait)
//!     → stream response body back to the caller
//!     → pool.rs (release healthy connection, or close it)
//! ```
//!
//! # Design Decisions
//! - One idle pool per backend; backends never contend with each other
//! - Health is reported per exchange: clean completion pools the
//!   connection, anything else closes it
//! - Every failure is translated to an [`error::UpstreamError`] before it
//!   reaches the router

pub mod backend;
pub mod error;
pub mod forwarder;
pub mod pool;

pub use backend::BackendTarget;
pub use error::UpstreamError;
pub use forwarder::Forwarder;
pub use pool::{ConnectionManager, Lease};
