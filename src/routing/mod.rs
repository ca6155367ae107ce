//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (per-request lifecycle, error translation)
//!     → table.rs (longest-prefix lookup)
//!     → Return: matched Route or 404
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Parse backend URLs
//!     → Sort by descending prefix length
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in the hot path (prefix matching only)
//! - Deterministic: same path always matches the same route
//! - Longest prefix wins; duplicates are rejected by validation

pub mod router;
pub mod table;

pub use router::Gateway;
pub use table::{Route, RouteTable};
