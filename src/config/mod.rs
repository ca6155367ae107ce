//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors collected)
//!     → GatewayConfig (validated, immutable)
//!     → shared with the router and pools at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable for the process lifetime; the route table is
//!   compiled once at startup
//! - All fields have defaults to allow minimal configs
//! - Any validation error is fatal: the gateway refuses to start rather
//!   than run with partial routing

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::GatewayConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::PoolConfig;
pub use schema::RouteConfig;
pub use schema::TimeoutConfig;
