//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route table integrity (prefixes anchored, no duplicates)
//! - Validate backend URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the config
//! - Runs before the config is accepted into the system; any error is
//!   fatal at startup

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;
use crate::upstream::backend::BackendTarget;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Config location, e.g. "routes[1]".
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.routes.is_empty() {
        errors.push(ValidationError::new(
            "routes",
            "at least one route must be defined",
        ));
    }

    let mut seen_prefixes = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{index}]");

        if route.prefix.is_empty() {
            errors.push(ValidationError::new(&field, "prefix must not be empty"));
        } else if !route.prefix.starts_with('/') {
            errors.push(ValidationError::new(&field, "prefix must start with '/'"));
        }

        if !seen_prefixes.insert(route.prefix.as_str()) {
            errors.push(ValidationError::new(
                &field,
                format!("duplicate prefix \"{}\"", route.prefix),
            ));
        }

        if let Err(err) = BackendTarget::parse(&route.backend) {
            errors.push(ValidationError::new(&field, err.to_string()));
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.connect_secs",
            "connect timeout must be positive",
        ));
    }
    if config.timeouts.response_header_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.response_header_secs",
            "response header timeout must be positive",
        ));
    }
    if config.timeouts.idle_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.idle_secs",
            "idle timeout must be positive",
        ));
    }
    if config.pool.max_idle_per_backend == 0 {
        errors.push(ValidationError::new(
            "pool.max_idle_per_backend",
            "idle pool capacity must be positive",
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "metrics address must be a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    fn valid_config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig {
            prefix: "/auth".to_string(),
            backend: "http://127.0.0.1:5001".to_string(),
        });
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_empty_route_table_rejected() {
        let config = GatewayConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "routes"));
    }

    #[test]
    fn test_duplicate_prefix_rejected() {
        let mut config = valid_config();
        config.routes.push(RouteConfig {
            prefix: "/auth".to_string(),
            backend: "http://127.0.0.1:5009".to_string(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("duplicate")));
    }

    #[test]
    fn test_unanchored_prefix_rejected() {
        let mut config = valid_config();
        config.routes[0].prefix = "auth".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("start with")));
    }

    #[test]
    fn test_bad_backend_url_rejected() {
        let mut config = valid_config();
        config.routes[0].backend = "https://127.0.0.1:5001".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = valid_config();
        config.timeouts.response_header_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.field == "timeouts.response_header_secs"));
    }

    #[test]
    fn test_all_errors_reported_at_once() {
        let mut config = valid_config();
        config.routes[0].prefix = "auth".to_string();
        config.routes[0].backend = "nonsense".to_string();
        config.timeouts.connect_secs = 0;
        config.pool.max_idle_per_backend = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 4);
    }
}
