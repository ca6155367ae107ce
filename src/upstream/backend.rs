//! Backend address abstraction.
//!
//! # Responsibilities
//! - Parse backend base URLs once at startup
//! - Pre-compute the authority used for Host rewriting and pool keying
//! - Reject URLs the gateway cannot forward to (non-http schemes, paths)

use axum::http::HeaderValue;
use thiserror::Error;
use url::Url;

/// Reasons a backend base URL is rejected at startup.
#[derive(Debug, Error)]
pub enum InvalidTarget {
    #[error("backend URL is not valid: {0}")]
    Url(#[from] url::ParseError),

    #[error("backend URL must use the http scheme, got \"{0}\"")]
    Scheme(String),

    #[error("backend URL is missing a host")]
    MissingHost,

    #[error("backend URL must be scheme, host and port only")]
    ExtraComponents,

    #[error("backend URL host is not a valid Host header value")]
    InvalidHostHeader,
}

/// A single backend service the gateway forwards to.
///
/// Parsed from configuration at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct BackendTarget {
    /// Host name or IP address, used for connecting.
    pub host: String,

    /// TCP port (default 80 when the URL carries none).
    pub port: u16,

    /// Authority string written into the outbound Host header and used as
    /// the connection pool key. Carries the port only when the URL did.
    pub authority: String,

    /// Pre-built Host header value.
    pub host_header: HeaderValue,
}

impl BackendTarget {
    /// Parse a backend base URL such as `http://127.0.0.1:5001`.
    pub fn parse(raw: &str) -> Result<Self, InvalidTarget> {
        let url = Url::parse(raw)?;

        if url.scheme() != "http" {
            return Err(InvalidTarget::Scheme(url.scheme().to_string()));
        }

        let host = url
            .host_str()
            .ok_or(InvalidTarget::MissingHost)?
            .to_string();

        if !matches!(url.path(), "" | "/") || url.query().is_some() || url.fragment().is_some() {
            return Err(InvalidTarget::ExtraComponents);
        }

        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.clone(),
        };
        let host_header =
            HeaderValue::from_str(&authority).map_err(|_| InvalidTarget::InvalidHostHeader)?;

        Ok(Self {
            host,
            port: url.port().unwrap_or(80),
            authority,
            host_header,
        })
    }
}
