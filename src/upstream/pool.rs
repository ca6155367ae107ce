//! Connection pooling for backend connections.
//!
//! # Responsibilities
//! - Keep a bounded idle pool of HTTP/1.1 connections per backend
//! - Establish new connections under a connect timeout
//! - Evict idle connections lazily on acquire
//! - Accept healthy connections back, close everything else
//!
//! # Design Decisions
//! - One pool (and one lock) per backend: a slow or unreachable backend
//!   cannot starve requests headed elsewhere
//! - Locks are held only to push/pop, never across an await point
//! - A stale pooled handle that fails its readiness check is replaced
//!   before any request bytes are written; this is not a request retry

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::upstream::backend::BackendTarget;
use crate::upstream::error::UpstreamError;

/// Manages per-backend connection pools.
///
/// Built once at startup from the route table; the set of backends never
/// changes afterwards, only the pooled connections do.
pub struct ConnectionManager {
    pools: HashMap<String, Arc<BackendPool>>,
}

impl ConnectionManager {
    /// Create a manager with one pool per distinct backend authority.
    pub fn new(
        targets: impl IntoIterator<Item = Arc<BackendTarget>>,
        connect_timeout: Duration,
        idle_timeout: Duration,
        max_idle: usize,
    ) -> Self {
        let mut pools = HashMap::new();
        for target in targets {
            pools
                .entry(target.authority.clone())
                .or_insert_with(|| {
                    Arc::new(BackendPool {
                        target,
                        idle: Mutex::new(Vec::new()),
                        connect_timeout,
                        idle_timeout,
                        max_idle,
                    })
                });
        }
        Self { pools }
    }

    /// Acquire a connection to the given backend, reusing an idle one when
    /// possible.
    pub async fn acquire(&self, target: &BackendTarget) -> Result<Lease, UpstreamError> {
        let pool = self
            .pools
            .get(target.authority.as_str())
            .ok_or_else(|| UpstreamError::UnknownBackend {
                authority: target.authority.clone(),
            })?;
        pool.acquire().await
    }
}

/// Idle pool for a single backend.
struct BackendPool {
    target: Arc<BackendTarget>,
    idle: Mutex<Vec<IdleConnection>>,
    connect_timeout: Duration,
    idle_timeout: Duration,
    max_idle: usize,
}

struct IdleConnection {
    sender: SendRequest<Body>,
    parked_at: Instant,
}

impl BackendPool {
    async fn acquire(self: &Arc<Self>) -> Result<Lease, UpstreamError> {
        while let Some(mut sender) = self.checkout() {
            if sender.is_closed() {
                continue;
            }
            match sender.ready().await {
                Ok(()) => {
                    tracing::debug!(backend = %self.target.authority, "Reusing pooled connection");
                    return Ok(Lease {
                        sender,
                        pool: Arc::clone(self),
                        reused: true,
                    });
                }
                Err(_) => {
                    // Backend closed the keep-alive while it was parked.
                    tracing::debug!(backend = %self.target.authority, "Discarding stale pooled connection");
                }
            }
        }
        self.connect().await
    }

    /// Pop an idle connection, evicting entries past the idle timeout.
    fn checkout(&self) -> Option<SendRequest<Body>> {
        let mut idle = self.idle.lock().expect("pool mutex poisoned");
        idle.retain(|conn| conn.parked_at.elapsed() <= self.idle_timeout);
        idle.pop().map(|conn| conn.sender)
    }

    /// Return a connection to the idle pool, or drop it if full.
    fn park(&self, sender: SendRequest<Body>) {
        let mut idle = self.idle.lock().expect("pool mutex poisoned");
        if idle.len() >= self.max_idle {
            tracing::debug!(backend = %self.target.authority, "Idle pool full, closing connection");
            return;
        }
        idle.push(IdleConnection {
            sender,
            parked_at: Instant::now(),
        });
        tracing::trace!(
            backend = %self.target.authority,
            pooled = idle.len(),
            "Connection returned to idle pool"
        );
    }

    async fn connect(self: &Arc<Self>) -> Result<Lease, UpstreamError> {
        let target = &self.target;
        let connect = TcpStream::connect((target.host.as_str(), target.port));
        let stream = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(UpstreamError::Unreachable {
                    authority: target.authority.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(UpstreamError::ConnectTimeout {
                    authority: target.authority.clone(),
                    timeout: self.connect_timeout,
                })
            }
        };
        let _ = stream.set_nodelay(true);

        let (sender, conn) = http1::handshake::<_, Body>(TokioIo::new(stream))
            .await
            .map_err(|source| UpstreamError::Handshake {
                authority: target.authority.clone(),
                source,
            })?;

        // Drive the connection until it closes; errors here surface to the
        // request path through the sender.
        let authority = target.authority.clone();
        tokio::spawn(async move {
            if let Err(err) = conn.await {
                tracing::debug!(backend = %authority, error = %err, "Upstream connection closed with error");
            }
        });

        tracing::debug!(backend = %target.authority, "Established new connection");
        Ok(Lease {
            sender,
            pool: Arc::clone(self),
            reused: false,
        })
    }
}

/// An acquired backend connection.
///
/// Dropping a lease closes the connection; callers that finished a clean
/// exchange hand it back with [`Lease::release`] instead.
pub struct Lease {
    sender: SendRequest<Body>,
    pool: Arc<BackendPool>,
    reused: bool,
}

impl Lease {
    /// Whether this lease came from the idle pool rather than a fresh
    /// connection.
    pub fn reused(&self) -> bool {
        self.reused
    }

    /// Authority of the backend this connection is bound to.
    pub fn authority(&self) -> &str {
        &self.pool.target.authority
    }

    /// Send a request on this connection. Resolves when the response
    /// headers arrive; the body streams afterwards.
    pub async fn send_request(
        &mut self,
        request: Request<Body>,
    ) -> hyper::Result<Response<Incoming>> {
        self.sender.send_request(request).await
    }

    /// Report the exchange healthy and return the connection to the idle
    /// pool. Connections that closed underneath us are dropped.
    pub fn release(self) {
        let Lease { sender, pool, .. } = self;
        if sender.is_closed() {
            tracing::debug!(backend = %pool.target.authority, "Connection closed by backend, not pooling");
            return;
        }
        pool.park(sender);
    }
}
