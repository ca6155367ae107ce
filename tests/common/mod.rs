//! Shared utilities for gateway integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use api_gateway::config::{GatewayConfig, RouteConfig};
use api_gateway::http::HttpServer;
use api_gateway::lifecycle::Shutdown;

/// Spawn the gateway on an ephemeral port and return its address.
#[allow(dead_code)]
pub async fn spawn_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config).unwrap();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

#[allow(dead_code)]
pub fn route(prefix: &str, backend: SocketAddr) -> RouteConfig {
    RouteConfig {
        prefix: prefix.to_string(),
        backend: format!("http://{backend}"),
    }
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Start a backend that serves a fixed response for every request, keeping
/// connections alive so pooling is observable. Returns the bound address
/// and a counter of accepted connections.
#[allow(dead_code)]
pub async fn start_static_backend(
    status: &'static str,
    content_type: &'static str,
    body: &'static str,
) -> (SocketAddr, Arc<AtomicUsize>) {
    start_backend(move |_| async move { response(status, content_type, body) }, Duration::ZERO)
        .await
}

/// Start a backend that delays each response.
#[allow(dead_code)]
pub async fn start_slow_backend(
    delay: Duration,
    body: &'static str,
) -> (SocketAddr, Arc<AtomicUsize>) {
    start_backend(move |_| async move { response("200 OK", "text/plain", body) }, delay).await
}

/// Start a backend that records each request (head and body) and answers
/// 200.
#[allow(dead_code)]
pub async fn start_capture_backend() -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();

    let (addr, _) = start_backend(
        move |request| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(request);
                response("200 OK", "text/plain", "ok")
            }
        },
        Duration::ZERO,
    )
    .await;

    (addr, captured)
}

/// Start a backend that accepts connections and reads requests but never
/// responds.
#[allow(dead_code)]
pub async fn start_silent_backend() -> (SocketAddr, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));
    let counter = accepts.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        let _ = read_request(&mut socket).await;
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, accepts)
}

/// Bind a port, then free it so connections to it are refused.
#[allow(dead_code)]
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn start_backend<F, Fut>(handler: F, delay: Duration) -> (SocketAddr, Arc<AtomicUsize>)
where
    F: Fn(String) -> Fut + Clone + Send + Sync + 'static,
    Fut: std::future::Future<Output = String> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));
    let counter = accepts.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        while let Some(request) = read_request(&mut socket).await {
                            tokio::time::sleep(delay).await;
                            let response = handler(request).await;
                            if socket.write_all(response.as_bytes()).await.is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, accepts)
}

fn response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}

/// Read one full HTTP/1.1 request (head plus Content-Length body).
/// Returns None when the peer closes the connection.
async fn read_request(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let body_len = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while buf.len() < head_end + body_len {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(String::from_utf8_lossy(&buf[..head_end + body_len]).into_owned())
}
