//! Minimal in-process HTTP server for engine tests
//!
//! Answers with canned statuses per path and tracks how many requests
//! were being served at once, which is what the concurrency-ceiling
//! tests assert against.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Canned behavior for one path
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub status: u16,
    pub delay: Duration,
}

impl Route {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(status: u16, delay_ms: u64) -> Self {
        Self {
            status,
            delay: Duration::from_millis(delay_ms),
        }
    }
}

#[derive(Default)]
struct Inflight {
    current: AtomicUsize,
    high_water: AtomicUsize,
}

/// HTTP stub bound to an ephemeral localhost port
pub struct StubServer {
    addr: SocketAddr,
    inflight: Arc<Inflight>,
}

impl StubServer {
    /// Starts the server. Paths without a route answer `fallback_status`.
    pub async fn start(routes: HashMap<String, Route>, fallback_status: u16) -> StubServer {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let inflight = Arc::new(Inflight::default());

        let routes = Arc::new(routes);
        let tracker = inflight.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    let current = tracker.current.fetch_add(1, Ordering::SeqCst) + 1;
                    tracker.high_water.fetch_max(current, Ordering::SeqCst);

                    let mut buf = vec![0u8; 2048];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let head = String::from_utf8_lossy(&buf[..n]);
                    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let route = routes
                        .get(&path)
                        .copied()
                        .unwrap_or(Route::status(fallback_status));
                    if !route.delay.is_zero() {
                        tokio::time::sleep(route.delay).await;
                    }

                    // leave the in-flight count before the response can
                    // release the client to send its next request
                    tracker.current.fetch_sub(1, Ordering::SeqCst);

                    let response = format!(
                        "HTTP/1.1 {} {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                        route.status,
                        reason(route.status)
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        StubServer { addr, inflight }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Highest number of requests served simultaneously
    pub fn high_water_mark(&self) -> usize {
        self.inflight.high_water.load(Ordering::SeqCst)
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
