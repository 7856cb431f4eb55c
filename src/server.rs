//! Metrics endpoint serving the Prometheus text format over HTTP/1.1

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics::PrometheusSink;
use crate::{ExporterError, Result};

/// Path answered with the metrics exposition.
pub const METRICS_PATH: &str = "/metrics";

const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const MAX_REQUEST_HEAD: usize = 8 * 1024;
/// A client must finish sending its request head within this window.
const REQUEST_HEAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Bind the metrics listener on all interfaces.
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr).await.map_err(|e| {
        ExporterError::connection_failed_with_source(format!("bind {}", addr), Box::new(e))
    })
}

/// Accept scrapes until cancelled. Each request is answered on its own task.
///
/// Clients that do not complete their request head within ten seconds get a `408` and are
/// disconnected. In-flight requests are dropped when `cancel` fires.
pub async fn serve(listener: TcpListener, sink: Arc<PrometheusSink>, cancel: CancellationToken) {
    serve_with_head_timeout(listener, sink, cancel, REQUEST_HEAD_TIMEOUT).await
}

async fn serve_with_head_timeout(
    listener: TcpListener,
    sink: Arc<PrometheusSink>,
    cancel: CancellationToken,
    head_timeout: Duration,
) {
    match listener.local_addr() {
        Ok(addr) => info!("Metrics endpoint listening on {}{}", addr, METRICS_PATH),
        Err(e) => warn!("Metrics endpoint listening on unknown address: {}", e),
    }

    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((socket, peer)) => {
                let sink = sink.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        result = handle(socket, &sink, head_timeout) => {
                            if let Err(e) = result {
                                debug!("Scrape from {} failed: {}", peer, e);
                            }
                        }
                    }
                });
            }
            Err(e) => warn!("Failed to accept scrape connection: {}", e),
        }
    }

    info!("Metrics endpoint stopped");
}

async fn handle(
    mut socket: TcpStream,
    sink: &PrometheusSink,
    head_timeout: Duration,
) -> std::io::Result<()> {
    let head = match tokio::time::timeout(head_timeout, read_request_head(&mut socket)).await {
        Ok(head) => head?,
        Err(_) => {
            let reply = response("408 Request Timeout", "text/plain", "request timeout\n");
            socket.write_all(reply.as_bytes()).await?;
            return socket.shutdown().await;
        }
    };
    let reply = match request_target(&head) {
        Some(("GET", METRICS_PATH)) => match sink.encode_text() {
            Ok(body) => response("200 OK", CONTENT_TYPE, &body),
            Err(e) => response("500 Internal Server Error", "text/plain", &e.to_string()),
        },
        Some((_, METRICS_PATH)) => response("405 Method Not Allowed", "text/plain", "GET only\n"),
        Some(_) => response("404 Not Found", "text/plain", "not found\n"),
        None => response("400 Bad Request", "text/plain", "bad request\n"),
    };

    socket.write_all(reply.as_bytes()).await?;
    socket.shutdown().await
}

/// Read until the blank line ending the request head (or the size cap).
async fn read_request_head(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut head = Vec::with_capacity(512);
    let mut chunk = [0u8; 512];

    while !head.windows(4).any(|w| w == b"\r\n\r\n") && head.len() < MAX_REQUEST_HEAD {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..n]);
    }

    Ok(String::from_utf8_lossy(&head).into_owned())
}

/// Method and path of the request line, query string dropped.
fn request_target(head: &str) -> Option<(&str, &str)> {
    let mut parts = head.lines().next()?.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    let path = target.split('?').next().unwrap_or(target);
    Some((method, path))
}

fn response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}
