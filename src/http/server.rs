use super::config::HttpConfig;
use super::handler::EchoHandler;
use super::protocol::{ConnectionHeader, HttpProtocolError, HttpResponse, HttpStream};
use crate::common::EchoServerTrait;
use crate::{EchoError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, timeout};
use tokio::{signal, sync::broadcast};
use tracing::{Instrument, debug, error, info, warn};

/// HTTP echo server
///
/// Accepts connections and hands each one to its own task, so a delayed
/// request never holds up the accept loop or other connections.
///
/// # Examples
///
/// ```no_run
/// use httpecho::http::{HttpConfig, HttpEchoServer};
/// use httpecho::common::EchoServerTrait;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = HttpConfig::default().with_include_env(true);
///     let server = HttpEchoServer::new(config);
///     let shutdown_signal = server.shutdown_signal();
///
///     let server_handle = tokio::spawn(async move { server.run().await });
///
///     // Do other work...
///
///     let _ = shutdown_signal.send(());
///     server_handle.await??;
///     Ok(())
/// }
/// ```
pub struct HttpEchoServer {
    config: Arc<HttpConfig>,
    handler: Arc<EchoHandler>,
    shutdown_signal: Arc<broadcast::Sender<()>>,
}

impl HttpEchoServer {
    /// Creates a new HTTP echo server with the given configuration
    pub fn new(config: HttpConfig) -> Self {
        let (shutdown_signal, _) = broadcast::channel(1);
        let handler = EchoHandler::new(&config);
        Self {
            config: Arc::new(config),
            handler: Arc::new(handler),
            shutdown_signal: Arc::new(shutdown_signal),
        }
    }

    /// Resolves and binds the configured listen address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.listen_addr.resolve().await?;
        TcpListener::bind(addr).await.map_err(|e| {
            EchoError::Config(format!("Failed to bind {}: {e}", self.config.listen_addr))
        })
    }

    /// Serves connections from an already bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, include_env = self.config.include_env, "HTTP echo server listening");
        if let Some(metrics_addr) = &self.config.metrics_addr {
            warn!(address = %metrics_addr, "Metrics address configured but not served");
        }

        let connection_count = Arc::new(AtomicUsize::new(0));
        let mut shutdown_rx = self.shutdown_signal.subscribe();

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            let current = connection_count.fetch_add(1, Ordering::SeqCst) + 1;
                            debug!(%addr, current, "Accepted connection");

                            let config = self.config.clone();
                            let handler = self.handler.clone();
                            let connection_count = connection_count.clone();
                            let span = tracing::info_span!("connection", %addr);

                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, addr, config, handler).instrument(span).await {
                                    warn!(%addr, error = %e, "Error handling connection");
                                }
                                let remaining = connection_count.fetch_sub(1, Ordering::SeqCst) - 1;
                                debug!(%addr, current = remaining, "Connection closed");
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping server");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Received internal shutdown signal, stopping server");
                    break;
                }
            }
        }

        info!("HTTP echo server stopped");
        Ok(())
    }
}

impl EchoServerTrait for HttpEchoServer {
    /// Binds the listen address and serves until shutdown
    async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }
}

/// Serves every request on one connection in sequence
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    config: Arc<HttpConfig>,
    handler: Arc<EchoHandler>,
) -> Result<()> {
    let mut conn = HttpStream::new(stream);

    loop {
        let head = match timeout(config.read_timeout, conn.read_request(config.max_header_bytes)).await {
            Ok(Ok(Some(head))) => head,
            Ok(Ok(None)) => {
                debug!(%addr, "Client closed connection");
                break;
            }
            Ok(Err(e)) => {
                reject(&mut conn, &config, &e).await;
                return Err(e.into());
            }
            Err(_) => {
                debug!(%addr, "Idle read timeout");
                break;
            }
        };

        let mut close = head.wants_close();
        if head.is_chunked() {
            close = true;
        } else {
            let length = match head.content_length() {
                Ok(length) => length,
                Err(e) => {
                    reject(&mut conn, &config, &e).await;
                    return Err(e.into());
                }
            };
            if let Some(length) = length.filter(|l| *l > 0) {
                timeout(config.read_timeout, conn.discard_body(length))
                    .await
                    .map_err(|_| EchoError::Timeout("Request body read timeout".to_string()))??;
            }
        }

        let started = Instant::now();
        let response = handler.handle(&head, addr).await;
        if response.status.is_informational() {
            close = true;
        }

        let connection = ConnectionHeader::for_request(&head, close);
        timeout(config.write_timeout, conn.write_response(&response, head.is_head(), connection))
            .await
            .map_err(|_| EchoError::Timeout("Write timeout".to_string()))??;

        info!(
            method = %head.method,
            target = %head.target,
            status = response.status.as_u16(),
            interim = ?response.interim.map(|s| s.as_u16()),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Served request"
        );

        if close {
            break;
        }
    }

    Ok(())
}

/// Best-effort error response for a request that could not be framed
async fn reject(conn: &mut HttpStream<TcpStream>, config: &HttpConfig, err: &HttpProtocolError) {
    let Some(status) = err.response_status() else {
        return;
    };
    let response = HttpResponse::error(status, &err.to_string());
    let _ = timeout(config.write_timeout, conn.write_response(&response, false, ConnectionHeader::Close)).await;
}
