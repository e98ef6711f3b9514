use crate::common::EchoServerTrait;
use crate::http::{HttpConfig, HttpEchoServer};
use crate::{EchoError, Result};
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Handle to an echo server running on an ephemeral loopback port
pub struct TestServer {
    pub addr: SocketAddr,
    pub handle: JoinHandle<Result<()>>,
    pub shutdown: broadcast::Sender<()>,
}

impl TestServer {
    /// Signals shutdown and waits for the accept loop to exit
    pub async fn stop(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.handle
            .await
            .map_err(|e| EchoError::Config(format!("Server task failed: {e}")))?
    }
}

/// Starts an HTTP echo server for integration tests
///
/// The listener is bound before this returns, so clients may connect
/// immediately. The configured listen address is replaced by
/// `127.0.0.1:0`.
pub async fn spawn_test_server(config: HttpConfig) -> Result<TestServer> {
    let config = config
        .with_listen_addr("127.0.0.1:0".parse()?)
        .with_metrics_addr(None);
    let server = HttpEchoServer::new(config);

    let listener = server.bind().await?;
    let addr = listener.local_addr()?;
    let shutdown = server.shutdown_signal();

    let handle = tokio::spawn(async move { server.serve(listener).await });

    Ok(TestServer {
        addr,
        handle,
        shutdown,
    })
}
