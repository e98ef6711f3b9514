use crate::network::ListenAddr;
use std::time::Duration;

/// Default cap on the `payload` query parameter, in bytes
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Default cap on the size of a request head (request line plus headers)
pub const DEFAULT_MAX_HEADER_BYTES: usize = 1024 * 1024;

/// Configuration for the HTTP echo server
///
/// Set once at startup and shared read-only by every connection. The
/// handler never consults global state for these settings.
///
/// # Examples
///
/// ```rust
/// use httpecho::http::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::default()
///     .with_listen_addr("127.0.0.1:0".parse().unwrap())
///     .with_include_env(true)
///     .with_read_timeout(Duration::from_secs(5));
///
/// assert!(config.include_env);
/// assert_eq!(config.listen_addr.port(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address the echo listener binds to
    pub listen_addr: ListenAddr,
    /// Metrics address; accepted for compatibility, never bound
    pub metrics_addr: Option<ListenAddr>,
    /// Whether responses carry the `Environment:` section
    pub include_env: bool,
    /// How long an idle connection may wait for its next request
    pub read_timeout: Duration,
    /// Timeout for writing one response
    pub write_timeout: Duration,
    /// Largest accepted request head in bytes
    pub max_header_bytes: usize,
    /// Largest random payload generated for one response
    pub max_payload_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_addr: ListenAddr::any(8080),
            metrics_addr: Some(ListenAddr::any(8081)),
            include_env: false,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl HttpConfig {
    /// Set the listen address
    pub fn with_listen_addr(mut self, addr: ListenAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    /// Set the (unused) metrics address
    pub fn with_metrics_addr(mut self, addr: Option<ListenAddr>) -> Self {
        self.metrics_addr = addr;
        self
    }

    /// Enable or disable the environment section
    pub fn with_include_env(mut self, include_env: bool) -> Self {
        self.include_env = include_env;
        self
    }

    /// Set the idle read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the maximum request head size
    pub fn with_max_header_bytes(mut self, max: usize) -> Self {
        self.max_header_bytes = max;
        self
    }

    /// Set the maximum payload size
    pub fn with_max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = max;
        self
    }
}
