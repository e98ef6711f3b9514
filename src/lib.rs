use crate::http::protocol::HttpProtocolError;
use thiserror::Error;

/// Error types for the httpecho library
#[derive(Error, Debug)]
pub enum EchoError {
    /// Socket-level errors (bind, accept, read, write)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (invalid listen address, unresolvable host)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP framing errors on a connection
    #[error("HTTP protocol error: {0}")]
    Protocol(#[from] HttpProtocolError),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),
}

/// Result type for the httpecho library
pub type Result<T> = std::result::Result<T, EchoError>;

pub mod cli;
pub mod common;
pub mod http;
pub mod network;

// Re-export main types for convenience
pub use common::EchoServerTrait;
pub use http::{EchoHandler, HttpConfig, HttpEchoClient, HttpEchoServer, ResponseParams};
pub use network::ListenAddr;
