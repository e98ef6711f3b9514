//! HTTP echo server implementation
//!
//! Every request, whatever its path, is answered with a text report of the
//! request head, the peer address, optionally the process environment and
//! optionally a block of random data. Query parameters inject a delay,
//! pick the status code and size the random payload.

pub mod client;
pub mod config;
pub mod dump;
pub mod duration;
pub mod handler;
pub mod params;
pub mod protocol;
pub mod server;


pub use client::{EchoResponse, HttpEchoClient};
pub use config::HttpConfig;
pub use handler::EchoHandler;
pub use params::{ParsedParam, ResponseParams};
pub use protocol::{ConnectionHeader, HttpProtocolError, HttpResponse, HttpStream, RequestHead};
pub use server::HttpEchoServer;
