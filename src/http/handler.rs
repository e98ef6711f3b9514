use super::config::HttpConfig;
use super::dump::dump_request;
use super::params::ResponseParams;
use super::protocol::{HttpResponse, RequestHead};
use ::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rand::rngs::OsRng;
use std::net::SocketAddr;
use tracing::debug;

/// Separator line framing every section of the echo body
pub const SEPARATOR: &str = "--------------------";

/// Payloads larger than this are generated on the blocking pool
const BLOCKING_PAYLOAD_BYTES: usize = 64 * 1024;

/// Builds echo responses for individual requests
///
/// Holds only the per-process settings it was constructed with, so a single
/// handler is shared by every connection without coordination.
#[derive(Debug, Clone)]
pub struct EchoHandler {
    include_env: bool,
    max_payload_bytes: usize,
}

impl EchoHandler {
    pub fn new(config: &HttpConfig) -> Self {
        Self {
            include_env: config.include_env,
            max_payload_bytes: config.max_payload_bytes,
        }
    }

    /// Produces the response for one request
    ///
    /// Sleeps first when a delay was requested; nothing about the response
    /// is decided or sent before the delay has elapsed. A requested 1xx
    /// status other than `101` goes out as an interim response ahead of a
    /// final `200` carrying the echo.
    pub async fn handle(&self, request: &RequestHead, remote_addr: SocketAddr) -> HttpResponse {
        let params = ResponseParams::from_query(request.query(), self.max_payload_bytes);
        debug!(?params, "Derived response parameters");

        if !params.delay.value.is_zero() {
            tokio::time::sleep(params.delay.value).await;
        }

        let dump = match dump_request(request) {
            Ok(dump) => dump,
            Err(e) => return HttpResponse::error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        };

        let mut body = Vec::with_capacity(dump.len() + 256);
        write_section(&mut body, "Request", &dump);
        write_section(&mut body, "Client", format!("RemoteAddr: {remote_addr}\n").as_bytes());

        if self.include_env {
            let mut env = String::new();
            for line in environment_lines() {
                env.push_str(&line);
                env.push('\n');
            }
            write_section(&mut body, "Environment", env.as_bytes());
        }

        let len = params.payload.value;
        if len > 0 {
            let payload = if len > BLOCKING_PAYLOAD_BYTES {
                match tokio::task::spawn_blocking(move || random_payload(len)).await {
                    Ok(payload) => payload,
                    Err(e) => {
                        return HttpResponse::error(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            &format!("payload generation failed: {e}"),
                        );
                    }
                }
            } else {
                random_payload(len)
            };
            write_section(&mut body, "Payload", format!("{payload}\n").as_bytes());
        }

        let status = params.status.value;
        if status.is_informational() && status != StatusCode::SWITCHING_PROTOCOLS {
            HttpResponse::new(StatusCode::OK, body).with_interim(status)
        } else {
            HttpResponse::new(status, body)
        }
    }
}

/// Appends one framed section: blank line, `Title:`, separator, content,
/// separator
pub fn write_section(out: &mut Vec<u8>, title: &str, content: &[u8]) {
    out.extend_from_slice(format!("\n{title}:\n{SEPARATOR}\n").as_bytes());
    out.extend_from_slice(content);
    out.extend_from_slice(format!("{SEPARATOR}\n").as_bytes());
}

/// The process environment as `KEY=VALUE` lines, sorted by the full line
pub fn environment_lines() -> Vec<String> {
    let mut lines: Vec<String> = std::env::vars_os()
        .map(|(key, value)| format!("{}={}", key.to_string_lossy(), value.to_string_lossy()))
        .collect();
    lines.sort();
    lines
}

/// `len` bytes from the OS random source, base64 encoded with padding
pub fn random_payload(len: usize) -> String {
    let mut data = vec![0u8; len];
    OsRng.fill_bytes(&mut data);
    STANDARD.encode(&data)
}
