use super::handler::SEPARATOR;
use crate::{EchoError, Result};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};

const MAX_RESPONSE_HEADERS: usize = 64;

/// A response as seen by `HttpEchoClient`
#[derive(Debug, Clone)]
pub struct EchoResponse {
    pub status: u16,
    /// Interim 1xx statuses received ahead of the final response
    pub informational: Vec<u16>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Time from the request being written to the first response byte
    pub first_byte: Duration,
}

impl EchoResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Content lines of the named section (`Request`, `Client`, ...), if
    /// the body has one
    pub fn section(&self, title: &str) -> Option<Vec<String>> {
        let text = self.text();
        let opening = format!("\n{title}:\n{SEPARATOR}\n");
        let start = text.find(&opening)? + opening.len();
        let end = start + text[start..].find(&format!("{SEPARATOR}\n"))?;
        Some(text[start..end].lines().map(str::to_string).collect())
    }
}

/// Minimal HTTP/1.1 client for exercising the echo server
///
/// Speaks just enough HTTP to send a request and read one framed response,
/// and keeps the connection open for the next request.
///
/// ```no_run
/// use httpecho::http::HttpEchoClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut client = HttpEchoClient::connect("127.0.0.1:8080".parse()?).await?;
///     let response = client.get("/?status=418").await?;
///     assert_eq!(response.status, 418);
///     Ok(())
/// }
/// ```
pub struct HttpEchoClient {
    stream: TcpStream,
    addr: SocketAddr,
    buffer: BytesMut,
    read_timeout: Duration,
}

impl HttpEchoClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            stream,
            addr,
            buffer: BytesMut::with_capacity(4096),
            read_timeout: Duration::from_secs(30),
        })
    }

    /// Local address of the connection, as the server sees it
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.local_addr()?)
    }

    pub async fn get(&mut self, target: &str) -> Result<EchoResponse> {
        self.request("GET", target, &[], b"").await
    }

    /// Sends a request with the given extra headers and body
    ///
    /// `Host` and, for non-empty bodies, `Content-Length` are added.
    pub async fn request(
        &mut self,
        method: &str,
        target: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<EchoResponse> {
        let mut raw = format!("{method} {target} HTTP/1.1\r\nHost: {}\r\n", self.addr);
        for (name, value) in headers {
            raw.push_str(&format!("{name}: {value}\r\n"));
        }
        if !body.is_empty() {
            raw.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        raw.push_str("\r\n");

        let mut bytes = raw.into_bytes();
        bytes.extend_from_slice(body);
        self.send_raw(&bytes, method == "HEAD").await
    }

    /// Writes raw bytes and reads one response
    pub async fn send_raw(&mut self, request: &[u8], head_request: bool) -> Result<EchoResponse> {
        self.stream.write_all(request).await?;
        self.stream.flush().await?;
        let sent = Instant::now();

        let mut first_byte = None;
        let mut informational = Vec::new();
        let (status, headers, consumed) = loop {
            if let Some((status, headers, consumed)) = parse_response_head(&self.buffer)? {
                if (100..200).contains(&status) && status != 101 {
                    informational.push(status);
                    self.buffer.advance(consumed);
                    continue;
                }
                break (status, headers, consumed);
            }
            if self.fill().await? == 0 {
                return Err(EchoError::Config("Connection closed before response head".to_string()));
            }
            first_byte.get_or_insert_with(|| sent.elapsed());
        };
        let first_byte = first_byte.unwrap_or_else(|| sent.elapsed());
        self.buffer.advance(consumed);

        let content_length = headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok());
        let no_body = head_request || (100..200).contains(&status) || status == 204 || status == 304;

        let body = match content_length {
            _ if no_body => Vec::new(),
            Some(length) => {
                while self.buffer.len() < length {
                    if self.fill().await? == 0 {
                        return Err(EchoError::Config("Connection closed mid-body".to_string()));
                    }
                }
                self.buffer.split_to(length).to_vec()
            }
            None => {
                while self.fill().await? > 0 {}
                self.buffer.split().to_vec()
            }
        };

        Ok(EchoResponse {
            status,
            informational,
            headers,
            body,
            first_byte,
        })
    }

    async fn fill(&mut self) -> Result<usize> {
        self.buffer.reserve(4096);
        timeout(self.read_timeout, self.stream.read_buf(&mut self.buffer))
            .await
            .map_err(|_| EchoError::Timeout("Read timeout".to_string()))?
            .map_err(EchoError::from)
    }
}

type ResponseHead = (u16, Vec<(String, String)>, usize);

fn parse_response_head(buf: &[u8]) -> Result<Option<ResponseHead>> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
    let mut response = httparse::Response::new(&mut headers);
    match response.parse(buf) {
        Ok(httparse::Status::Complete(consumed)) => {
            let headers = response
                .headers
                .iter()
                .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
                .collect();
            Ok(Some((response.code.unwrap_or_default(), headers, consumed)))
        }
        Ok(httparse::Status::Partial) => Ok(None),
        Err(e) => Err(EchoError::Config(format!("Malformed response: {e}"))),
    }
}
