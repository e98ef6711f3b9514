use ::http::StatusCode;
use bytes::{Buf, Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Most headers accepted in one request head
pub const MAX_HEADERS: usize = 100;

const READ_CHUNK: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum HttpProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP parsing error: {0}")]
    HttpParse(String),
    #[error("Request head exceeds {0} bytes or {MAX_HEADERS} headers")]
    HeadersTooLarge(usize),
    #[error("Unsupported HTTP version")]
    UnsupportedVersion,
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),
    #[error("Incomplete request")]
    IncompleteRequest,
}

impl HttpProtocolError {
    /// Status to answer with before dropping the connection, if the peer
    /// can still be told anything useful
    pub fn response_status(&self) -> Option<StatusCode> {
        match self {
            HttpProtocolError::HttpParse(_) | HttpProtocolError::InvalidContentLength(_) => {
                Some(StatusCode::BAD_REQUEST)
            }
            HttpProtocolError::HeadersTooLarge(_) => Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE),
            HttpProtocolError::UnsupportedVersion => Some(StatusCode::HTTP_VERSION_NOT_SUPPORTED),
            HttpProtocolError::Io(_) | HttpProtocolError::IncompleteRequest => None,
        }
    }
}

/// One header exactly as it arrived on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader {
    pub name: String,
    pub value: Vec<u8>,
}

/// Request line and headers of one HTTP/1.x request
///
/// The body is never part of the head; it is drained separately so the
/// connection stays framed for the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    /// Request target as received (origin form, absolute form or `*`)
    pub target: String,
    /// Minor version of HTTP/1.x
    pub minor_version: u8,
    pub headers: Vec<RawHeader>,
}

impl RequestHead {
    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_slice())
    }

    /// Query string without the leading `?`
    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, q)| q)
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }

    /// Whether any `Transfer-Encoding` header names `chunked`
    pub fn is_chunked(&self) -> bool {
        self.header_tokens("transfer-encoding")
            .any(|t| t.eq_ignore_ascii_case("chunked"))
    }

    /// Declared body length; conflicting or malformed values are an error
    pub fn content_length(&self) -> Result<Option<u64>, HttpProtocolError> {
        let mut length = None;
        for header in self.headers.iter().filter(|h| h.name.eq_ignore_ascii_case("content-length")) {
            let text = std::str::from_utf8(&header.value)
                .map_err(|_| HttpProtocolError::InvalidContentLength("not ASCII".to_string()))?;
            let value = text
                .trim()
                .parse::<u64>()
                .map_err(|_| HttpProtocolError::InvalidContentLength(text.to_string()))?;
            match length {
                Some(previous) if previous != value => {
                    return Err(HttpProtocolError::InvalidContentLength(format!(
                        "conflicting values {previous} and {value}"
                    )));
                }
                _ => length = Some(value),
            }
        }
        Ok(length)
    }

    /// Whether the connection must close after this request's response
    pub fn wants_close(&self) -> bool {
        let mut tokens = self.header_tokens("connection");
        if self.minor_version == 0 {
            !tokens.any(|t| t.eq_ignore_ascii_case("keep-alive"))
        } else {
            tokens.any(|t| t.eq_ignore_ascii_case("close"))
        }
    }

    fn header_tokens<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |h| h.name.eq_ignore_ascii_case(name))
            .filter_map(|h| std::str::from_utf8(&h.value).ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
    }
}

/// `Connection` header sent with a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionHeader {
    /// Persistence follows the protocol default
    Omit,
    /// Confirms a persistent HTTP/1.0 connection
    KeepAlive,
    Close,
}

impl ConnectionHeader {
    /// Header for a response to `head`, given whether the connection is
    /// about to close
    pub fn for_request(head: &RequestHead, close: bool) -> Self {
        if close {
            ConnectionHeader::Close
        } else if head.minor_version == 0 {
            ConnectionHeader::KeepAlive
        } else {
            ConnectionHeader::Omit
        }
    }
}

/// Response produced by the echo handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
    /// Informational status written ahead of the final response
    pub interim: Option<StatusCode>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
            interim: None,
        }
    }

    /// Plain-text error response, newline terminated
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::new(status, format!("{message}\n"))
    }

    pub fn with_interim(mut self, status: StatusCode) -> Self {
        self.interim = Some(status);
        self
    }

    /// 1xx, 204 and 304 responses carry no body on the wire
    pub fn body_allowed(&self) -> bool {
        !(self.status.is_informational()
            || self.status == StatusCode::NO_CONTENT
            || self.status == StatusCode::NOT_MODIFIED)
    }

    /// Serializes the response; `head_only` suppresses the body of a HEAD
    /// request while still reporting its length
    pub fn encode(&self, head_only: bool, connection: ConnectionHeader) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 160);
        if let Some(interim) = self.interim {
            write_status_line(&mut out, interim);
            out.extend_from_slice(b"\r\n");
        }
        write_status_line(&mut out, self.status);

        let body_allowed = self.body_allowed();
        if body_allowed {
            out.extend_from_slice(b"Content-Type: text/plain; charset=utf-8\r\n");
            out.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        }
        match connection {
            ConnectionHeader::Omit => {}
            ConnectionHeader::KeepAlive => out.extend_from_slice(b"Connection: keep-alive\r\n"),
            ConnectionHeader::Close => out.extend_from_slice(b"Connection: close\r\n"),
        }
        out.extend_from_slice(b"\r\n");

        if body_allowed && !head_only {
            out.extend_from_slice(&self.body);
        }
        out
    }
}

fn write_status_line(out: &mut Vec<u8>, status: StatusCode) {
    let reason = status.canonical_reason().unwrap_or("");
    out.extend_from_slice(format!("HTTP/1.1 {} {}\r\n", status.as_u16(), reason).as_bytes());
}

/// HTTP/1.x framing over a byte stream
///
/// Buffers whatever the peer sends beyond the current request head so
/// pipelined requests are not lost.
pub struct HttpStream<S> {
    inner: S,
    buffer: BytesMut,
}

impl<S> HttpStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Reads the next request head
    ///
    /// Returns `Ok(None)` when the peer closes the connection cleanly
    /// between requests.
    pub async fn read_request(&mut self, max_header_bytes: usize) -> Result<Option<RequestHead>, HttpProtocolError> {
        loop {
            if !self.buffer.is_empty() {
                if let Some((head, consumed)) = parse_head(&self.buffer, max_header_bytes)? {
                    self.buffer.advance(consumed);
                    return Ok(Some(head));
                }
            }

            self.buffer.reserve(READ_CHUNK);
            let n = self.inner.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(HttpProtocolError::IncompleteRequest);
            }
        }
    }

    /// Reads and discards `length` body bytes
    pub async fn discard_body(&mut self, length: u64) -> Result<(), HttpProtocolError> {
        let buffered = usize::try_from(length).unwrap_or(usize::MAX).min(self.buffer.len());
        self.buffer.advance(buffered);

        let remaining = length - buffered as u64;
        if remaining > 0 {
            let copied = tokio::io::copy(&mut (&mut self.inner).take(remaining), &mut tokio::io::sink()).await?;
            if copied < remaining {
                return Err(HttpProtocolError::IncompleteRequest);
            }
        }
        Ok(())
    }

    pub async fn write_response(
        &mut self,
        response: &HttpResponse,
        head_only: bool,
        connection: ConnectionHeader,
    ) -> Result<(), HttpProtocolError> {
        self.inner.write_all(&response.encode(head_only, connection)).await?;
        self.inner.flush().await?;
        Ok(())
    }
}

/// Parses a complete request head from the front of `buf`
///
/// Returns the head and the number of bytes it occupied, or `None` when
/// more input is needed.
pub fn parse_head(buf: &[u8], max_header_bytes: usize) -> Result<Option<(RequestHead, usize)>, HttpProtocolError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);

    match req.parse(buf) {
        Ok(httparse::Status::Complete(consumed)) => {
            if consumed > max_header_bytes {
                return Err(HttpProtocolError::HeadersTooLarge(max_header_bytes));
            }
            let head = RequestHead {
                method: req.method.unwrap_or_default().to_string(),
                target: req.path.unwrap_or_default().to_string(),
                minor_version: req.version.unwrap_or(1),
                headers: req
                    .headers
                    .iter()
                    .map(|h| RawHeader {
                        name: h.name.to_string(),
                        value: h.value.to_vec(),
                    })
                    .collect(),
            };
            Ok(Some((head, consumed)))
        }
        Ok(httparse::Status::Partial) => {
            if buf.len() > max_header_bytes {
                return Err(HttpProtocolError::HeadersTooLarge(max_header_bytes));
            }
            Ok(None)
        }
        Err(httparse::Error::TooManyHeaders) => Err(HttpProtocolError::HeadersTooLarge(max_header_bytes)),
        Err(httparse::Error::Version) => Err(HttpProtocolError::UnsupportedVersion),
        Err(e) => Err(HttpProtocolError::HttpParse(format!("Failed to parse request head: {e}"))),
    }
}
