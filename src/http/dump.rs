//! Re-serialization of a request head for the `Request:` section

use super::protocol::RequestHead;

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("value of header {name} contains a line break or NUL byte")]
    HeaderValue { name: String },
}

/// Headers written ahead of the sorted block, or not at all
const SPECIAL_HEADERS: [&str; 3] = ["host", "transfer-encoding", "trailer"];

/// Canonical form of a header name: `x-forwarded-for` becomes
/// `X-Forwarded-For`
///
/// Names containing bytes that are not header token characters are left
/// untouched.
pub fn canonical_header_key(name: &str) -> String {
    let is_token = |b: u8| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b);
    if !name.bytes().all(is_token) {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() };
            upper = c == '-';
            out
        })
        .collect()
}

/// Writes the request line and headers the way they would appear on the
/// wire, without the body
///
/// `Host` goes first (unless the target is in absolute form), then
/// `Transfer-Encoding`, then every other header under its canonical name,
/// sorted by name. Repeated headers keep their arrival order. Header values
/// are copied byte for byte, obs-text included; only a value that would
/// break the line structure of the head is refused.
pub fn dump_request(head: &RequestHead) -> Result<Vec<u8>, DumpError> {
    let mut out = Vec::with_capacity(256);
    out.extend_from_slice(format!("{} {} HTTP/1.{}\r\n", head.method, head.target, head.minor_version).as_bytes());

    let absolute_target = head.target.starts_with("http://") || head.target.starts_with("https://");
    if !absolute_target {
        if let Some(host) = head.header("host") {
            write_header(&mut out, "Host", host)?;
        }
    }

    let transfer_encodings: Vec<&[u8]> = head
        .headers
        .iter()
        .filter(|h| h.name.eq_ignore_ascii_case("transfer-encoding"))
        .map(|h| h.value.as_slice())
        .collect();
    if !transfer_encodings.is_empty() {
        write_header(&mut out, "Transfer-Encoding", &transfer_encodings.join(&b","[..]))?;
    }

    let mut rest: Vec<(String, &[u8])> = head
        .headers
        .iter()
        .filter(|h| !SPECIAL_HEADERS.iter().any(|s| h.name.eq_ignore_ascii_case(s)))
        .map(|h| (canonical_header_key(&h.name), h.value.as_slice()))
        .collect();
    rest.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, value) in rest {
        write_header(&mut out, &name, value)?;
    }
    out.extend_from_slice(b"\r\n");

    Ok(out)
}

fn write_header(out: &mut Vec<u8>, name: &str, value: &[u8]) -> Result<(), DumpError> {
    if value.iter().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(DumpError::HeaderValue { name: name.to_string() });
    }
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value);
    out.extend_from_slice(b"\r\n");
    Ok(())
}
