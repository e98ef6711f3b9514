//! Query-string controlled response behavior
//!
//! Each parameter is parsed by a pure parse-or-default helper that reports
//! whether the default was substituted. Bad input is never an error for the
//! client; it only shows up here and in debug logs.

use super::duration::parse_duration;
use ::http::StatusCode;
use std::borrow::Cow;
use std::time::Duration;
use tracing::debug;

pub const DELAY_PARAM: &str = "delay";
pub const STATUS_PARAM: &str = "status";
pub const PAYLOAD_PARAM: &str = "payload";

/// A parameter value together with whether it fell back to the default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedParam<T> {
    pub value: T,
    pub used_default: bool,
}

impl<T> ParsedParam<T> {
    fn parsed(value: T) -> Self {
        Self {
            value,
            used_default: false,
        }
    }

    fn default_to(value: T) -> Self {
        Self {
            value,
            used_default: true,
        }
    }
}

/// Parses the `delay` parameter; absent or malformed means no delay
pub fn parse_delay(raw: Option<&str>) -> ParsedParam<Duration> {
    match raw.map(parse_duration) {
        Some(Ok(delay)) => ParsedParam::parsed(delay),
        _ => ParsedParam::default_to(Duration::ZERO),
    }
}

/// Parses the `status` parameter; absent, malformed or unrepresentable
/// codes mean `200 OK`
pub fn parse_status(raw: Option<&str>) -> ParsedParam<StatusCode> {
    let code = raw
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|n| u16::try_from(n).ok())
        .and_then(|n| StatusCode::from_u16(n).ok());
    match code {
        Some(status) => ParsedParam::parsed(status),
        None => ParsedParam::default_to(StatusCode::OK),
    }
}

/// Parses the `payload` parameter as a byte count
///
/// Negative counts parse but produce no payload. Counts above `max` are
/// clamped to `max`.
pub fn parse_payload(raw: Option<&str>, max: usize) -> ParsedParam<usize> {
    match raw.map(str::parse::<i64>) {
        Some(Ok(n)) => {
            let n = usize::try_from(n.max(0)).unwrap_or(usize::MAX);
            if n > max {
                debug!(requested = n, max, "Payload clamped to the configured maximum");
            }
            ParsedParam::parsed(n.min(max))
        }
        _ => ParsedParam::default_to(0),
    }
}

/// Returns the first value for `key` in a URL query string
///
/// Keys and values are percent-decoded, `+` decodes to a space.
pub fn query_value<'a>(query: &'a str, key: &str) -> Option<Cow<'a, str>> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}

/// Per-request response parameters derived from the query string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseParams {
    pub delay: ParsedParam<Duration>,
    pub status: ParsedParam<StatusCode>,
    pub payload: ParsedParam<usize>,
}

impl ResponseParams {
    /// Derives the parameters from an optional raw query string
    pub fn from_query(query: Option<&str>, max_payload: usize) -> Self {
        let query = query.unwrap_or("");
        let delay = query_value(query, DELAY_PARAM);
        let status = query_value(query, STATUS_PARAM);
        let payload = query_value(query, PAYLOAD_PARAM);

        Self {
            delay: parse_delay(delay.as_deref()),
            status: parse_status(status.as_deref()),
            payload: parse_payload(payload.as_deref(), max_payload),
        }
    }
}

impl Default for ResponseParams {
    fn default() -> Self {
        Self::from_query(None, 0)
    }
}
