//! Duration strings in the `300ms` / `1h30m` / `-1.5s` style
//!
//! The grammar is an optional sign followed by one or more
//! `<decimal><unit>` groups. The string `0` is accepted without a unit.
//! Valid units are `ns`, `us` (`µs`, `μs`), `ms`, `s`, `m` and `h`.

use std::time::Duration;

/// Largest representable magnitude, in nanoseconds
const MAX_NANOS: u128 = i64::MAX as u128;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("invalid duration {0:?}")]
    Invalid(String),
    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
    #[error("invalid duration {0:?}: out of range")]
    Overflow(String),
}

fn unit_nanos(unit: &str) -> Option<u128> {
    let nanos = match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 60 * 60 * 1_000_000_000,
        _ => return None,
    };
    Some(nanos)
}

/// Parses a duration string
///
/// Negative durations are valid input but `std::time::Duration` is
/// unsigned, so they come back as `Duration::ZERO`.
///
/// ```
/// use httpecho::http::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
/// assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
/// assert_eq!(parse_duration("-2s").unwrap(), Duration::ZERO);
/// assert!(parse_duration("5").is_err());
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let invalid = || DurationError::Invalid(input.to_string());

    let mut rest = input;
    let mut negative = false;
    if let Some(stripped) = rest.strip_prefix('-') {
        negative = true;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after_int) = rest.split_at(int_len);

        let (frac_part, after_number) = match after_int.strip_prefix('.') {
            Some(after_dot) => {
                let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
                after_dot.split_at(frac_len)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_len = after_number
            .char_indices()
            .find(|(_, c)| *c == '.' || c.is_ascii_digit())
            .map_or(after_number.len(), |(i, _)| i);
        let (unit, after_unit) = after_number.split_at(unit_len);
        if unit.is_empty() {
            return Err(DurationError::MissingUnit(input.to_string()));
        }
        let scale = unit_nanos(unit).ok_or_else(|| DurationError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })?;

        let overflow = || DurationError::Overflow(input.to_string());
        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse::<u128>().map_err(|_| overflow())?
        };
        let nanos = whole.checked_mul(scale).ok_or_else(overflow)?;

        // Fractional digits beyond nanosecond precision cannot contribute.
        let mut frac_value: u128 = 0;
        let mut frac_scale: u128 = 1;
        for digit in frac_part.bytes().take(20) {
            frac_value = frac_value * 10 + u128::from(digit - b'0');
            frac_scale *= 10;
        }
        let nanos = nanos
            .checked_add(frac_value * scale / frac_scale)
            .ok_or_else(overflow)?;

        total = total.checked_add(nanos).ok_or_else(overflow)?;
        let limit = if negative { MAX_NANOS + 1 } else { MAX_NANOS };
        if total > limit {
            return Err(overflow());
        }

        rest = after_unit;
    }

    if negative {
        return Ok(Duration::ZERO);
    }
    let secs = (total / 1_000_000_000) as u64;
    let subsec = (total % 1_000_000_000) as u32;
    Ok(Duration::new(secs, subsec))
}
