//! Duration strings in the `1h30m`, `500ms`, `10m0s` form.
//!
//! Resource configuration carries timeouts as strings. Parsing accepts a
//! sequence of decimal numbers, each with an optional fraction and a unit
//! suffix (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`). A bare `0` is allowed.
//! Negative values are rejected since every duration here is a wait.

use std::fmt::Write;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Largest representable duration, matching a signed 64-bit nanosecond count.
const MAX_NANOS: u128 = i64::MAX as u128;

/// Digits of fraction kept per component; anything finer is below 1ns for every unit.
const MAX_FRACTION_DIGITS: usize = 18;

/// Parse a duration string like "10m", "1h30m", "1.5s" or "0".
pub fn parse_duration(s: &str) -> ConfigResult<Duration> {
    let invalid = |reason: &str| ConfigError::InvalidDuration {
        value: s.to_string(),
        reason: reason.to_string(),
    };

    let mut rest = s.trim();
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    } else if rest.starts_with('-') {
        return Err(invalid("negative durations are not allowed"));
    }

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid("empty duration"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("expected a number"));
        }
        if fraction.contains('.') {
            return Err(invalid("malformed number"));
        }

        let scale = match unit {
            "" => return Err(invalid("missing unit")),
            other => unit_nanos(other)
                .ok_or_else(|| invalid(&format!("unknown unit {other:?}")))?,
        };

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("value out of range"))?
        };

        let mut nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| invalid("value out of range"))?;

        let mut numerator: u128 = 0;
        let mut denominator: u128 = 1;
        for digit in fraction.chars().take(MAX_FRACTION_DIGITS) {
            // `fraction` only holds ASCII digits at this point.
            numerator = numerator * 10 + u128::from(digit as u8 - b'0');
            denominator *= 10;
        }
        nanos = nanos
            .checked_add(numerator * scale / denominator)
            .ok_or_else(|| invalid("value out of range"))?;

        total = total
            .checked_add(nanos)
            .filter(|t| *t <= MAX_NANOS)
            .ok_or_else(|| invalid("value out of range"))?;

        rest = tail;
    }

    Ok(Duration::from_nanos(total as u64))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Render a duration the way timeouts are written in configuration,
/// e.g. `10m0s`, `1h30m0s`, `1.5s`, `250ms`.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return with_fraction(nanos, 1_000, "µs");
    }
    if nanos < NANOS_PER_SEC {
        return with_fraction(nanos, 1_000_000, "ms");
    }

    let secs = d.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = u128::from(secs % 60) * NANOS_PER_SEC + u128::from(d.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    out.push_str(&with_fraction(seconds, NANOS_PER_SEC, "s"));
    out
}

fn with_fraction(value: u128, unit: u128, suffix: &str) -> String {
    let whole = value / unit;
    let fraction = value % unit;
    if fraction == 0 {
        return format!("{whole}{suffix}");
    }
    let width = unit.to_string().len() - 1;
    let digits = format!("{fraction:0width$}");
    format!("{whole}.{}{suffix}", digits.trim_end_matches('0'))
}
