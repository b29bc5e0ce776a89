//! Go-style duration text: `300ms`, `30s`, `5m`, `1h30m`, `1.5h`.
//!
//! Units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. Every number needs a
//! unit, except a bare `0`.

use std::time::Duration;

const NANOS_PER_UNIT: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("us", 1e3),
    ("µs", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60e9),
    ("h", 3600e9),
];

/// Parse a duration; the error string is shown by clap as-is.
pub fn parse(input: &str) -> Result<Duration, String> {
    let text = input.trim();
    if text.is_empty() {
        return Err("duration must not be empty".to_string());
    }
    if text == "0" {
        return Ok(Duration::ZERO);
    }

    let mut nanos = 0f64;
    let mut rest = text;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("invalid duration '{input}': expected a number"));
        }
        let (number, tail) = rest.split_at(number_len);
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid duration '{input}': bad number '{number}'"))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(format!(
                "invalid duration '{input}': missing unit (ns, us, ms, s, m, h)"
            ));
        }
        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| format!("invalid duration '{input}': unknown unit '{unit}'"))?;

        nanos += value * scale;
        rest = tail;
    }

    if !nanos.is_finite() || nanos > u64::MAX as f64 {
        return Err(format!("invalid duration '{input}': out of range"));
    }
    Ok(Duration::from_nanos(nanos.round() as u64))
}
