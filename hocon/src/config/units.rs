//! Duration and size coercion for accessor values.
//!
//! A duration or size is written as a number followed by an optional unit,
//! e.g. `500 ms`, `2 seconds`, `1.5h`, `512 KiB`, `10MB`. A bare number is
//! taken in the caller's default unit.

use std::time::Duration;

use crate::value::Number;

const NANOS_PER_MILLI: u128 = 1_000_000;

const DURATION_UNITS: &[(&[&str], u128)] = &[
    (&["ns", "nano", "nanos", "nanosecond", "nanoseconds"], 1),
    (&["us", "micro", "micros", "microsecond", "microseconds"], 1_000),
    (&["ms", "milli", "millis", "millisecond", "milliseconds"], NANOS_PER_MILLI),
    (&["s", "second", "seconds"], 1_000_000_000),
    (&["m", "minute", "minutes"], 60 * 1_000_000_000),
    (&["h", "hour", "hours"], 3_600 * 1_000_000_000),
    (&["d", "day", "days"], 86_400 * 1_000_000_000),
    (&["w", "week", "weeks"], 7 * 86_400 * 1_000_000_000),
];

const SIZE_UNITS: &[(&[&str], u128)] = &[
    (&["B", "b", "byte", "bytes"], 1),
    (&["kB", "kilobyte", "kilobytes"], 1_000),
    (&["MB", "megabyte", "megabytes"], 1_000_000),
    (&["GB", "gigabyte", "gigabytes"], 1_000_000_000),
    (&["TB", "terabyte", "terabytes"], 1_000_000_000_000),
    (&["PB", "petabyte", "petabytes"], 1_000_000_000_000_000),
    (&["EB", "exabyte", "exabytes"], 1_000_000_000_000_000_000),
    (&["K", "k", "Ki", "KiB", "kibibyte", "kibibytes"], 1 << 10),
    (&["M", "m", "Mi", "MiB", "mebibyte", "mebibytes"], 1 << 20),
    (&["G", "g", "Gi", "GiB", "gibibyte", "gibibytes"], 1 << 30),
    (&["T", "t", "Ti", "TiB", "tebibyte", "tebibytes"], 1 << 40),
    (&["P", "p", "Pi", "PiB", "pebibyte", "pebibytes"], 1 << 50),
    (&["E", "e", "Ei", "EiB", "exbibyte", "exbibytes"], 1 << 60),
];

/// Default unit of a bare duration number.
pub(crate) const MILLISECONDS: u128 = NANOS_PER_MILLI;

/// Splits `text` into its numeric part and unit suffix.
fn split(text: &str) -> Result<(Number, &str), String> {
    let text = text.trim();
    let idx = numeric_prefix_len(text);
    let (number, unit) = (text[..idx].trim(), text[idx..].trim());
    if number.is_empty() {
        return Err("missing number".to_string());
    }
    let number = Number::parse(number).ok_or_else(|| format!("'{number}' is not a number"))?;
    Ok((number, unit))
}

/// Length of the leading `[+-]digits[.digits][e[+-]digits]` run. An `e` not
/// followed by digits belongs to the unit.
fn numeric_prefix_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let digits = |mut end: usize| {
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        end
    };
    let mut end = digits(usize::from(matches!(bytes.first(), Some(b'+' | b'-'))));
    if bytes.get(end) == Some(&b'.') {
        end = digits(end + 1);
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        if bytes.get(exponent).is_some_and(u8::is_ascii_digit) {
            end = digits(exponent);
        }
    }
    end
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn scale(number: Number, factor: u128, kind: &str) -> Result<u128, String> {
    match number {
        Number::Int(value) => {
            let value = u128::try_from(value).map_err(|_| format!("negative {kind}"))?;
            value
                .checked_mul(factor)
                .ok_or_else(|| format!("{kind} out of range"))
        }
        Number::Float(value) if value < 0.0 => Err(format!("negative {kind}")),
        Number::Float(value) => {
            let scaled = (value * factor as f64).round();
            if scaled.is_finite() && scaled <= u128::MAX as f64 {
                Ok(scaled as u128)
            } else {
                Err(format!("{kind} out of range"))
            }
        }
    }
}

fn lookup(table: &[(&[&str], u128)], unit: &str) -> Option<u128> {
    table
        .iter()
        .find(|(names, _)| names.contains(&unit))
        .map(|(_, factor)| *factor)
}

/// Converts a number in `default_unit` nanoseconds into a duration.
pub(crate) fn duration_from_number(number: Number, default_unit: u128) -> Result<Duration, String> {
    nanos_to_duration(scale(number, default_unit, "duration")?)
}

/// Parses a duration string; a bare number is in `default_unit` nanoseconds.
pub(crate) fn parse_duration(text: &str, default_unit: u128) -> Result<Duration, String> {
    let (number, unit) = split(text)?;
    let factor = if unit.is_empty() {
        default_unit
    } else {
        lookup(DURATION_UNITS, unit).ok_or_else(|| format!("unknown duration unit '{unit}'"))?
    };
    nanos_to_duration(scale(number, factor, "duration")?)
}

fn nanos_to_duration(nanos: u128) -> Result<Duration, String> {
    let secs = u64::try_from(nanos / 1_000_000_000).map_err(|_| "duration out of range".to_string())?;
    // Remainder is below one billion.
    #[allow(clippy::cast_possible_truncation)]
    let subsec = (nanos % 1_000_000_000) as u32;
    Ok(Duration::new(secs, subsec))
}

/// Converts a bare number of bytes.
pub(crate) fn bytes_from_number(number: Number) -> Result<u64, String> {
    to_u64(scale(number, 1, "size")?)
}

/// Parses a size string; a bare number is in bytes.
pub(crate) fn parse_bytes(text: &str) -> Result<u64, String> {
    let (number, unit) = split(text)?;
    let factor = if unit.is_empty() {
        1
    } else {
        lookup(SIZE_UNITS, unit).ok_or_else(|| format!("unknown size unit '{unit}'"))?
    };
    to_u64(scale(number, factor, "size")?)
}

fn to_u64(value: u128) -> Result<u64, String> {
    u64::try_from(value).map_err(|_| "size out of range".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(text: &str) -> u128 {
        parse_duration(text, MILLISECONDS).unwrap().as_millis()
    }

    #[test]
    fn test_duration_units() {
        assert_eq!(millis("500 ms"), 500);
        assert_eq!(millis("2 seconds"), 2_000);
        assert_eq!(millis("2s"), 2_000);
        assert_eq!(millis("1.5h"), 5_400_000);
        assert_eq!(millis("1 minute"), 60_000);
        assert_eq!(millis("1d"), 86_400_000);
        assert_eq!(millis("2 weeks"), 1_209_600_000);
        assert_eq!(millis("250"), 250);
        assert_eq!(parse_duration("10 us", MILLISECONDS).unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("7ns", MILLISECONDS).unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_exponent_numbers() {
        assert_eq!(millis("1e3 ms"), 1_000);
        assert_eq!(millis("2e0s"), 2_000);
        assert_eq!(millis("1.5E+1 seconds"), 15_000);
        assert_eq!(parse_bytes("1e3").unwrap(), 1_000);
        assert_eq!(parse_bytes("2e1 KiB").unwrap(), 20 * 1_024);
        // No digits after the `e`: the suffix is the exbibyte unit.
        assert_eq!(parse_bytes("1e").unwrap(), 1 << 60);
        assert_eq!(parse_bytes("1E").unwrap(), 1 << 60);
    }

    #[test]
    fn test_duration_errors() {
        for text in ["5 fortnights", "ms", "", "-1s", "1.2.3 s", "5 S"] {
            assert!(parse_duration(text, MILLISECONDS).is_err(), "{text:?} should fail");
        }
        assert_eq!(
            parse_duration("5 fortnights", MILLISECONDS).unwrap_err(),
            "unknown duration unit 'fortnights'"
        );
    }

    #[test]
    fn test_duration_from_number() {
        assert_eq!(
            duration_from_number(Number::Int(1500), MILLISECONDS).unwrap(),
            Duration::from_millis(1500)
        );
        assert!(duration_from_number(Number::Int(-1), MILLISECONDS).is_err());
    }

    #[test]
    fn test_size_units() {
        assert_eq!(parse_bytes("512").unwrap(), 512);
        assert_eq!(parse_bytes("10 B").unwrap(), 10);
        assert_eq!(parse_bytes("1kB").unwrap(), 1_000);
        assert_eq!(parse_bytes("1 KiB").unwrap(), 1_024);
        assert_eq!(parse_bytes("1K").unwrap(), 1_024);
        assert_eq!(parse_bytes("1.5 MiB").unwrap(), 1_572_864);
        assert_eq!(parse_bytes("2 megabytes").unwrap(), 2_000_000);
        assert_eq!(parse_bytes("1 gibibyte").unwrap(), 1 << 30);
    }

    #[test]
    fn test_size_errors() {
        assert_eq!(parse_bytes("3 zorbs").unwrap_err(), "unknown size unit 'zorbs'");
        assert!(parse_bytes("100 EiB").is_err());
        assert!(parse_bytes("-5").is_err());
        assert_eq!(bytes_from_number(Number::Int(42)).unwrap(), 42);
    }
}
