//! Numeric leaf values.

use std::fmt;

/// A numeric configuration value.
///
/// Integers that fit in an `i64` are kept exact; everything else is stored
/// as an `f64`.
///
/// # Examples
///
/// ```
/// use hocon::Number;
///
/// assert_eq!(Number::parse("42"), Some(Number::Int(42)));
/// assert_eq!(Number::parse("1.5"), Some(Number::Float(1.5)));
/// assert_eq!(Number::parse("1.5ms"), None);
/// assert_eq!(Number::Float(2.0).to_string(), "2.0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
}

impl Number {
    /// Parses a JSON number literal.
    ///
    /// Returns `None` unless the whole of `text` is a number: an optional
    /// minus sign, an integer part without leading zeros, an optional
    /// fraction and an optional exponent.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        if !Self::is_number_literal(text) {
            return None;
        }
        let is_integer = !text.contains(['.', 'e', 'E']);
        if is_integer {
            if let Ok(value) = text.parse::<i64>() {
                return Some(Self::Int(value));
            }
        }
        text.parse::<f64>().ok().map(Self::Float)
    }

    fn is_number_literal(text: &str) -> bool {
        let bytes = text.as_bytes();
        let mut i = 0;
        if bytes.first() == Some(&b'-') {
            i += 1;
        }
        let int_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let int_len = i - int_start;
        if int_len == 0 || (int_len > 1 && bytes[int_start] == b'0') {
            return false;
        }
        if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
            let frac_start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i == frac_start {
                return false;
            }
        }
        if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
            i += 1;
            if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
                i += 1;
            }
            let exp_start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i == exp_start {
                return false;
            }
        }
        i == bytes.len()
    }

    /// The value as an `i64`, if it is an integer or an integral float in range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(value),
            Self::Float(value)
                if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 =>
            {
                Some(value as i64)
            }
            Self::Float(_) => None,
        }
    }

    /// The value as an `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(value) => value as f64,
            Self::Float(value) => value,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => {
                let text = value.to_string();
                if value.is_finite() && !text.contains(['.', 'e', 'E']) {
                    write!(f, "{text}.0")
                } else {
                    f.write_str(&text)
                }
            }
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}
