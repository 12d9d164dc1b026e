use std::{
    fmt,
    num::{ParseFloatError, ParseIntError},
};

use serde::{Serialize, Serializer, ser::Error as _};

/// A JSON number kept as its literal text.
///
/// Decoding into a `Number` never loses precision; conversion happens only
/// when the caller asks for it.
///
/// ```
/// use jsonpipe::Number;
///
/// let n = Number::from("12345678901234567890");
/// assert!(n.as_i64().is_err());
/// assert_eq!(n.as_str(), "12345678901234567890");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Number(String);

impl Number {
    /// The literal text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the literal as a float.
    ///
    /// # Errors
    ///
    /// Fails when the literal is not a float.
    pub fn as_f64(&self) -> Result<f64, ParseFloatError> {
        self.0.parse()
    }

    /// Parses the literal as a signed integer.
    ///
    /// # Errors
    ///
    /// Fails for fractions, exponents and out-of-range values.
    pub fn as_i64(&self) -> Result<i64, ParseIntError> {
        self.0.parse()
    }

    /// Reports whether `s` follows the JSON number grammar.
    #[must_use]
    pub fn is_valid(s: &str) -> bool {
        let mut s = s.as_bytes();
        if let [b'-', rest @ ..] = s {
            s = rest;
        }
        match s {
            [b'0', rest @ ..] => s = rest,
            [b'1'..=b'9', rest @ ..] => s = skip_digits(rest),
            _ => return false,
        }
        if let [b'.', b'0'..=b'9', rest @ ..] = s {
            s = skip_digits(rest);
        }
        if let [b'e' | b'E', rest @ ..] = s {
            s = match rest {
                [b'+' | b'-', digits @ ..] => digits,
                _ => rest,
            };
            let [b'0'..=b'9', rest @ ..] = s else {
                return false;
            };
            s = skip_digits(rest);
        }
        s.is_empty()
    }
}

fn skip_digits(s: &[u8]) -> &[u8] {
    let n = s.iter().take_while(|c| c.is_ascii_digit()).count();
    &s[n..]
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Number {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Number {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<Number> for String {
    fn from(n: Number) -> Self {
        n.0
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let literal = if self.0.is_empty() { "0" } else { &self.0 };
        if !Number::is_valid(literal) {
            return Err(S::Error::custom(format!(
                "json: invalid number literal {literal:?}"
            )));
        }
        let raw = serde_json::value::RawValue::from_string(literal.to_owned())
            .map_err(S::Error::custom)?;
        raw.serialize(serializer)
    }
}
