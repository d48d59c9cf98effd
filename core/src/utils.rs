//! Utility functions and types.

use std::fmt::Debug;

/// Redact hides secrets in `Debug` output.
///
/// Text shorter than 12 characters is fully masked; longer text keeps its
/// first and last three characters so different secrets stay tellable apart.
/// Raw key bytes are never shown, only their length.
pub enum Redact<'a> {
    /// Secret text such as an account key in its base64 form.
    Text(&'a str),
    /// Secret bytes such as a decoded account key.
    Bytes(&'a [u8]),
}

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact::Text(value)
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact::Text(value.as_str())
    }
}

impl<'a> From<&'a Option<String>> for Redact<'a> {
    fn from(value: &'a Option<String>) -> Self {
        Redact::Text(value.as_deref().unwrap_or_default())
    }
}

impl<'a> From<&'a [u8]> for Redact<'a> {
    fn from(value: &'a [u8]) -> Self {
        Redact::Bytes(value)
    }
}

impl<'a> From<&'a Vec<u8>> for Redact<'a> {
    fn from(value: &'a Vec<u8>) -> Self {
        Redact::Bytes(value.as_slice())
    }
}

impl Debug for Redact<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Redact::Bytes(bs) if bs.is_empty() => f.write_str("EMPTY"),
            Redact::Bytes(bs) => write!(f, "<{} bytes>", bs.len()),
            Redact::Text(s) => {
                let length = s.len();
                if length == 0 {
                    f.write_str("EMPTY")
                } else if length < 12 || !s.is_char_boundary(3) || !s.is_char_boundary(length - 3)
                {
                    f.write_str("***")
                } else {
                    f.write_str(&s[..3])?;
                    f.write_str("***")?;
                    f.write_str(&s[length - 3..])
                }
            }
        }
    }
}
