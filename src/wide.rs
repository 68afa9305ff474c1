//! Wide-character descriptor strings.
//!
//! HID descriptor strings (serial number, manufacturer, product) arrive as
//! NUL-terminated UTF-16 on Windows and as UTF-8 sysfs attributes on Linux.
//! [`WideString`] holds them as UTF-16 code units on every platform so callers
//! compare and truncate them the same way regardless of backend.
//!
//! ## Conventions
//! - Lengths (`maxlen`) are counted in UTF-16 code units and never include a terminator.
//! - An empty native string means "no string"; use [`WideString::non_empty`] to
//!   turn it into `None` instead of handing callers an empty value.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Owned UTF-16 string without a terminator.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct WideString(Vec<u16>);

impl WideString {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Wrap code units verbatim.
    pub fn from_units(units: Vec<u16>) -> Self {
        Self(units)
    }

    /// Copy a native buffer up to (not including) its first NUL.
    ///
    /// Buffers without a terminator are taken whole.
    pub fn from_nul_terminated(buf: &[u16]) -> Self {
        let len = buf.iter().position(|&u| u == 0).unwrap_or(buf.len());
        Self(buf[..len].to_vec())
    }

    pub fn units(&self) -> &[u16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `None` for an empty string, `Some(self)` otherwise.
    pub fn non_empty(self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    /// Keep at most `maxlen` code units.
    ///
    /// A surrogate pair split by the cut is dropped whole rather than left dangling.
    pub fn truncated(mut self, maxlen: usize) -> Self {
        if self.0.len() > maxlen {
            let mut cut = maxlen;
            if cut > 0 && is_high_surrogate(self.0[cut - 1]) {
                cut -= 1;
            }
            self.0.truncate(cut);
        }
        self
    }

    /// Decode into a Rust string, replacing unpaired surrogates with U+FFFD.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }

    /// Units followed by a NUL, for native calls that expect a C wide string.
    pub fn to_nul_terminated(&self) -> Vec<u16> {
        let mut out = Vec::with_capacity(self.0.len() + 1);
        out.extend_from_slice(&self.0);
        out.push(0);
        out
    }
}

#[inline]
fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..0xDC00).contains(&unit)
}

impl From<&str> for WideString {
    fn from(s: &str) -> Self {
        Self(s.encode_utf16().collect())
    }
}

impl From<String> for WideString {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl PartialEq<str> for WideString {
    fn eq(&self, other: &str) -> bool {
        self.0.iter().copied().eq(other.encode_utf16())
    }
}

impl PartialEq<&str> for WideString {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl fmt::Display for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in char::decode_utf16(self.0.iter().copied()) {
            fmt::Write::write_char(f, c.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

impl fmt::Debug for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

impl Serialize for WideString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

impl<'de> Deserialize<'de> for WideString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

/// Parse a sysfs-style hexadecimal id such as `"04d8"` or `"0x04D8"`.
pub(crate) fn parse_hex_u16(raw: &str) -> Option<u16> {
    let s = raw.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(s, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nul_terminated_buffer_stops_at_first_nul() {
        let buf = [b'A' as u16, b'B' as u16, 0, b'C' as u16];
        assert_eq!(WideString::from_nul_terminated(&buf), "AB");
        assert_eq!(WideString::from_nul_terminated(&[0u16; 8]).len(), 0);
        assert_eq!(WideString::from_nul_terminated(&[b'x' as u16]), "x");
    }

    #[test]
    fn empty_means_absent() {
        assert!(WideString::from("").non_empty().is_none());
        assert_eq!(WideString::from("12345").non_empty().unwrap(), "12345");
    }

    #[test]
    fn truncation_respects_surrogate_pairs() {
        // U+1F600 encodes as two units.
        let s = WideString::from("ab\u{1F600}");
        assert_eq!(s.len(), 4);
        assert_eq!(s.clone().truncated(3), "ab");
        assert_eq!(s.clone().truncated(4), "ab\u{1F600}");
        assert_eq!(s.truncated(0).len(), 0);
    }

    #[test]
    fn display_and_terminator() {
        let s = WideString::from("Microchip");
        assert_eq!(s.to_string(), "Microchip");
        let t = s.to_nul_terminated();
        assert_eq!(t.len(), 10);
        assert_eq!(t[9], 0);
    }

    #[test]
    fn hex_ids() {
        assert_eq!(parse_hex_u16("04d8"), Some(0x04d8));
        assert_eq!(parse_hex_u16("003F\n"), Some(0x003f));
        assert_eq!(parse_hex_u16("0x1234"), Some(0x1234));
        assert_eq!(parse_hex_u16("zz"), None);
        assert_eq!(parse_hex_u16("10000"), None);
    }
}
