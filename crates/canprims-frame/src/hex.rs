//! Hexadecimal helpers for CAN payloads and identifiers.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Decode one hex digit (`0-9a-fA-F`).
pub fn hex_digit_to_value(c: char) -> Result<u8> {
    match c {
        '0'..='9' => Ok(c as u8 - b'0'),
        'a'..='f' => Ok(c as u8 - b'a' + 10),
        'A'..='F' => Ok(c as u8 - b'A' + 10),
        _ => Err(FrameError::InvalidDigit(c)),
    }
}

/// Encode a nibble as a hex digit.
pub fn value_to_hex_digit(value: u8, lowercase: bool) -> Result<char> {
    match value {
        0..=9 => Ok((b'0' + value) as char),
        10..=15 if lowercase => Ok((b'a' + value - 10) as char),
        10..=15 => Ok((b'A' + value - 10) as char),
        _ => Err(FrameError::InvalidNibble(value)),
    }
}

fn nibble(value: u8, lowercase: bool) -> char {
    // Masked input is always in range.
    value_to_hex_digit(value & 0xf, lowercase).unwrap_or('?')
}

/// Render one byte. The high digit is omitted only when it is zero and
/// `pad` is false.
pub fn byte_to_hex(byte: u8, pad: bool, lowercase: bool) -> String {
    let mut s = String::with_capacity(2);
    let hi = byte >> 4;
    if hi != 0 || pad {
        s.push(nibble(hi, lowercase));
    }
    s.push(nibble(byte, lowercase));
    s
}

/// Render a buffer as two hex digits per byte.
pub fn bytes_to_hex(bytes: &[u8], lowercase: bool) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        s.push(nibble(byte >> 4, lowercase));
        s.push(nibble(byte, lowercase));
    }
    s
}

/// Decode hex text into bytes.
///
/// Odd-length input is left-padded with a `0` nibble when `pad` is set and
/// rejected otherwise.
pub fn hex_to_bytes(text: &str, pad: bool) -> Result<Bytes> {
    let digits = text
        .chars()
        .map(hex_digit_to_value)
        .collect::<Result<Vec<u8>>>()?;

    let mut iter = digits.iter().copied();
    let mut out = BytesMut::with_capacity(digits.len().div_ceil(2));

    if digits.len() % 2 != 0 {
        if !pad {
            return Err(FrameError::OddLength(digits.len()));
        }
        if let Some(lo) = iter.next() {
            out.put_u8(lo);
        }
    }

    while let (Some(hi), Some(lo)) = (iter.next(), iter.next()) {
        out.put_u8((hi << 4) | lo);
    }

    Ok(out.freeze())
}

/// Result of scanning a hexadecimal integer prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HexScan<'a> {
    pub value: u32,
    pub digits: usize,
    pub overflow: bool,
    pub rest: &'a str,
}

/// Scan a hex integer the way a `std::hex` stream extraction would: skip
/// leading whitespace, accept an optional `0x` prefix, stop at the first
/// non-hex character. Overflow saturates to `u32::MAX`.
pub(crate) fn scan_hex(text: &str) -> HexScan<'_> {
    let trimmed = text.trim_start();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_hexdigit()))
        .unwrap_or(trimmed);

    let mut value: u32 = 0;
    let mut digits = 0usize;
    let mut overflow = false;

    for c in body.chars() {
        let Ok(d) = hex_digit_to_value(c) else {
            break;
        };
        digits += 1;
        match value.checked_mul(16).and_then(|v| v.checked_add(u32::from(d))) {
            Some(v) if !overflow => value = v,
            _ => overflow = true,
        }
    }

    if overflow {
        value = u32::MAX;
    }

    HexScan {
        value,
        digits,
        overflow,
        rest: &body[digits..],
    }
}

/// Parse a hex integer leniently: trailing text is ignored and input
/// without digits yields 0.
pub fn parse_hex_u32(text: &str) -> u32 {
    scan_hex(text).value
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn digit_values() {
        assert_eq!(hex_digit_to_value('0').unwrap(), 0);
        assert_eq!(hex_digit_to_value('9').unwrap(), 9);
        assert_eq!(hex_digit_to_value('a').unwrap(), 10);
        assert_eq!(hex_digit_to_value('F').unwrap(), 15);
        assert!(matches!(
            hex_digit_to_value('g'),
            Err(FrameError::InvalidDigit('g'))
        ));
    }

    #[test]
    fn nibble_digits() {
        assert_eq!(value_to_hex_digit(11, true).unwrap(), 'b');
        assert_eq!(value_to_hex_digit(11, false).unwrap(), 'B');
        assert!(matches!(
            value_to_hex_digit(16, true),
            Err(FrameError::InvalidNibble(16))
        ));
    }

    #[test]
    fn byte_padding() {
        assert_eq!(byte_to_hex(0x0a, false, true), "a");
        assert_eq!(byte_to_hex(0x0a, true, true), "0a");
        assert_eq!(byte_to_hex(0xab, false, false), "AB");
        assert_eq!(byte_to_hex(0x00, false, true), "0");
    }

    #[test]
    fn buffer_rendering() {
        assert_eq!(bytes_to_hex(&[], true), "");
        assert_eq!(bytes_to_hex(&[0x01, 0xab, 0x00], true), "01ab00");
        assert_eq!(bytes_to_hex(&[0x01, 0xab, 0x00], false), "01AB00");
    }

    #[test]
    fn odd_length_policy() {
        assert!(matches!(
            hex_to_bytes("abc", false),
            Err(FrameError::OddLength(3))
        ));
        assert_eq!(hex_to_bytes("abc", true).unwrap().as_ref(), &[0x0a, 0xbc]);
        assert_eq!(hex_to_bytes("", false).unwrap().as_ref(), &[] as &[u8]);
    }

    #[test]
    fn bad_digit_in_buffer() {
        assert!(matches!(
            hex_to_bytes("0x12", false),
            Err(FrameError::InvalidDigit('x'))
        ));
    }

    #[test]
    fn scan_follows_stream_extraction() {
        assert_eq!(parse_hex_u32("7FF"), 0x7ff);
        assert_eq!(parse_hex_u32("  0x1a"), 0x1a);
        assert_eq!(parse_hex_u32("12zz"), 0x12);
        assert_eq!(parse_hex_u32("zz"), 0);
        assert_eq!(parse_hex_u32(""), 0);
        assert_eq!(parse_hex_u32("1ffffffff"), u32::MAX);

        let scan = scan_hex("123#");
        assert_eq!((scan.value, scan.digits, scan.rest), (0x123, 3, "#"));
        assert!(scan_hex("100000000").overflow);
        assert_eq!(scan_hex("0xg").digits, 1);
    }

    proptest! {
        #[test]
        fn buffer_hex_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..64), lc in any::<bool>()) {
            let text = bytes_to_hex(&bytes, lc);
            prop_assert_eq!(text.len(), bytes.len() * 2);
            let decoded = hex_to_bytes(&text, false).unwrap();
            prop_assert_eq!(decoded.as_ref(), bytes.as_slice());
        }
    }
}
