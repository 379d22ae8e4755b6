//! CAN identifier metadata.
//!
//! A header is one packed 32-bit word:
//! - bit 31: extended (29-bit identifier)
//! - bit 30: remote transmission request
//! - bit 29: error frame
//! - bits 0-28: identifier

use std::fmt;
use std::str::FromStr;

use crate::error::FrameError;

/// Identifier bits.
pub const ID_MASK: u32 = (1 << 29) - 1;

/// Error frame flag.
pub const ERROR_MASK: u32 = 1 << 29;

/// Remote transmission request flag.
pub const RTR_MASK: u32 = 1 << 30;

/// Extended (29-bit) identifier flag.
pub const EXTENDED_MASK: u32 = 1 << 31;

/// Exclusive upper bound of a standard identifier.
pub const STANDARD_ID_LIMIT: u32 = 1 << 11;

/// Exclusive upper bound of an extended identifier.
pub const EXTENDED_ID_LIMIT: u32 = 1 << 29;

/// CAN identifier and frame flags.
///
/// Headers are plain data: out-of-range identifiers are representable and
/// only detected through [`Header::is_valid`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Header {
    bits: u32,
}

impl Header {
    /// Create a header. `id` is truncated to 29 bits.
    pub const fn new(id: u32, extended: bool, rtr: bool, error: bool) -> Self {
        let mut bits = id & ID_MASK;
        if error {
            bits |= ERROR_MASK;
        }
        if rtr {
            bits |= RTR_MASK;
        }
        if extended {
            bits |= EXTENDED_MASK;
        }
        Self { bits }
    }

    /// Standard (11-bit) data or remote frame header.
    pub const fn standard(id: u32, rtr: bool) -> Self {
        Self::new(id, false, rtr, false)
    }

    /// Extended (29-bit) data or remote frame header.
    pub const fn extended(id: u32, rtr: bool) -> Self {
        Self::new(id, true, rtr, false)
    }

    /// Error frame header.
    pub const fn error(id: u32) -> Self {
        Self::new(id, false, false, true)
    }

    /// Rebuild a header from its [`fullid`](Self::fullid) encoding.
    pub const fn from_fullid(fullid: u32) -> Self {
        Self { bits: fullid }
    }

    pub const fn id(&self) -> u32 {
        self.bits & ID_MASK
    }

    pub const fn is_extended(&self) -> bool {
        self.bits & EXTENDED_MASK != 0
    }

    pub const fn is_rtr(&self) -> bool {
        self.bits & RTR_MASK != 0
    }

    pub const fn is_error(&self) -> bool {
        self.bits & ERROR_MASK != 0
    }

    /// Replace the identifier, keeping the flags.
    pub fn set_id(&mut self, id: u32) {
        self.bits = (self.bits & !ID_MASK) | (id & ID_MASK);
    }

    pub fn set_extended(&mut self, extended: bool) {
        self.set_flag(EXTENDED_MASK, extended);
    }

    pub fn set_rtr(&mut self, rtr: bool) {
        self.set_flag(RTR_MASK, rtr);
    }

    pub fn set_error(&mut self, error: bool) {
        self.set_flag(ERROR_MASK, error);
    }

    fn set_flag(&mut self, mask: u32, on: bool) {
        if on {
            self.bits |= mask;
        } else {
            self.bits &= !mask;
        }
    }

    /// Returns true if the identifier fits the addressing mode.
    pub const fn is_valid(&self) -> bool {
        let limit = if self.is_extended() {
            EXTENDED_ID_LIMIT
        } else {
            STANDARD_ID_LIMIT
        };
        self.id() < limit
    }

    /// Identifier with all flag bits folded in.
    pub const fn fullid(&self) -> u32 {
        self.bits
    }

    /// Dispatch key: every error frame collapses onto [`ERROR_MASK`].
    pub const fn key(&self) -> u32 {
        if self.is_error() {
            ERROR_MASK
        } else {
            self.bits
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::codec::header_to_text(self, true))
    }
}

impl FromStr for Header {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::codec::parse_header(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_id_limit() {
        assert!(!Header::new(2048, false, false, false).is_valid());
        assert!(Header::new(2047, false, false, false).is_valid());
        assert!(Header::new(2048, true, false, false).is_valid());
    }

    #[test]
    fn extended_id_limit() {
        assert!(Header::extended(ID_MASK, false).is_valid());
        assert_eq!(Header::extended(ID_MASK + 1, false).id(), 0);
    }

    #[test]
    fn fullid_packs_flags_into_high_bits() {
        let header = Header::new(0x123, true, true, true);
        assert_eq!(
            header.fullid(),
            0x123 | EXTENDED_MASK | RTR_MASK | ERROR_MASK
        );
        assert_eq!(Header::standard(0x42, false).fullid(), 0x42);
        assert_eq!(Header::standard(0x42, true).fullid(), 0x42 | RTR_MASK);
    }

    #[test]
    fn key_collapses_error_frames() {
        assert_eq!(Header::error(0x4).key(), ERROR_MASK);
        assert_eq!(Header::error(0x80).key(), ERROR_MASK);
        assert_eq!(Header::standard(0x80, false).key(), 0x80);
        assert_ne!(Header::error(0).key(), Header::standard(0, false).key());
    }

    #[test]
    fn named_constructors() {
        let standard = Header::standard(0x7ff, true);
        assert!(!standard.is_extended() && standard.is_rtr() && !standard.is_error());

        let ext = Header::extended(0x1234, false);
        assert!(ext.is_extended() && !ext.is_rtr());

        let err = Header::error(0x10);
        assert!(err.is_error() && !err.is_extended());
    }

    #[test]
    fn setters_keep_other_bits() {
        let mut header = Header::extended(0x100, true);
        header.set_id(0x200);
        assert_eq!(header.id(), 0x200);
        assert!(header.is_extended() && header.is_rtr());

        header.set_rtr(false);
        header.set_error(true);
        assert!(!header.is_rtr() && header.is_error());
        assert_eq!(Header::from_fullid(header.fullid()), header);
    }

    #[test]
    fn display_and_parse() {
        let header: Header = "1abcdef0".parse().unwrap();
        assert!(header.is_extended());
        assert_eq!(header.to_string(), "1abcdef0");
        assert_eq!(Header::standard(0x7f, false).to_string(), "7f");
    }
}
