use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{FrameError, Result};
use crate::header::{Header, EXTENDED_MASK, ID_MASK, STANDARD_ID_LIMIT};
use crate::hex::{bytes_to_hex, hex_to_bytes, scan_hex};

/// Payload capacity of a classic CAN frame.
pub const MAX_DLC: usize = 8;

/// Identifier carried by frames that failed to parse.
pub const SENTINEL_ID: u32 = 0xfff;

/// Separator between identifier and payload in frame text.
pub const SEPARATOR: char = '#';

/// Default maximum length of one text line in a frame stream.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 256;

/// A classic CAN frame: header plus up to 8 payload bytes.
///
/// Equality and hashing ignore buffer bytes past `dlc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frame {
    /// Identifier and flags.
    pub header: Header,
    /// Payload buffer; only the first `dlc` bytes are meaningful.
    pub data: [u8; MAX_DLC],
    /// Number of valid payload bytes.
    pub dlc: u8,
}

impl Frame {
    /// Create an empty frame for a header.
    pub fn new(header: Header) -> Self {
        Self {
            header,
            data: [0; MAX_DLC],
            dlc: 0,
        }
    }

    /// Create a frame carrying `payload`.
    pub fn with_data(header: Header, payload: &[u8]) -> Result<Self> {
        if payload.len() > MAX_DLC {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_DLC,
            });
        }
        let mut frame = Self::new(header);
        frame.data[..payload.len()].copy_from_slice(payload);
        frame.dlc = payload.len() as u8;
        Ok(frame)
    }

    /// The valid payload bytes (clamped to the buffer capacity).
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.dlc).min(MAX_DLC)]
    }

    /// Returns true if both the length and the header are valid.
    pub fn is_valid(&self) -> bool {
        usize::from(self.dlc) <= MAX_DLC && self.header.is_valid()
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.header == other.header && self.dlc == other.dlc && self.payload() == other.payload()
    }
}

impl Eq for Frame {}

impl Hash for Frame {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.header.hash(state);
        self.dlc.hash(state);
        self.payload().hash(state);
    }
}

impl From<Header> for Frame {
    fn from(header: Header) -> Self {
        Self::new(header)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&frame_to_text(self, true))
    }
}

impl FromStr for Frame {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        parse_frame(s)
    }
}

/// The frame returned by [`text_to_frame`] when the text is malformed.
pub fn sentinel_frame() -> Frame {
    Frame::new(Header::standard(SENTINEL_ID, false))
}

/// Render a header as hex. Extended identifiers are zero-padded to 8 digits.
pub fn header_to_text(header: &Header, lowercase: bool) -> String {
    let value = header.fullid() & !EXTENDED_MASK;
    match (header.is_extended(), lowercase) {
        (true, true) => format!("{value:08x}"),
        (true, false) => format!("{value:08X}"),
        (false, true) => format!("{value:x}"),
        (false, false) => format!("{value:X}"),
    }
}

fn header_from_raw(raw: u32, text_len: usize) -> Header {
    let id = raw & ID_MASK;
    // An unflagged 8-digit id that cannot be standard is treated as extended.
    let extended = raw & EXTENDED_MASK != 0 || (text_len == 8 && id >= STANDARD_ID_LIMIT);
    let mut header = Header::from_fullid(raw & !EXTENDED_MASK);
    header.set_extended(extended);
    header
}

/// Parse a hex header leniently. Trailing text is ignored and text without
/// digits parses as identifier 0.
pub fn text_to_header(text: &str) -> Header {
    header_from_raw(scan_hex(text).value, text.len())
}

/// Parse a hex header, rejecting empty, overflowing or trailing text.
pub fn parse_header(text: &str) -> Result<Header> {
    let scan = scan_hex(text);
    if scan.digits == 0 {
        return Err(FrameError::MissingId);
    }
    if scan.overflow || !scan.rest.is_empty() {
        return Err(FrameError::MalformedId(text.to_string()));
    }
    Ok(header_from_raw(scan.value, text.len()))
}

/// Render a frame as `<id-hex>#<payload-hex>`.
pub fn frame_to_text(frame: &Frame, lowercase: bool) -> String {
    let mut s = header_to_text(&frame.header, lowercase);
    s.push(SEPARATOR);
    s.push_str(&bytes_to_hex(frame.payload(), lowercase));
    s
}

/// Parse `<id-hex>#<payload-hex>`, reporting why malformed text failed.
///
/// A well-formed text whose identifier does not fit its addressing mode
/// yields [`FrameError::InvalidHeader`].
pub fn parse_frame(text: &str) -> Result<Frame> {
    let (id_text, payload_text) = text
        .split_once(SEPARATOR)
        .ok_or(FrameError::MissingSeparator)?;

    let header = parse_header(id_text)?;
    let payload = hex_to_bytes(payload_text, false)?;
    if !header.is_valid() {
        return Err(FrameError::InvalidHeader(header));
    }
    Frame::with_data(header, &payload)
}

/// Parse frame text, never failing.
///
/// The identifier is read leniently with [`text_to_header`], so `12x#00`
/// yields id `0x12` and `#00` yields id 0. A missing separator or a
/// malformed or oversized payload yields [`sentinel_frame`]. An
/// out-of-range identifier yields an empty frame carrying that header
/// without decoding the payload. Check [`Frame::is_valid`] afterwards.
pub fn text_to_frame(text: &str) -> Frame {
    let Some((id_text, payload_text)) = text.split_once(SEPARATOR) else {
        tracing::trace!(text, "frame text without separator");
        return sentinel_frame();
    };

    let header = text_to_header(id_text);
    if !header.is_valid() {
        return Frame::new(header);
    }

    match hex_to_bytes(payload_text, false).and_then(|payload| Frame::with_data(header, &payload)) {
        Ok(frame) => frame,
        Err(err) => {
            tracing::trace!(text, error = %err, "malformed frame payload");
            sentinel_frame()
        }
    }
}

/// Configuration for frame text streams.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Render hex letters in lowercase. Default: true.
    pub lowercase: bool,
    /// Maximum accepted line length in bytes. Default: 256.
    pub max_line_length: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}
