use crate::header::Header;

/// Errors that can occur while converting or streaming CAN frame text.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A character outside `0-9a-fA-F`.
    #[error("invalid hex digit {0:?}")]
    InvalidDigit(char),

    /// A nibble value above 15.
    #[error("value {0} does not fit a hex digit")]
    InvalidNibble(u8),

    /// Hex text with an odd number of digits and padding disabled.
    #[error("odd-length hex text ({0} digits)")]
    OddLength(usize),

    /// No hex digits where an identifier was expected.
    #[error("missing identifier")]
    MissingId,

    /// Identifier text does not fit 32 bits or has trailing garbage.
    #[error("malformed identifier {0:?}")]
    MalformedId(String),

    /// Frame text without the `#` separator.
    #[error("missing '#' separator")]
    MissingSeparator,

    /// The payload exceeds the 8-byte frame capacity.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The identifier does not fit its addressing mode.
    #[error("invalid header {0}")]
    InvalidHeader(Header),

    /// A text line exceeds the configured maximum length.
    #[error("line too long ({len} bytes, max {max})")]
    LineTooLong { len: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended.
    #[error("end of stream")]
    EndOfStream,
}

pub type Result<T> = std::result::Result<T, FrameError>;
