use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use canprims_frame::hex::parse_hex_u32;
use canprims_frame::{text_to_header, Header, ID_MASK};

/// Default mask: compare identifier bits only, ignore the flag bits.
pub const MASK_RELAXED: u32 = ID_MASK;

/// Compare identifier and all flag bits.
pub const MASK_ALL: u32 = u32::MAX;

/// Characters that separate the pattern from the mask or upper bound.
pub const DELIMITERS: [char; 4] = [':', '~', '-', '_'];

/// Predicate over a header's [`fullid`](Header::fullid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Passes when `(fullid ^ pattern) & mask == 0`.
    Mask { pattern: u32, mask: u32, invert: bool },
    /// Passes when `low <= fullid <= high`.
    Range { low: u32, high: u32, invert: bool },
}

impl Filter {
    pub const fn mask(pattern: u32, mask: u32, invert: bool) -> Self {
        Self::Mask {
            pattern,
            mask,
            invert,
        }
    }

    pub const fn range(low: u32, high: u32, invert: bool) -> Self {
        Self::Range { low, high, invert }
    }

    /// Exact identifier match with the relaxed mask.
    pub const fn exact(id: u32) -> Self {
        Self::mask(id, MASK_RELAXED, false)
    }

    pub const fn is_inverted(&self) -> bool {
        match self {
            Self::Mask { invert, .. } | Self::Range { invert, .. } => *invert,
        }
    }

    /// Evaluate the filter against a header.
    pub fn matches(&self, header: &Header) -> bool {
        let fullid = header.fullid();
        match *self {
            Self::Mask {
                pattern,
                mask,
                invert,
            } => ((fullid ^ pattern) & mask == 0) != invert,
            Self::Range { low, high, invert } => (low <= fullid && fullid <= high) != invert,
        }
    }
}

impl From<u32> for Filter {
    fn from(id: u32) -> Self {
        Self::exact(id)
    }
}

/// Parse filter text: `<id>`, `<id>:<mask>`, `<id>~<mask>`, `<id>-<high>` or
/// `<id>_<high>`.
///
/// The first delimiter character found selects the variant; `~` and `_` are
/// the inverted forms. Text without a delimiter is an exact match on the
/// identifier bits. Never fails: unparsable hex reads as 0.
pub fn parse_filter(text: &str) -> Filter {
    let Some((pos, delim)) = text.char_indices().find(|(_, c)| DELIMITERS.contains(c)) else {
        return Filter::mask(text_to_header(text).fullid(), MASK_RELAXED, false);
    };

    let pattern = text_to_header(&text[..pos]).fullid();
    let second = parse_hex_u32(&text[pos + delim.len_utf8()..]);

    match delim {
        ':' => Filter::mask(pattern, second, false),
        '~' => Filter::mask(pattern, second, true),
        '-' => Filter::range(pattern, second, false),
        _ => Filter::range(pattern, second, true),
    }
}

impl FromStr for Filter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_filter(s))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Mask {
                pattern,
                mask,
                invert,
            } => write!(f, "{pattern:x}{}{mask:x}", if invert { '~' } else { ':' }),
            Self::Range { low, high, invert } => {
                write!(f, "{low:x}{}{high:x}", if invert { '_' } else { '-' })
            }
        }
    }
}
