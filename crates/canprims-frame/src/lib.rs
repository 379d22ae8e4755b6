//! CAN frame model and candump-style text codec.
//!
//! A frame is written as `<id-hex>#<payload-hex>`:
//! - standard ids unpadded (`123#dead`), extended ids padded to 8 digits
//!   (`0001abcd#`)
//! - bit 31 / 30 / 29 of the id carry the extended / RTR / error flags
//! - two hex digits per payload byte, at most 8 bytes
//!
//! Malformed text never panics: [`text_to_frame`] returns an invalid
//! sentinel frame, [`parse_frame`] reports the cause.

pub mod codec;
pub mod error;
pub mod header;
pub mod hex;
pub mod reader;
pub mod writer;

pub use codec::{
    frame_to_text, header_to_text, parse_frame, parse_header, sentinel_frame, text_to_frame,
    text_to_header, Frame, FrameConfig, MAX_DLC, SENTINEL_ID,
};
pub use error::{FrameError, Result};
pub use header::{Header, ERROR_MASK, EXTENDED_MASK, ID_MASK, RTR_MASK};
pub use reader::FrameReader;
pub use writer::FrameWriter;
