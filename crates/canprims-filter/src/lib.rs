//! Identifier filters for CAN frame streams.
//!
//! Filters are compact text tokens, suited to config files and CLI
//! arguments:
//! - `123` exact identifier
//! - `123:7ff` mask, `123~7ff` inverted mask
//! - `100-1ff` inclusive range, `100_1ff` inverted range
//!
//! Drivers apply filters before dispatch to discard unwanted frames.

pub mod error;
pub mod filter;
pub mod list;

pub use error::{FilterError, Result};
pub use filter::{parse_filter, Filter, MASK_ALL, MASK_RELAXED};
pub use list::{filtered, FilterList};
