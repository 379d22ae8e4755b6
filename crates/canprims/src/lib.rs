//! CAN frame primitives with permissive licensing.
//!
//! canprims models CAN frames, reads and writes them in candump text form,
//! filters them by identifier, and fans them out to listeners.
//!
//! # Crate Structure
//!
//! - [`frame`]: headers, frames and the `<id>#<payload>` text codec
//! - [`filter`]: mask and range filters over header identifiers
//! - [`dispatch`]: listener registries, frame dispatch and the driver
//!   contract (behind the `dispatch` feature, on by default)

/// Re-export frame types.
pub mod frame {
    pub use canprims_frame::*;
}

/// Re-export filter types.
pub mod filter {
    pub use canprims_filter::*;
}

/// Re-export dispatch types (requires `dispatch` feature).
#[cfg(feature = "dispatch")]
pub mod dispatch {
    pub use canprims_dispatch::*;
}
