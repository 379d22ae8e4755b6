use std::fmt;
use std::io;

use crate::error::DriverError;
use crate::listener::{Listener, ListenerRegistry};

/// Lifecycle of a driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DriverState {
    /// Not initialized, or shut down.
    #[default]
    Closed,
    /// Device attached but not passing traffic.
    Open,
    /// Sending and receiving.
    Ready,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Ready => "ready",
        })
    }
}

/// Snapshot of a driver's health.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct State {
    pub driver_state: DriverState,
    /// Raw OS error value reported by the platform, if any.
    pub error_code: Option<i32>,
    /// Driver-specific error code; 0 means none.
    pub internal_error: u32,
}

impl State {
    pub const fn new(driver_state: DriverState) -> Self {
        Self {
            driver_state,
            error_code: None,
            internal_error: 0,
        }
    }

    pub const fn is_ready(&self) -> bool {
        matches!(self.driver_state, DriverState::Ready)
    }

    /// The platform error, if one was recorded.
    pub fn error(&self) -> Option<io::Error> {
        self.error_code.map(io::Error::from_raw_os_error)
    }

    /// The internal error, if the code is one this crate knows.
    pub fn driver_error(&self) -> Option<DriverError> {
        DriverError::from_code(self.internal_error)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.driver_state)?;
        if let Some(error) = self.error() {
            write!(f, " (os error: {error})")?;
        }
        if self.internal_error != 0 {
            write!(f, " (internal error {})", self.internal_error)?;
        }
        Ok(())
    }
}

/// Handle for a state subscription.
pub type StateListener = Listener<State>;

/// Registry notified on every driver state change.
pub type StateDispatcher = ListenerRegistry<State>;
