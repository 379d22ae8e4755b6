/// Internal driver error conditions.
///
/// Each variant has a stable numeric code carried in
/// [`State::internal_error`](crate::State::internal_error); code 0 means no
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum DriverError {
    /// An operation needed an initialized driver.
    #[error("driver not initialized")]
    NotInitialized,

    /// The device name was empty or unknown.
    #[error("no such device")]
    NoDevice,

    /// The controller left the bus after too many errors.
    #[error("bus off")]
    BusOff,

    /// The receive queue dropped frames.
    #[error("receive queue overflow")]
    QueueOverflow,

    /// The driver is shutting down.
    #[error("driver shut down")]
    Shutdown,

    /// The frame's identifier does not fit its addressing mode.
    #[error("invalid frame")]
    InvalidFrame,
}

impl DriverError {
    /// Text for a successful (zero) code.
    pub const OK_TEXT: &'static str = "OK";

    pub const fn code(self) -> u32 {
        match self {
            Self::NotInitialized => 1,
            Self::NoDevice => 2,
            Self::BusOff => 3,
            Self::QueueOverflow => 4,
            Self::Shutdown => 5,
            Self::InvalidFrame => 6,
        }
    }

    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::NotInitialized),
            2 => Some(Self::NoDevice),
            3 => Some(Self::BusOff),
            4 => Some(Self::QueueOverflow),
            5 => Some(Self::Shutdown),
            6 => Some(Self::InvalidFrame),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
