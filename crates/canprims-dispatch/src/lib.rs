//! Listener registries, frame dispatch and the CAN driver contract.
//!
//! Subscriptions are handles: a callback stays registered while its
//! [`Listener`] (or a clone) is alive and is dropped with it. Callbacks run
//! on the thread that broadcasts, in subscription order.

pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod listener;
pub mod loopback;
pub mod state;
pub mod waiter;

pub use dispatcher::{FrameDispatcher, FrameListener};
pub use driver::{CommInterface, DriverInterface, SharedDriver, StateInterface};
pub use error::{DriverError, Result};
pub use listener::{Callback, Listener, ListenerRegistry};
pub use loopback::{LoopbackConfig, LoopbackDriver, DEFAULT_QUEUE_CAPACITY};
pub use state::{DriverState, State, StateDispatcher, StateListener};
pub use waiter::StateWaiter;
