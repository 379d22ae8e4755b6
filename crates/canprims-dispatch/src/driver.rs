//! Contract between applications and a CAN interface driver.
//!
//! Drivers are shared between the thread running [`DriverInterface::run`] and
//! application threads, so every method takes `&self`.

use std::sync::Arc;

use canprims_frame::{Frame, Header};

use crate::dispatcher::FrameListener;
use crate::listener::Callback;
use crate::state::{State, StateListener};

/// Frame traffic.
pub trait CommInterface: Send + Sync {
    /// Queue a frame for transmission. Returns false if it was not accepted.
    fn send(&self, frame: &Frame) -> bool;

    /// Listen to every received frame. A `None` callback yields a listener
    /// that is never invoked.
    fn create_msg_listener(&self, callback: Option<Callback<Frame>>) -> FrameListener;

    /// Listen to received frames whose header key matches `header`.
    fn create_msg_listener_for(
        &self,
        header: Header,
        callback: Option<Callback<Frame>>,
    ) -> FrameListener;
}

/// Driver state notifications.
pub trait StateInterface: Send + Sync {
    fn create_state_listener(&self, callback: Option<Callback<State>>) -> StateListener;
}

/// A complete driver.
pub trait DriverInterface: CommInterface + StateInterface {
    /// Attach to `device`. With `loopback`, sent frames are also delivered
    /// to local listeners.
    fn init(&self, device: &str, loopback: bool) -> bool;

    /// Try to return to [`Ready`](crate::DriverState::Ready) after a fault.
    fn recover(&self) -> bool;

    fn state(&self) -> State;

    /// Stop the driver and make [`run`](Self::run) return.
    fn shutdown(&self);

    /// Human-readable text for an internal error code, or `None` if the code
    /// is unknown.
    fn translate_error(&self, code: u32) -> Option<String>;

    /// Returns true if sent frames are delivered to local listeners.
    fn does_loop_back(&self) -> bool;

    /// Deliver received frames until shut down. Blocks the calling thread.
    fn run(&self);
}

/// Driver shared between threads.
pub type SharedDriver = Arc<dyn DriverInterface>;
