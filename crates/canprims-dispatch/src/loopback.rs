use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use canprims_frame::{Frame, Header};

use crate::dispatcher::{FrameDispatcher, FrameListener};
use crate::driver::{CommInterface, DriverInterface, StateInterface};
use crate::error::{DriverError, Result};
use crate::listener::Callback;
use crate::state::{DriverState, State, StateDispatcher, StateListener};

/// Default receive queue capacity in frames.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Configuration for a [`LoopbackDriver`].
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// Frames held for [`run`](DriverInterface::run) before new ones are
    /// dropped. Also bounds the transmit log, which drops its oldest entry.
    pub queue_capacity: usize,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: State,
    device: Option<String>,
    loopback: bool,
    queue: VecDeque<Frame>,
    transmitted: VecDeque<Frame>,
    dropped: u64,
    transmit_dropped: u64,
    shutdown: bool,
    // One thread at a time broadcasts state; others mark it stale.
    notifying: bool,
    state_stale: bool,
}

/// In-memory driver with no bus behind it.
///
/// Sent frames are recorded and, with loop-back enabled, delivered to local
/// listeners. [`receive`](Self::receive) injects frames as if they came from
/// the bus. Frames are delivered by [`run`](DriverInterface::run) or
/// [`process_pending`](Self::process_pending), never by the sending thread.
///
/// State changes are stored and announced in order. While one thread is
/// announcing, a change made by another thread (or by a state listener) is
/// picked up by the announcing thread, so listeners always end on the stored
/// state but may skip intermediate ones.
#[derive(Debug)]
pub struct LoopbackDriver {
    config: LoopbackConfig,
    inner: Mutex<Inner>,
    pending: Condvar,
    frames: FrameDispatcher,
    states: StateDispatcher,
}

impl LoopbackDriver {
    pub fn new() -> Self {
        Self::with_config(LoopbackConfig::default())
    }

    pub fn with_config(config: LoopbackConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
            pending: Condvar::new(),
            frames: FrameDispatcher::new(),
            states: StateDispatcher::new(),
        }
    }

    /// Send a frame, reporting why it was rejected.
    pub fn try_send(&self, frame: &Frame) -> Result<()> {
        if !frame.is_valid() {
            tracing::warn!(header = %frame.header, "rejected invalid frame");
            return Err(DriverError::InvalidFrame);
        }

        let mut inner = self.lock();
        check_ready(&inner)?;
        self.record(&mut inner, *frame);
        if inner.loopback {
            self.enqueue(&mut inner, *frame);
        }
        Ok(())
    }

    /// Inject a frame as if received from the bus.
    pub fn receive(&self, frame: Frame) -> Result<()> {
        let mut inner = self.lock();
        check_ready(&inner)?;
        if self.enqueue(&mut inner, frame) {
            Ok(())
        } else {
            Err(DriverError::QueueOverflow)
        }
    }

    /// Deliver all queued frames on the calling thread. Returns the number of
    /// frames delivered.
    pub fn process_pending(&self) -> usize {
        let batch = std::mem::take(&mut self.lock().queue);
        self.deliver(batch)
    }

    /// Move to [`DriverState::Open`] with the given error. Has no effect on a
    /// closed driver.
    pub fn fault(&self, error: DriverError, os_error: Option<i32>) -> bool {
        let inner = self.lock();
        if inner.state.driver_state == DriverState::Closed {
            return false;
        }
        tracing::warn!(error = %error, "driver fault");
        self.set_state(
            inner,
            State {
                driver_state: DriverState::Open,
                error_code: os_error,
                internal_error: error.code(),
            },
        );
        true
    }

    /// Frames accepted by [`send`](CommInterface::send) since the last call,
    /// oldest first. At most `queue_capacity` frames are kept.
    pub fn take_transmitted(&self) -> Vec<Frame> {
        std::mem::take(&mut self.lock().transmitted).into()
    }

    /// Frames dropped from the transmit log to stay within capacity.
    pub fn transmit_dropped(&self) -> u64 {
        self.lock().transmit_dropped
    }

    /// Frames dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    /// Device name given to [`init`](DriverInterface::init).
    pub fn device(&self) -> Option<String> {
        self.lock().device.clone()
    }

    pub fn config(&self) -> &LoopbackConfig {
        &self.config
    }

    fn enqueue(&self, inner: &mut Inner, frame: Frame) -> bool {
        if inner.queue.len() >= self.config.queue_capacity {
            inner.dropped += 1;
            tracing::warn!(
                header = %frame.header,
                capacity = self.config.queue_capacity,
                "receive queue full, frame dropped"
            );
            return false;
        }
        inner.queue.push_back(frame);
        self.pending.notify_one();
        true
    }

    fn record(&self, inner: &mut Inner, frame: Frame) {
        if inner.transmitted.len() >= self.config.queue_capacity {
            inner.transmit_dropped += 1;
            if inner.transmitted.pop_front().is_none() {
                return;
            }
        }
        inner.transmitted.push_back(frame);
    }

    fn deliver(&self, batch: VecDeque<Frame>) -> usize {
        let count = batch.len();
        for frame in &batch {
            self.frames.dispatch(frame);
        }
        count
    }

    /// Store `state` under the caller's guard, then announce the latest
    /// stored state with the lock released.
    fn set_state<'a>(&'a self, mut inner: MutexGuard<'a, Inner>, state: State) {
        inner.state = state;
        inner.state_stale = true;
        if inner.notifying {
            return;
        }
        inner.notifying = true;
        loop {
            inner.state_stale = false;
            let current = inner.state;
            drop(inner);
            self.states.broadcast(&current);
            inner = self.lock();
            if !inner.state_stale {
                inner.notifying = false;
                return;
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LoopbackDriver {
    fn default() -> Self {
        Self::new()
    }
}

fn check_ready(inner: &Inner) -> Result<()> {
    if inner.shutdown {
        return Err(DriverError::Shutdown);
    }
    if !inner.state.is_ready() {
        return Err(inner
            .state
            .driver_error()
            .unwrap_or(DriverError::NotInitialized));
    }
    Ok(())
}

impl CommInterface for LoopbackDriver {
    fn send(&self, frame: &Frame) -> bool {
        self.try_send(frame).is_ok()
    }

    fn create_msg_listener(&self, callback: Option<Callback<Frame>>) -> FrameListener {
        self.frames.subscribe_optional(callback)
    }

    fn create_msg_listener_for(
        &self,
        header: Header,
        callback: Option<Callback<Frame>>,
    ) -> FrameListener {
        self.frames.subscribe_header_optional(header, callback)
    }
}

impl StateInterface for LoopbackDriver {
    fn create_state_listener(&self, callback: Option<Callback<State>>) -> StateListener {
        self.states.subscribe_optional(callback)
    }
}

impl DriverInterface for LoopbackDriver {
    fn init(&self, device: &str, loopback: bool) -> bool {
        let mut inner = self.lock();
        if device.trim().is_empty() {
            tracing::warn!("init without a device name");
            self.set_state(
                inner,
                State {
                    internal_error: DriverError::NoDevice.code(),
                    ..State::default()
                },
            );
            return false;
        }

        inner.device = Some(device.to_string());
        inner.loopback = loopback;
        inner.shutdown = false;
        tracing::info!(device, loopback, "driver initialized");
        self.set_state(inner, State::new(DriverState::Ready));
        true
    }

    fn recover(&self) -> bool {
        let inner = self.lock();
        let current = inner.state.driver_state;
        match current {
            DriverState::Ready => true,
            DriverState::Closed => false,
            DriverState::Open => {
                tracing::info!("driver recovered");
                self.set_state(inner, State::new(DriverState::Ready));
                true
            }
        }
    }

    fn state(&self) -> State {
        self.lock().state
    }

    fn shutdown(&self) {
        let mut inner = self.lock();
        inner.shutdown = true;
        self.pending.notify_all();
        if inner.state.driver_state == DriverState::Closed {
            inner.state = State::default();
            return;
        }
        tracing::info!("driver shut down");
        self.set_state(inner, State::default());
    }

    fn translate_error(&self, code: u32) -> Option<String> {
        if code == 0 {
            return Some(DriverError::OK_TEXT.to_string());
        }
        DriverError::from_code(code).map(|error| error.to_string())
    }

    fn does_loop_back(&self) -> bool {
        self.lock().loopback
    }

    fn run(&self) {
        tracing::debug!("driver loop started");
        loop {
            let batch = {
                let mut inner = self.lock();
                while inner.queue.is_empty() && !inner.shutdown {
                    inner = self
                        .pending
                        .wait(inner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                if inner.queue.is_empty() {
                    break;
                }
                std::mem::take(&mut inner.queue)
            };
            self.deliver(batch);
        }
        tracing::debug!("driver loop stopped");
    }
}
