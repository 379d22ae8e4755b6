use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::driver::StateInterface;
use crate::state::{DriverState, State, StateListener};

/// Blocks a thread until a driver reaches a wanted state.
///
/// The waiter subscribes on creation and tracks the latest state it was
/// notified with. States broadcast before the waiter existed are not seen,
/// so seed it with the driver's current state when that matters.
#[derive(Debug)]
pub struct StateWaiter {
    shared: Arc<(Mutex<State>, Condvar)>,
    _listener: StateListener,
}

impl StateWaiter {
    pub fn new<D>(driver: &D, initial: State) -> Self
    where
        D: StateInterface + ?Sized,
    {
        let shared = Arc::new((Mutex::new(initial), Condvar::new()));
        let notify = Arc::clone(&shared);
        let listener = driver.create_state_listener(Some(Box::new(move |state: &State| {
            let (latest, changed) = &*notify;
            *latest.lock().unwrap_or_else(PoisonError::into_inner) = *state;
            changed.notify_all();
        })));
        Self {
            shared,
            _listener: listener,
        }
    }

    /// Latest state seen.
    pub fn current(&self) -> State {
        *self.shared.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until `predicate` holds for the latest state. Returns that state,
    /// or `None` on timeout.
    pub fn wait_for<P>(&self, predicate: P, timeout: Duration) -> Option<State>
    where
        P: Fn(&State) -> bool,
    {
        let (latest, changed) = &*self.shared;
        let guard = latest.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, result) = changed
            .wait_timeout_while(guard, timeout, |state| !predicate(state))
            .unwrap_or_else(PoisonError::into_inner);
        if result.timed_out() && !predicate(&guard) {
            return None;
        }
        Some(*guard)
    }

    pub fn wait_for_state(&self, wanted: DriverState, timeout: Duration) -> Option<State> {
        self.wait_for(|state| state.driver_state == wanted, timeout)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::driver::DriverInterface;
    use crate::error::DriverError;
    use crate::loopback::LoopbackDriver;

    #[test]
    fn returns_immediately_when_already_satisfied() {
        let driver = LoopbackDriver::new();
        driver.init("vcan0", false);
        let waiter = StateWaiter::new(&driver, driver.state());

        let state = waiter.wait_for_state(DriverState::Ready, Duration::ZERO);
        assert_eq!(state, Some(State::new(DriverState::Ready)));
    }

    #[test]
    fn times_out_without_change() {
        let driver = LoopbackDriver::new();
        let waiter = StateWaiter::new(&driver, driver.state());

        let state = waiter.wait_for_state(DriverState::Ready, Duration::from_millis(20));
        assert_eq!(state, None);
        assert_eq!(waiter.current().driver_state, DriverState::Closed);
    }

    #[test]
    fn wakes_on_state_change_from_another_thread() {
        let driver = Arc::new(LoopbackDriver::new());
        driver.init("vcan0", false);
        let waiter = StateWaiter::new(&*driver, driver.state());

        let faulting = {
            let driver = Arc::clone(&driver);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                driver.fault(DriverError::BusOff, None);
            })
        };

        let state = waiter
            .wait_for(|state| state.internal_error != 0, Duration::from_secs(5))
            .unwrap();
        assert_eq!(state.driver_error(), Some(DriverError::BusOff));
        faulting.join().unwrap();
    }
}
