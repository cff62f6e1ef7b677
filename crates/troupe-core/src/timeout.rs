//! One-shot keep-alive timeout.

use std::{sync::Mutex, time::Duration};

use tokio::{runtime::Handle, task::JoinHandle, time};

use crate::sync::lock;

enum TimeoutState {
    Disarmed,
    Armed(JoinHandle<()>),
    Disposed,
}

/// Timer armed when a Ping goes out; fires once unless disarmed first.
pub(crate) struct KeepAliveTimeout {
    duration: Duration,
    state: Mutex<TimeoutState>,
}

impl KeepAliveTimeout {
    pub(crate) fn new(duration: Duration) -> Self {
        Self { duration, state: Mutex::new(TimeoutState::Disarmed) }
    }

    /// Arm the timeout to run `on_fire` after the configured duration.
    ///
    /// An outstanding deadline is kept, never pushed out. Returns `true` if
    /// this call armed a new deadline.
    pub(crate) fn arm(&self, runtime: &Handle, on_fire: impl FnOnce() + Send + 'static) -> bool {
        let mut state = lock(&self.state);
        match &*state {
            TimeoutState::Disposed => return false,
            TimeoutState::Armed(task) if !task.is_finished() => return false,
            TimeoutState::Armed(_) | TimeoutState::Disarmed => {},
        }

        let duration = self.duration;
        *state = TimeoutState::Armed(runtime.spawn(async move {
            time::sleep(duration).await;
            on_fire();
        }));
        true
    }

    /// Cancel an outstanding deadline. Returns `true` if one was cancelled.
    pub(crate) fn disarm(&self) -> bool {
        let mut state = lock(&self.state);
        let TimeoutState::Armed(task) = &*state else {
            return false;
        };
        let pending = !task.is_finished();
        task.abort();
        *state = TimeoutState::Disarmed;
        pending
    }

    pub(crate) fn is_armed(&self) -> bool {
        matches!(&*lock(&self.state), TimeoutState::Armed(task) if !task.is_finished())
    }

    /// Cancel any deadline and refuse to arm again. Idempotent.
    pub(crate) fn dispose(&self) {
        let previous = std::mem::replace(&mut *lock(&self.state), TimeoutState::Disposed);
        if let TimeoutState::Armed(task) = previous {
            task.abort();
        }
    }
}

impl Drop for KeepAliveTimeout {
    fn drop(&mut self) {
        self.dispose();
    }
}
