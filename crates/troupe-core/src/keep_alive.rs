//! Keep-alive bookkeeping.
//!
//! The tracker separates two clocks: when data last arrived, and when the
//! periodic check next runs. A heartbeat is only due when the channel has been
//! silent for a full interval, so ordinary application traffic suppresses
//! Pings instead of competing with them.
//!
//! The periodic check is a tokio task that invokes a callback every
//! `interval`. Missed ticks are skipped, never queued.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    runtime::Handle,
    sync::Notify,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::sync::lock;

type TickCallback = Arc<dyn Fn() + Send + Sync>;

enum TimerState {
    Idle,
    Running { task: JoinHandle<()>, reset: Arc<Notify> },
    Disposed,
}

/// Tracks inbound activity and drives the periodic keep-alive tick.
pub struct KeepAliveTracker {
    interval: Duration,
    /// Reference point for `last_data_nanos`
    origin: Instant,
    /// Nanoseconds after `origin` at which data was last received
    last_data_nanos: AtomicU64,
    on_tick: TickCallback,
    timer: Mutex<TimerState>,
}

impl KeepAliveTracker {
    /// Create a tracker that considers `now` the last moment data was seen.
    ///
    /// `on_tick` runs on the timer task once per interval after
    /// [`start_timer`](Self::start_timer). It must not block.
    pub fn new(
        interval: Duration,
        now: Instant,
        on_tick: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            interval,
            origin: now,
            last_data_nanos: AtomicU64::new(0),
            on_tick: Arc::new(on_tick),
            timer: Mutex::new(TimerState::Idle),
        }
    }

    /// Record that a chunk arrived at `now`.
    ///
    /// Called for every inbound chunk, not just heartbeats. Never moves the
    /// timestamp backwards.
    pub fn on_data_received(&self, now: Instant) {
        let nanos = now.saturating_duration_since(self.origin).as_nanos() as u64;
        self.last_data_nanos.fetch_max(nanos, Ordering::AcqRel);
    }

    /// When data was last received.
    pub fn last_data_received_at(&self) -> Instant {
        self.origin + Duration::from_nanos(self.last_data_nanos.load(Ordering::Acquire))
    }

    /// Whether the channel has been silent for at least one interval.
    pub fn should_send_keep_alive(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_data_received_at()) >= self.interval
    }

    /// Start the periodic tick on `runtime`.
    ///
    /// The first tick fires one interval from now. Does nothing if the timer
    /// is already running or the tracker has been disposed.
    pub fn start_timer(&self, runtime: &Handle) {
        let mut timer = lock(&self.timer);
        if !matches!(*timer, TimerState::Idle) {
            return;
        }

        let reset = Arc::new(Notify::new());
        let task = runtime.spawn(run_ticks(
            self.interval,
            Instant::now() + self.interval,
            Arc::clone(&self.on_tick),
            Arc::clone(&reset),
        ));
        *timer = TimerState::Running { task, reset };
    }

    /// Restart the tick phase so the next tick is a full interval away.
    pub fn reset_timer(&self) {
        if let TimerState::Running { reset, .. } = &*lock(&self.timer) {
            reset.notify_one();
        }
    }

    /// Whether the periodic tick is running.
    pub fn is_running(&self) -> bool {
        matches!(*lock(&self.timer), TimerState::Running { .. })
    }

    /// Stop the periodic tick for good. Idempotent.
    pub fn dispose(&self) {
        let previous = std::mem::replace(&mut *lock(&self.timer), TimerState::Disposed);
        if let TimerState::Running { task, .. } = previous {
            task.abort();
        }
    }
}

impl Drop for KeepAliveTracker {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn run_ticks(period: Duration, first: Instant, on_tick: TickCallback, reset: Arc<Notify>) {
    let mut ticker = time::interval_at(first, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = reset.notified() => ticker.reset(),
            _ = ticker.tick() => on_tick(),
        }
    }
}
