//! In-memory transport.

use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use bytes::Bytes;
use troupe_core::{TransportError, TransportSession};

/// Transport that keeps outbound frames in a queue instead of writing them.
///
/// Starts active. `close` marks it inactive; sends after that fail with
/// [`TransportError::Closed`].
#[derive(Debug)]
pub struct MemoryTransport {
    key: String,
    outbound: Mutex<Vec<Bytes>>,
    sent_total: AtomicUsize,
    close_calls: AtomicUsize,
    closed: AtomicBool,
    refuse_sends: AtomicBool,
}

impl MemoryTransport {
    /// Create an active transport identified by `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            outbound: Mutex::new(Vec::new()),
            sent_total: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            refuse_sends: AtomicBool::new(false),
        }
    }

    /// Take every frame sent since the last drain.
    pub fn drain(&self) -> Vec<Bytes> {
        std::mem::take(&mut *self.outbound.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Frames sent since the last drain, left in place.
    pub fn pending(&self) -> Vec<Bytes> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Frames accepted over the transport's lifetime.
    pub fn sent_total(&self) -> usize {
        self.sent_total.load(Ordering::SeqCst)
    }

    /// Number of times `close` was called.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn refuse_sends(&self, refuse: bool) {
        self.refuse_sends.store(refuse, Ordering::SeqCst);
    }

    /// Simulate the connection dropping underneath the session.
    pub fn disconnect(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl TransportSession for MemoryTransport {
    fn session_key(&self) -> &str {
        &self.key
    }

    fn is_active(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    fn begin_send(&self, frame: Bytes) -> Result<(), TransportError> {
        if !self.is_active() || self.refuse_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner).push(frame);
        self.sent_total.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
    }
}
