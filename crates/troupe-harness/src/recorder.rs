//! Observer that records every session notification.

use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use troupe_core::{ChannelSession, SessionObserver};
use troupe_proto::ActorDescription;

/// One notification raised by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Handshake completed with this peer identity
    Handshaked(ActorDescription),
    /// Application chunk forwarded upward
    Data(Bytes),
    /// Session closed
    Closed,
}

/// Records notifications in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Application chunks forwarded so far.
    pub fn data(&self) -> Vec<Bytes> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::Data(data) => Some(data),
                SessionEvent::Handshaked(_) | SessionEvent::Closed => None,
            })
            .collect()
    }

    /// Number of handshake notifications.
    pub fn handshakes(&self) -> usize {
        self.count(|event| matches!(event, SessionEvent::Handshaked(_)))
    }

    /// Number of close notifications.
    pub fn closes(&self) -> usize {
        self.count(|event| matches!(event, SessionEvent::Closed))
    }

    fn count(&self, pred: impl Fn(&SessionEvent) -> bool) -> usize {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.iter().filter(|event| pred(event)).count()
    }

    fn push(&self, event: SessionEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}

impl SessionObserver for RecordingObserver {
    fn on_handshaked(&self, _session: &ChannelSession, remote: &ActorDescription) {
        self.push(SessionEvent::Handshaked(remote.clone()));
    }

    fn on_data_received(&self, _session: &ChannelSession, _remote: &ActorDescription, data: &[u8]) {
        self.push(SessionEvent::Data(Bytes::copy_from_slice(data)));
    }

    fn on_closed(&self, _session: &ChannelSession) {
        self.push(SessionEvent::Closed);
    }
}
