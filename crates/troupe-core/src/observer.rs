//! Upward notifications raised by a channel session.

use std::sync::{Arc, Mutex};

use troupe_proto::ActorDescription;

use crate::{session::ChannelSession, sync::lock};

/// Receives notifications from a [`ChannelSession`].
///
/// Callbacks run synchronously on whichever task raised them (the transport's
/// reader, a timer, or a caller of `close`). Keep them short and never block.
/// All methods default to doing nothing.
pub trait SessionObserver: Send + Sync {
    /// Handshake completed; `remote` is the identity the peer offered.
    fn on_handshaked(&self, _session: &ChannelSession, _remote: &ActorDescription) {}

    /// Application data arrived.
    ///
    /// `data` is the inbound chunk exactly as the transport delivered it,
    /// header included.
    fn on_data_received(
        &self,
        _session: &ChannelSession,
        _remote: &ActorDescription,
        _data: &[u8],
    ) {
    }

    /// Session closed. Raised once.
    fn on_closed(&self, _session: &ChannelSession) {}
}

/// Observers in registration order.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: Mutex<Vec<Arc<dyn SessionObserver>>>,
}

impl ObserverRegistry {
    pub(crate) fn subscribe(&self, observer: Arc<dyn SessionObserver>) {
        lock(&self.observers).push(observer);
    }

    /// Copy of the current list, so callbacks run without the lock held and
    /// may subscribe further observers.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn SessionObserver>> {
        lock(&self.observers).clone()
    }
}
