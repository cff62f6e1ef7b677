//! Transport abstraction consumed by channel sessions.
//!
//! The session never owns a socket. It sees the byte transport through this
//! minimal contract: a stable key for logging, a liveness flag, a
//! fire-and-forget send and an idempotent close. Inbound bytes flow the other
//! way, through [`crate::ChannelSession::on_data_received`].

use bytes::Bytes;

use crate::error::TransportError;

/// One established byte-stream connection.
///
/// Implementations deliver inbound chunks to the owning session in order,
/// from a single reader at a time. Every method here may be called from
/// timer tasks, so none of them may block.
pub trait TransportSession: Send + Sync + 'static {
    /// Stable identifier of this connection.
    fn session_key(&self) -> &str;

    /// Whether the connection can still carry frames.
    fn is_active(&self) -> bool;

    /// Queue an encoded frame for sending.
    ///
    /// Returns once the frame is queued; delivery is not awaited. An error
    /// means the frame was not queued.
    fn begin_send(&self, frame: Bytes) -> Result<(), TransportError>;

    /// Close the connection.
    ///
    /// Calling this more than once has no further effect.
    fn close(&self);
}
