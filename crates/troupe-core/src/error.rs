//! Error types for the channel session layer.

use thiserror::Error;
use troupe_proto::CodecError;

/// Failures reported by a [`crate::transport::TransportSession`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// Transport no longer accepts frames
    #[error("transport closed")]
    Closed,

    /// Underlying I/O failure
    #[error("transport I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a handshake was rejected.
///
/// Every variant is fatal to the session; there is no retry at this layer.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// First chunk did not start with a decodable frame header
    #[error("handshake header undecodable: {0}")]
    HeaderUndecodable(#[source] CodecError),

    /// First frame was not a Hello
    #[error("expected Hello, got opcode {0:#04x}")]
    UnexpectedOpcode(u8),

    /// Hello payload missing or truncated
    #[error("handshake payload: {0}")]
    Payload(#[source] CodecError),

    /// Hello payload did not carry a usable actor description
    #[error("invalid actor description: {0}")]
    InvalidIdentity(#[source] CodecError),

    /// Welcome could not be encoded
    #[error("failed to encode Welcome: {0}")]
    Encode(#[source] CodecError),

    /// Welcome could not be handed to the transport
    #[error("failed to send Welcome: {0}")]
    Send(#[source] TransportError),

    /// Keep-alive timer needs a tokio runtime and none was available
    #[error("no tokio runtime to drive keep-alive timers")]
    NoRuntime,

    /// Session was closed while the handshake was in progress
    #[error("session closed during handshake")]
    Closed,
}

/// Errors surfaced by session operations and the heartbeat cycle.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Frame encoding failed
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Transport rejected a frame
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Operation requires a handshaked, live channel
    #[error("session is not active")]
    NotActive,
}

/// Invalid channel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Keep-alive interval must be positive
    #[error("keep-alive interval must be non-zero")]
    ZeroInterval,

    /// Keep-alive timeout must be positive
    #[error("keep-alive timeout must be non-zero")]
    ZeroTimeout,
}
