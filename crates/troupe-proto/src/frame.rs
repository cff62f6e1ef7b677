//! Session-layer control frames.

use bytes::Bytes;

use crate::opcodes::Opcode;

/// A control frame produced or consumed by the session layer.
///
/// Hello and Welcome carry an encoded [`crate::ActorDescription`]; Ping and
/// Pong have no payload. Application frames never pass through this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Identity offer (encoded actor description)
    Hello(Bytes),
    /// Identity reply (encoded actor description)
    Welcome(Bytes),
    /// Heartbeat request
    Ping,
    /// Heartbeat reply
    Pong,
}

impl Frame {
    /// Opcode written in this frame's header.
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Hello(_) => Opcode::Hello,
            Self::Welcome(_) => Opcode::Welcome,
            Self::Ping => Opcode::Ping,
            Self::Pong => Opcode::Pong,
        }
    }

    /// Payload bytes (empty for heartbeats).
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Hello(payload) | Self::Welcome(payload) => payload,
            Self::Ping | Self::Pong => &[],
        }
    }
}
